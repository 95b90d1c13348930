//! Unit model — one replica instance tracked by the cluster scheduler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Lifecycle state of a unit as observed from the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    /// Synthesized by the reconciler; the unit does not exist yet.
    Uncreated,
    Inactive,
    Loaded,
    Launched,
    Dead,
    Unknown,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Uncreated => "uncreated",
            UnitState::Inactive => "inactive",
            UnitState::Loaded => "loaded",
            UnitState::Launched => "launched",
            UnitState::Dead => "dead",
            UnitState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitState {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uncreated" => Ok(UnitState::Uncreated),
            "inactive" => Ok(UnitState::Inactive),
            "loaded" => Ok(UnitState::Loaded),
            "launched" => Ok(UnitState::Launched),
            "dead" => Ok(UnitState::Dead),
            "unknown" => Ok(UnitState::Unknown),
            other => Err(DeployError::Config(format!("invalid unit state '{other}'"))),
        }
    }
}

/// Disposition assigned to a unit during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredAction {
    /// Stop and start (or replace) the existing unit.
    #[default]
    Redeploy,
    /// Create a unit that does not exist yet.
    Spawn,
    /// Remove a surplus unit.
    Destroy,
}

impl RequiredAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredAction::Redeploy => "redeploy",
            RequiredAction::Spawn => "spawn",
            RequiredAction::Destroy => "destroy",
        }
    }
}

impl fmt::Display for RequiredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One replica instance of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    name: String,
    state: UnitState,
    required_action: RequiredAction,
}

impl Unit {
    /// Create a unit in the default `redeploy` disposition.
    pub fn new(name: impl Into<String>, state: UnitState) -> Self {
        Self {
            name: name.into(),
            state,
            required_action: RequiredAction::Redeploy,
        }
    }

    /// Create a unit from a scheduler listing, validating the state string.
    pub fn from_listing(name: &str, state: &str) -> Result<Self, DeployError> {
        Ok(Self::new(name, state.parse()?))
    }

    pub(crate) fn with_action(mut self, action: RequiredAction) -> Self {
        self.required_action = action;
        self
    }

    /// Set by the reconciler, exactly once, before planning begins.
    pub(crate) fn set_required_action(&mut self, action: RequiredAction) {
        self.required_action = action;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn required_action(&self) -> RequiredAction {
        self.required_action
    }

    /// One-line name + state summary.
    pub fn details(&self) -> String {
        format!("{} {}", self.name, self.state)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Name of the `index`-th unit of a service release.
pub fn unit_name(service: &str, tag: &str, index: usize) -> String {
    format!("{service}-{tag}@{index}.service")
}

/// Name of the template placeholder unit for a service.
pub fn template_unit_name(service: &str) -> String {
    format!("{service}@.service")
}

/// Extract the release tag from a unit name of the form
/// `{service}-{tag}@{index}.service`.
pub fn parse_tag<'a>(name: &'a str, service: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(service)?.strip_prefix('-')?;
    let (tag, _) = rest.split_once('@')?;
    if tag.is_empty() { None } else { Some(tag) }
}
