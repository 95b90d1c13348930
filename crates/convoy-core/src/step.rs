//! Steps and plans — the atomic operations a deployment executes.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// One atomic lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Start,
    Stop,
    Spawn,
    Destroy,
    /// Invoke the configured atomic handler.
    ExternalScript,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Start => "start",
            StepAction::Stop => "stop",
            StepAction::Spawn => "spawn",
            StepAction::Destroy => "destroy",
            StepAction::ExternalScript => "external_script",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepAction {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(StepAction::Start),
            "stop" => Ok(StepAction::Stop),
            "spawn" => Ok(StepAction::Spawn),
            "destroy" => Ok(StepAction::Destroy),
            "external_script" => Ok(StepAction::ExternalScript),
            other => Err(DeployError::Config(format!("invalid step action '{other}'"))),
        }
    }
}

/// One lifecycle operation targeting a single named resource.
///
/// For `external_script` the target is the handler path rather than a unit
/// name. Steps are immutable values; they are created by the planner and
/// consumed by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    target: String,
    action: StepAction,
}

impl Step {
    pub fn new(target: impl Into<String>, action: StepAction) -> Self {
        Self {
            target: target.into(),
            action,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn action(&self) -> StepAction {
        self.action
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.target)
    }
}

/// An ordered sequence of steps sharing one chunk ("stage").
///
/// A step is never scheduled twice within one plan: insertion order is kept
/// in a plain vector, and a seen-set of `(target, action)` pairs rejects
/// duplicates at construction time.
#[derive(Debug, Clone)]
pub struct Plan {
    service_name: String,
    deployment_name: String,
    /// Template payload used when executing `spawn` steps.
    unit_template: String,
    steps: Vec<Step>,
    seen: HashSet<(String, StepAction)>,
}

impl Plan {
    pub fn new(
        service_name: impl Into<String>,
        deployment_name: impl Into<String>,
        unit_template: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            deployment_name: deployment_name.into(),
            unit_template: unit_template.into(),
            steps: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Append a step, skipping it if an identical (target, action) pair is
    /// already scheduled in this plan. Returns whether the step was added.
    pub fn push(&mut self, step: Step) -> bool {
        let key = (step.target.clone(), step.action);
        if !self.seen.insert(key) {
            return false;
        }
        self.steps.push(step);
        true
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn deployment_name(&self) -> &str {
        &self.deployment_name
    }

    pub fn unit_template(&self) -> &str {
        &self.unit_template
    }

    /// Names of units this plan spawns, in step order.
    pub fn units_added(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.action == StepAction::Spawn)
            .map(|s| s.target.as_str())
            .collect()
    }

    /// Names of units this plan destroys, in step order.
    pub fn units_removed(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.action == StepAction::Destroy)
            .map(|s| s.target.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_display() {
        let step = Step::new("web-v2@1.service", StepAction::Stop);
        assert_eq!(step.to_string(), "stop web-v2@1.service");
        assert_eq!(step.target(), "web-v2@1.service");
        assert_eq!(step.action(), StepAction::Stop);
    }

    #[test]
    fn all_valid_actions_parse() {
        for action in ["start", "stop", "spawn", "destroy", "external_script"] {
            let parsed: StepAction = action.parse().unwrap();
            assert_eq!(parsed.as_str(), action);
        }
    }

    #[test]
    fn invalid_action_is_rejected() {
        assert!("xxx".parse::<StepAction>().is_err());
    }

    #[test]
    fn plan_keeps_insertion_order() {
        let mut plan = Plan::new("web", "web-v2", "");
        plan.push(Step::new("a", StepAction::Destroy));
        plan.push(Step::new("b", StepAction::Spawn));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].target(), "a");
        assert_eq!(plan.steps()[1].target(), "b");
    }

    #[test]
    fn plan_rejects_duplicate_steps() {
        let mut plan = Plan::new("web", "web-v2", "");
        assert!(plan.push(Step::new("a", StepAction::Stop)));
        assert!(!plan.push(Step::new("a", StepAction::Stop)));
        // Same target with a different action is a different step.
        assert!(plan.push(Step::new("a", StepAction::Start)));
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn added_and_removed_projections() {
        let mut plan = Plan::new("web", "web-v2", "");
        plan.push(Step::new("web-v2@1.service", StepAction::Spawn));
        plan.push(Step::new("atomic.sh", StepAction::ExternalScript));
        plan.push(Step::new("web-v1@1.service", StepAction::Destroy));
        assert_eq!(plan.units_added(), vec!["web-v2@1.service"]);
        assert_eq!(plan.units_removed(), vec!["web-v1@1.service"]);
    }
}
