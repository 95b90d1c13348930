//! Deployment aggregate — owns the unit inventory, the resolved chunk
//! size, and the ordered plans.
//!
//! Lifecycle: `new` (validate config) → `load` (discover + reconcile +
//! template) → `resolve_chunking` → `create_plans` → `describe`/execute.

use convoy_cluster::ClusterApi;
use tracing::info;

use crate::config::{DeploymentConfig, Strategy};
use crate::error::{DeployError, DeployResult};
use crate::planner;
use crate::reconcile::reconcile;
use crate::step::Plan;
use crate::unit::{template_unit_name, RequiredAction, Unit};

/// A fully described deployment of one service.
#[derive(Debug)]
pub struct Deployment {
    config: DeploymentConfig,
    /// Resolved release tag (explicit or derived at load time).
    tag: Option<String>,
    units: Vec<Unit>,
    /// Pre-existing unit count at discovery time.
    discovered: usize,
    desired: usize,
    /// Units per stage; zero until `resolve_chunking` runs.
    chunk_count: usize,
    unit_template: String,
    plans: Vec<Plan>,
}

impl Deployment {
    /// Validate the configuration and create an empty deployment.
    pub fn new(config: DeploymentConfig) -> DeployResult<Self> {
        config.validate()?;
        Ok(Self {
            tag: config.tag.clone(),
            config,
            units: Vec::new(),
            discovered: 0,
            desired: 0,
            chunk_count: 0,
            unit_template: String::new(),
            plans: Vec::new(),
        })
    }

    /// Discover the service's units, reconcile them against the desired
    /// count, and resolve the spawn template if one will be needed.
    pub async fn load<C: ClusterApi>(&mut self, cluster: &C) -> DeployResult<()> {
        let listings = cluster.list_units().await?;
        let inventory = reconcile(
            &listings,
            &self.config.service,
            self.config.tag.as_deref(),
            self.config.instances,
        )?;
        self.units = inventory.units;
        self.discovered = inventory.discovered;
        self.desired = inventory.desired;
        self.tag = inventory.tag;
        self.unit_template = self.resolve_template(cluster).await?;
        Ok(())
    }

    /// Template payload for spawned units: the unit file on disk wins,
    /// otherwise the cluster's `{service}@.service` placeholder is fetched.
    /// Strategies that never spawn skip resolution entirely.
    async fn resolve_template<C: ClusterApi>(&self, cluster: &C) -> DeployResult<String> {
        let spawns = self
            .units
            .iter()
            .any(|u| u.required_action() == RequiredAction::Spawn);
        if self.config.strategy != Strategy::Atomic && !spawns {
            return Ok(String::new());
        }

        if let Some(path) = &self.config.unit_file {
            return std::fs::read_to_string(path).map_err(|e| DeployError::Template {
                path: path.display().to_string(),
                source: e,
            });
        }
        Ok(cluster
            .get_unit(&template_unit_name(&self.config.service))
            .await?)
    }

    /// Fix the number of units per stage. Must run after `load`.
    pub fn resolve_chunking(&mut self) -> DeployResult<()> {
        self.chunk_count = planner::resolve_chunk_count(
            self.config.chunking,
            self.config.strategy,
            self.units.len(),
            self.discovered,
            self.desired,
        )?;
        Ok(())
    }

    /// Generate the ordered plans. Must run after `resolve_chunking`.
    pub fn create_plans(&mut self) -> DeployResult<()> {
        if self.chunk_count == 0 {
            return Err(DeployError::Usage(
                "chunk size has not been resolved".into(),
            ));
        }
        let deployment_name = self.deployment_name();
        self.plans = planner::create_plans(
            &self.units,
            self.config.strategy,
            self.chunk_count,
            &self.config.service,
            &deployment_name,
            self.tag.as_deref(),
            self.config.handler.as_deref(),
            &self.unit_template,
        )?;
        info!(summary = %self.summary(), "plans created");
        Ok(())
    }

    /// `{service}-{tag}`, or just the service when no tag is known.
    pub fn deployment_name(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}-{}", self.config.service, tag),
            None => self.config.service.clone(),
        }
    }

    /// Human-readable plan description.
    ///
    /// The exact line format is a contract: operators diff this output
    /// between runs, and the test fixtures assert it verbatim. Step numbers
    /// run across stages without resetting.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "*** {} Deployment Plan ***",
            self.config.strategy.display_name()
        ));
        lines.push("==> Details".to_string());
        for unit in &self.units {
            lines.push(format!("Unit: {} ({}).", unit.name(), unit.state()));
        }
        lines.push(format!("Chunking: {} units", self.chunk_count));
        lines.push("==> Deployment Plan".to_string());

        let mut step_number = 0;
        for (stage, plan) in self.plans.iter().enumerate() {
            lines.push(format!("==> Stage {}", stage + 1));
            for step in plan.steps() {
                step_number += 1;
                lines.push(format!("Step {step_number}: {step}"));
            }
        }
        lines
    }

    /// Short form for log fields.
    pub fn summary(&self) -> String {
        format!("{} plans / {} units", self.plans.len(), self.units.len())
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn service(&self) -> &str {
        &self.config.service
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}
