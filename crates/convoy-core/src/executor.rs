//! Plan executor — applies plans to the cluster, strictly in order.
//!
//! Every step runs to completion before the next begins, and every plan
//! completes before the next starts. Only one chunk is ever in flight,
//! which bounds how much of the fleet can be down at once. The only
//! suspension point is the fixed-interval convergence poll.

use std::process::Stdio;
use std::time::Duration;

use convoy_cluster::{ClusterApi, DesiredState};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::deployment::Deployment;
use crate::error::{DeployError, DeployResult};
use crate::step::{Plan, Step, StepAction};

/// Convergence polling parameters.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Fixed delay between state queries.
    pub interval: Duration,
    /// Deadline after which a non-converging unit fails the run.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Payload delivered to the atomic handler on stdin, UTF-8 encoded.
#[derive(Serialize)]
struct HandlerPayload<'a> {
    service_name: &'a str,
    deployment_name: &'a str,
    units_added: Vec<&'a str>,
    units_removed: Vec<&'a str>,
}

/// Executes a deployment's plans against a cluster.
///
/// The executor borrows the cluster client; it owns nothing but its
/// polling parameters.
pub struct PlanExecutor<'a, C: ClusterApi> {
    cluster: &'a C,
    poll: PollConfig,
}

impl<'a, C: ClusterApi> PlanExecutor<'a, C> {
    pub fn new(cluster: &'a C) -> Self {
        Self {
            cluster,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Run every plan of the deployment, in order.
    pub async fn run(&self, deployment: &Deployment) -> DeployResult<()> {
        let mut step_number = 0;
        for (stage, plan) in deployment.plans().iter().enumerate() {
            info!(stage = stage + 1, steps = plan.len(), "executing stage");
            for step in plan.steps() {
                step_number += 1;
                info!(step = step_number, op = %step, "executing step");
                self.execute_step(plan, step).await?;
            }
        }
        info!(summary = %deployment.summary(), "deployment executed");
        Ok(())
    }

    /// Run one plan's steps, in order.
    pub async fn execute_plan(&self, plan: &Plan) -> DeployResult<()> {
        for step in plan.steps() {
            self.execute_step(plan, step).await?;
        }
        Ok(())
    }

    async fn execute_step(&self, plan: &Plan, step: &Step) -> DeployResult<()> {
        let target = step.target();
        match step.action() {
            StepAction::Stop => {
                self.cluster
                    .set_desired_state(target, DesiredState::Inactive)
                    .await?;
                self.await_convergence(target, false).await
            }
            StepAction::Start => {
                self.cluster
                    .set_desired_state(target, DesiredState::Launched)
                    .await?;
                self.await_convergence(target, true).await
            }
            StepAction::Spawn => {
                self.cluster
                    .create_unit(target, plan.unit_template())
                    .await?;
                self.await_convergence(target, true).await
            }
            StepAction::Destroy => {
                self.cluster
                    .set_desired_state(target, DesiredState::Inactive)
                    .await?;
                self.await_convergence(target, false).await?;
                self.cluster.destroy_unit(target).await?;
                Ok(())
            }
            StepAction::ExternalScript => self.run_handler(plan, target).await,
        }
    }

    /// Poll the unit's running projection until it matches `running`.
    ///
    /// A unit missing from the state listing counts as not running (it may
    /// not have been scheduled yet, or was already unloaded).
    async fn await_convergence(&self, unit: &str, running: bool) -> DeployResult<()> {
        let deadline = Instant::now() + self.poll.timeout;
        loop {
            let states = self.cluster.list_unit_states().await?;
            let is_running = states
                .iter()
                .find(|s| s.name == unit)
                .map(|s| s.is_running())
                .unwrap_or(false);
            if is_running == running {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeployError::ConvergenceTimeout {
                    unit: unit.to_string(),
                    waited: self.poll.timeout,
                });
            }
            debug!(unit, want_running = running, "waiting for convergence");
            tokio::time::sleep(self.poll.interval).await;
        }
    }

    /// Invoke the atomic handler with the cutover payload on stdin and
    /// surface its combined output. A non-zero exit aborts the run: the
    /// old units must not be destroyed after an unverified cutover.
    async fn run_handler(&self, plan: &Plan, handler: &str) -> DeployResult<()> {
        let payload = serde_json::to_vec(&HandlerPayload {
            service_name: plan.service_name(),
            deployment_name: plan.deployment_name(),
            units_added: plan.units_added(),
            units_removed: plan.units_removed(),
        })
        .expect("handler payload is always serializable");

        let mut child = Command::new(handler)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DeployError::HandlerIo {
                handler: handler.to_string(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // A handler that exits without reading its stdin is still
                // judged by its exit status below.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    return Err(DeployError::HandlerIo {
                        handler: handler.to_string(),
                        source: e,
                    });
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DeployError::HandlerIo {
                handler: handler.to_string(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim_end().to_string();

        if !output.status.success() {
            return Err(DeployError::HandlerFailed {
                handler: handler.to_string(),
                code: output.status.code().unwrap_or(-1),
                output: combined,
            });
        }

        info!(handler, output = %combined, "handler completed");
        Ok(())
    }
}
