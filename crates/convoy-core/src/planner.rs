//! Chunk planner — partitions the reconciled fleet into stages and
//! generates each stage's steps for the selected strategy.

use std::path::Path;

use tracing::debug;

use crate::config::{Chunking, Strategy};
use crate::error::{DeployError, DeployResult};
use crate::step::{Plan, Step, StepAction};
use crate::unit::{unit_name, RequiredAction, Unit};

/// Resolve the number of units per stage.
///
/// Percent sizing is anchored to the deployable fleet: on a shrink the
/// destroy-only surplus is excluded from the base, otherwise the base is the
/// pre-existing footprint. Stopstart always deploys everything in one stage,
/// whatever the flags said.
pub(crate) fn resolve_chunk_count(
    chunking: Chunking,
    strategy: Strategy,
    unit_count: usize,
    discovered: usize,
    desired: usize,
) -> DeployResult<usize> {
    if strategy == Strategy::StopStart {
        return Ok(unit_count);
    }

    match chunking {
        Chunking::Auto => Ok(discovered),
        Chunking::Count(count) => {
            if count > discovered {
                return Err(DeployError::Usage(format!(
                    "chunk count {count} exceeds the current unit count {discovered}"
                )));
            }
            Ok(count)
        }
        Chunking::Percent(percent) => {
            let base = if desired < discovered {
                desired
            } else {
                discovered
            };
            Ok((base * percent as usize).div_ceil(100).max(1))
        }
    }
}

/// Produce one plan per contiguous window of `chunk_count` units.
///
/// Windows are walked left to right with no overlap and no gaps; the final
/// window may be shorter.
pub(crate) fn create_plans(
    units: &[Unit],
    strategy: Strategy,
    chunk_count: usize,
    service: &str,
    deployment_name: &str,
    tag: Option<&str>,
    handler: Option<&Path>,
    unit_template: &str,
) -> DeployResult<Vec<Plan>> {
    let mut plans = Vec::new();
    let mut offset = 0;

    for window in units.chunks(chunk_count) {
        let mut plan = Plan::new(service, deployment_name, unit_template);
        match strategy {
            Strategy::StopStart => stopstart_steps(window, &mut plan),
            Strategy::Rolling => rolling_steps(window, &mut plan),
            Strategy::Atomic => atomic_steps(window, offset, service, tag, handler, &mut plan)?,
        }
        debug!(
            stage = plans.len() + 1,
            steps = plan.len(),
            "stage planned"
        );
        plans.push(plan);
        offset += window.len();
    }

    Ok(plans)
}

/// Stop every redeploy unit, then start them again, in window order.
fn stopstart_steps(window: &[Unit], plan: &mut Plan) {
    for unit in window {
        if unit.required_action() == RequiredAction::Redeploy {
            plan.push(Step::new(unit.name(), StepAction::Stop));
        }
    }
    for unit in window {
        if unit.required_action() == RequiredAction::Redeploy {
            plan.push(Step::new(unit.name(), StepAction::Start));
        }
    }
}

/// Per window: spawns first so capacity is added before capacity is
/// removed, then the in-place stop/start pass, then the surplus teardown.
/// Net ordering: `[spawn*, stop*, start*, destroy*]`.
fn rolling_steps(window: &[Unit], plan: &mut Plan) {
    for unit in window {
        if unit.required_action() == RequiredAction::Spawn {
            plan.push(Step::new(unit.name(), StepAction::Spawn));
        }
    }
    for unit in window {
        if unit.required_action() == RequiredAction::Redeploy {
            plan.push(Step::new(unit.name(), StepAction::Stop));
        }
    }
    for unit in window {
        if unit.required_action() == RequiredAction::Redeploy {
            plan.push(Step::new(unit.name(), StepAction::Start));
        }
    }
    for unit in window {
        if unit.required_action() == RequiredAction::Destroy {
            plan.push(Step::new(unit.name(), StepAction::Destroy));
        }
    }
}

/// Atomic never restarts in place: every surviving unit gets a freshly
/// named replacement, the handler performs the cutover, and only then are
/// the originals destroyed.
fn atomic_steps(
    window: &[Unit],
    offset: usize,
    service: &str,
    tag: Option<&str>,
    handler: Option<&Path>,
    plan: &mut Plan,
) -> DeployResult<()> {
    let handler = handler.ok_or_else(|| {
        DeployError::Config("atomic deployments require a handler script".into())
    })?;
    let mut index = offset;
    for unit in window {
        if matches!(
            unit.required_action(),
            RequiredAction::Spawn | RequiredAction::Redeploy
        ) {
            let tag = tag.ok_or_else(|| {
                DeployError::Config(format!(
                    "cannot name replacement units for '{service}': no tag given and none derivable"
                ))
            })?;
            index += 1;
            plan.push(Step::new(unit_name(service, tag, index), StepAction::Spawn));
        }
    }

    plan.push(Step::new(
        handler.display().to_string(),
        StepAction::ExternalScript,
    ));

    for unit in window {
        if matches!(
            unit.required_action(),
            RequiredAction::Destroy | RequiredAction::Redeploy
        ) {
            plan.push(Step::new(unit.name(), StepAction::Destroy));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitState;

    fn redeploy(name: &str) -> Unit {
        Unit::new(name, UnitState::Launched)
    }

    fn fleet(count: usize) -> Vec<Unit> {
        (1..=count)
            .map(|i| redeploy(&unit_name("web", "v1", i)))
            .collect()
    }

    #[test]
    fn stage_count_is_ceil_of_units_over_chunk() {
        for (units, chunk, stages) in [(4, 2, 2), (5, 2, 3), (1, 1, 1), (10, 3, 4)] {
            let plans = create_plans(
                &fleet(units),
                Strategy::Rolling,
                chunk,
                "web",
                "web-v1",
                Some("v1"),
                None,
                "",
            )
            .unwrap();
            assert_eq!(plans.len(), stages);
        }
    }

    #[test]
    fn windows_cover_every_unit_exactly_once_in_order() {
        let units = fleet(5);
        let plans = create_plans(
            &units,
            Strategy::Rolling,
            2,
            "web",
            "web-v1",
            Some("v1"),
            None,
            "",
        )
        .unwrap();

        let stopped: Vec<_> = plans
            .iter()
            .flat_map(|p| p.steps())
            .filter(|s| s.action() == StepAction::Stop)
            .map(|s| s.target().to_string())
            .collect();
        let expected: Vec<_> = units.iter().map(|u| u.name().to_string()).collect();
        assert_eq!(stopped, expected);
    }

    #[test]
    fn auto_chunking_defaults_to_the_full_current_count() {
        assert_eq!(
            resolve_chunk_count(Chunking::Auto, Strategy::Rolling, 2, 2, 2).unwrap(),
            2
        );
    }

    #[test]
    fn explicit_chunk_larger_than_fleet_is_a_usage_error() {
        let err =
            resolve_chunk_count(Chunking::Count(3), Strategy::Rolling, 2, 2, 2).unwrap_err();
        assert!(matches!(err, DeployError::Usage(_)));
    }

    #[test]
    fn percent_chunking_rounds_up() {
        // 10 units at 25% -> 3 per stage.
        assert_eq!(
            resolve_chunk_count(Chunking::Percent(25), Strategy::Rolling, 10, 10, 10).unwrap(),
            3
        );
        // 2 units at 50% -> 1 per stage.
        assert_eq!(
            resolve_chunk_count(Chunking::Percent(50), Strategy::Rolling, 2, 2, 2).unwrap(),
            1
        );
    }

    #[test]
    fn percent_base_excludes_destroyed_units_on_shrink() {
        // 10 discovered, 4 desired: the percentage applies to the 4 that
        // remain, not the 10 that exist.
        assert_eq!(
            resolve_chunk_count(Chunking::Percent(50), Strategy::Rolling, 10, 10, 4).unwrap(),
            2
        );
    }

    #[test]
    fn percent_chunking_is_monotonic() {
        let mut previous = 0;
        for percent in 1..=100 {
            let chunk =
                resolve_chunk_count(Chunking::Percent(percent), Strategy::Rolling, 7, 7, 7)
                    .unwrap();
            assert!(chunk >= previous, "chunk shrank at {percent}%");
            previous = chunk;
        }
    }

    #[test]
    fn stopstart_forces_one_stage_regardless_of_chunk_flags() {
        assert_eq!(
            resolve_chunk_count(Chunking::Count(1), Strategy::StopStart, 2, 2, 2).unwrap(),
            2
        );

        let plans = create_plans(
            &fleet(2),
            Strategy::StopStart,
            2,
            "web",
            "web-v1",
            Some("v1"),
            None,
            "",
        )
        .unwrap();
        assert_eq!(plans.len(), 1);
        let rendered: Vec<_> = plans[0].steps().iter().map(Step::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "stop web-v1@1.service",
                "stop web-v1@2.service",
                "start web-v1@1.service",
                "start web-v1@2.service",
            ]
        );
    }

    #[test]
    fn rolling_orders_spawn_stop_start_destroy_within_a_window() {
        let units = vec![
            redeploy("web-v1@1.service").with_action(RequiredAction::Destroy),
            redeploy("web-v1@2.service"),
            Unit::new("web-v2@3.service", UnitState::Uncreated).with_action(RequiredAction::Spawn),
        ];
        let plans = create_plans(
            &units,
            Strategy::Rolling,
            3,
            "web",
            "web-v2",
            Some("v2"),
            None,
            "",
        )
        .unwrap();
        assert_eq!(plans.len(), 1);
        let rendered: Vec<_> = plans[0].steps().iter().map(Step::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "spawn web-v2@3.service",
                "stop web-v1@2.service",
                "start web-v1@2.service",
                "destroy web-v1@1.service",
            ]
        );
    }

    #[test]
    fn atomic_spawns_fresh_names_with_a_running_index() {
        let units = vec![redeploy("web-v1@1.service"), redeploy("web-v1@2.service")];
        let plans = create_plans(
            &units,
            Strategy::Atomic,
            1,
            "web",
            "web-v2",
            Some("v2"),
            Some(Path::new("atomic.sh")),
            "",
        )
        .unwrap();
        assert_eq!(plans.len(), 2);

        let rendered: Vec<Vec<String>> = plans
            .iter()
            .map(|p| p.steps().iter().map(Step::to_string).collect())
            .collect();
        assert_eq!(
            rendered[0],
            vec![
                "spawn web-v2@1.service",
                "external_script atomic.sh",
                "destroy web-v1@1.service",
            ]
        );
        assert_eq!(
            rendered[1],
            vec![
                "spawn web-v2@2.service",
                "external_script atomic.sh",
                "destroy web-v1@2.service",
            ]
        );
    }

    #[test]
    fn atomic_without_handler_is_a_config_error() {
        let err = create_plans(
            &fleet(1),
            Strategy::Atomic,
            1,
            "web",
            "web-v2",
            Some("v2"),
            None,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }
}
