//! Inventory reconciler — diffs the discovered fleet against the desired
//! replica count and assigns each unit its required action.

use convoy_cluster::UnitListing;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};
use crate::unit::{parse_tag, template_unit_name, unit_name, RequiredAction, Unit, UnitState};

/// Outcome of reconciliation: the full ordered unit collection plus the
/// counts planning needs.
#[derive(Debug)]
pub(crate) struct Inventory {
    pub units: Vec<Unit>,
    /// Number of pre-existing units discovered in the cluster.
    pub discovered: usize,
    pub desired: usize,
    /// Release tag: the explicit one, or derived from the first discovered
    /// unit name.
    pub tag: Option<String>,
}

/// Reconcile the cluster's view of a service against a desired count.
///
/// Discovery keeps the scheduler's reporting order. Surplus units are
/// trimmed from the front of that ordering; the trim side is arbitrary but
/// must stay fixed so repeated runs pick the same victims. Missing units
/// are synthesized with indices continuing from the discovered count.
pub(crate) fn reconcile(
    listings: &[UnitListing],
    service: &str,
    explicit_tag: Option<&str>,
    instances: Option<usize>,
) -> DeployResult<Inventory> {
    let prefix = format!("{service}-");
    let template = template_unit_name(service);

    let mut units = Vec::new();
    for listing in listings {
        if !listing.name.starts_with(&prefix) || listing.name == template {
            continue;
        }
        let unit = Unit::from_listing(&listing.name, &listing.current_state)?;
        debug!(unit = %unit.name(), state = %unit.state(), "discovered unit");
        units.push(unit);
    }

    if units.is_empty() {
        return Err(DeployError::NoUnitsFound(service.to_string()));
    }

    let discovered = units.len();
    let desired = instances.unwrap_or(discovered);
    let tag = explicit_tag
        .or_else(|| parse_tag(units[0].name(), service))
        .map(str::to_string);

    if desired < discovered {
        let surplus = discovered - desired;
        for unit in &mut units[..surplus] {
            unit.set_required_action(RequiredAction::Destroy);
        }
    } else if desired > discovered {
        let tag = tag.as_deref().ok_or_else(|| {
            DeployError::Config(format!(
                "cannot name new units for '{service}': no tag given and none derivable"
            ))
        })?;
        for index in discovered + 1..=desired {
            units.push(
                Unit::new(unit_name(service, tag, index), UnitState::Uncreated)
                    .with_action(RequiredAction::Spawn),
            );
        }
    }

    info!(
        service,
        discovered,
        desired,
        "inventory reconciled"
    );
    Ok(Inventory {
        units,
        discovered,
        desired,
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, state: &str) -> UnitListing {
        UnitListing {
            name: name.into(),
            current_state: state.into(),
        }
    }

    fn fleet_of_two() -> Vec<UnitListing> {
        vec![
            listing("web@.service", "inactive"),
            listing("web-v1@1.service", "launched"),
            listing("web-v1@2.service", "launched"),
        ]
    }

    #[test]
    fn template_and_foreign_units_are_excluded() {
        let mut listings = fleet_of_two();
        listings.push(listing("webmail-v1@1.service", "launched"));
        listings.push(listing("other-v1@1.service", "launched"));

        let inventory = reconcile(&listings, "web", None, None).unwrap();
        assert_eq!(inventory.discovered, 2);
        assert_eq!(
            inventory.units.iter().map(Unit::name).collect::<Vec<_>>(),
            vec!["web-v1@1.service", "web-v1@2.service"]
        );
    }

    #[test]
    fn flat_count_keeps_every_action_redeploy() {
        let inventory = reconcile(&fleet_of_two(), "web", None, Some(2)).unwrap();
        assert!(inventory
            .units
            .iter()
            .all(|u| u.required_action() == RequiredAction::Redeploy));
    }

    #[test]
    fn scale_up_synthesizes_spawn_units_with_increasing_indices() {
        let inventory = reconcile(&fleet_of_two(), "web", Some("v2"), Some(4)).unwrap();
        assert_eq!(inventory.units.len(), 4);
        let spawned: Vec<_> = inventory
            .units
            .iter()
            .filter(|u| u.required_action() == RequiredAction::Spawn)
            .collect();
        assert_eq!(spawned.len(), 2);
        assert_eq!(spawned[0].name(), "web-v2@3.service");
        assert_eq!(spawned[1].name(), "web-v2@4.service");
        assert!(spawned.iter().all(|u| u.state() == UnitState::Uncreated));
    }

    #[test]
    fn scale_down_marks_leading_units_destroy() {
        let inventory = reconcile(&fleet_of_two(), "web", None, Some(1)).unwrap();
        assert_eq!(
            inventory.units[0].required_action(),
            RequiredAction::Destroy
        );
        assert_eq!(
            inventory.units[1].required_action(),
            RequiredAction::Redeploy
        );
    }

    #[test]
    fn scale_to_zero_destroys_everything() {
        let inventory = reconcile(&fleet_of_two(), "web", None, Some(0)).unwrap();
        assert!(inventory
            .units
            .iter()
            .all(|u| u.required_action() == RequiredAction::Destroy));
    }

    #[test]
    fn empty_fleet_is_an_error_regardless_of_desired_count() {
        let listings = vec![listing("web@.service", "inactive")];
        for instances in [None, Some(0), Some(3)] {
            let err = reconcile(&listings, "web", None, instances).unwrap_err();
            assert!(matches!(err, DeployError::NoUnitsFound(_)));
        }
    }

    #[test]
    fn tag_is_derived_from_first_unit_when_not_given() {
        let inventory = reconcile(&fleet_of_two(), "web", None, None).unwrap();
        assert_eq!(inventory.tag.as_deref(), Some("v1"));
    }

    #[test]
    fn scale_up_without_derivable_tag_is_a_config_error() {
        // Units named outside the {service}-{tag}@{index} convention.
        let listings = vec![listing("web-solo.service", "launched")];
        let err = reconcile(&listings, "web", None, Some(2)).unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }
}
