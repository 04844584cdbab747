//! Configuration validation
//!
//! Field ranges come from the `validator` derives on the blueprint types.
//! Cross-field rules checked here:
//! - vehicle ids and agent ids unique
//! - exactly four wheels per vehicle, one per role
//! - response curve keys well formed
//! - host id distinct from every agent id
//! - script entries reference known agents and vehicles

use std::collections::HashSet;

use contracts::{ContractError, ScriptAction, SessionBlueprint, VehicleConfig, WheelRole};
use ::validator::Validate;

/// Validate a SessionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_vehicle_ids(blueprint)?;
    validate_agent_ids(blueprint)?;
    for vehicle in &blueprint.vehicles {
        validate_wheels(vehicle)?;
        validate_curves(vehicle)?;
    }
    validate_script(blueprint)?;
    Ok(())
}

/// Derived field range checks
fn validate_ranges(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Vehicle id uniqueness
fn validate_vehicle_ids(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for vehicle in &blueprint.vehicles {
        if vehicle.id.is_empty() {
            return Err(ContractError::config_validation(
                "vehicles[].id",
                "vehicle id cannot be empty",
            ));
        }
        if !seen.insert(&vehicle.id) {
            return Err(ContractError::config_validation(
                format!("vehicles[id={}]", vehicle.id),
                "duplicate vehicle id",
            ));
        }
    }
    Ok(())
}

/// Agent id uniqueness, and no agent may impersonate the host
fn validate_agent_ids(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let host = &blueprint.session.host_id;
    if host.is_empty() {
        return Err(ContractError::config_validation(
            "session.host_id",
            "host id cannot be empty",
        ));
    }

    let mut seen = HashSet::new();
    for agent in &blueprint.agents {
        if agent.id.is_empty() {
            return Err(ContractError::config_validation(
                "agents[].id",
                "agent id cannot be empty",
            ));
        }
        if agent.id == *host {
            return Err(ContractError::config_validation(
                format!("agents[id={}]", agent.id),
                "agent id collides with session.host_id",
            ));
        }
        if !seen.insert(&agent.id) {
            return Err(ContractError::config_validation(
                format!("agents[id={}]", agent.id),
                "duplicate agent id",
            ));
        }
    }
    Ok(())
}

/// Four wheels, one per drive role
fn validate_wheels(vehicle: &VehicleConfig) -> Result<(), ContractError> {
    let field = format!("vehicles[{}].wheels", vehicle.id);
    if vehicle.wheels.len() != WheelRole::ALL.len() {
        return Err(ContractError::config_validation(
            field,
            format!("expected 4 wheels, got {}", vehicle.wheels.len()),
        ));
    }

    let roles: HashSet<_> = vehicle.wheels.iter().map(|wheel| wheel.role).collect();
    if let Some(missing) = WheelRole::ALL.iter().find(|role| !roles.contains(role)) {
        return Err(ContractError::config_validation(
            field,
            format!("missing wheel role '{}'", missing.as_str()),
        ));
    }

    if vehicle
        .wheels
        .iter()
        .flat_map(|wheel| wheel.mount)
        .any(|c| !c.is_finite())
    {
        return Err(ContractError::config_validation(
            field,
            "wheel mount must be finite",
        ));
    }
    Ok(())
}

/// Curve key domain and ordering
fn validate_curves(vehicle: &VehicleConfig) -> Result<(), ContractError> {
    for (name, curve) in vehicle.dynamics.curves() {
        curve.check().map_err(|message| {
            ContractError::config_validation(
                format!("vehicles[{}].dynamics.{name}", vehicle.id),
                message,
            )
        })?;
    }
    Ok(())
}

/// Script references
fn validate_script(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for (idx, step) in blueprint.script.iter().enumerate() {
        if blueprint.agent(&step.agent).is_none() {
            return Err(ContractError::config_validation(
                format!("script[{idx}].agent"),
                format!("unknown agent '{}'", step.agent),
            ));
        }
        if let ScriptAction::Focus { vehicle } = &step.action {
            if blueprint.vehicle(vehicle).is_none() {
                return Err(ContractError::config_validation(
                    format!("script[{idx}].action.vehicle"),
                    format!("unknown vehicle '{vehicle}'"),
                ));
            }
        }
        if step.tick >= blueprint.session.max_ticks {
            return Err(ContractError::config_validation(
                format!("script[{idx}].tick"),
                format!(
                    "tick {} is beyond session.max_ticks ({})",
                    step.tick, blueprint.session.max_ticks
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        default_wheels, AgentConfig, ChassisConfig, ConfigVersion, DynamicsConfig, Pose,
        ResponseCurve, ScriptStep, SeatLayout, SessionConfig,
    };

    fn minimal_blueprint() -> SessionBlueprint {
        SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionConfig {
                name: "lot".into(),
                host_id: "host".into(),
                physics_hz: 50.0,
                gravity: -9.81,
                ground_height: 0.0,
                ground_slope_deg: 0.0,
                request_timeout_ms: 0,
                max_ticks: 100,
                queue_capacity: 16,
            },
            vehicles: vec![VehicleConfig {
                id: "buggy".into(),
                spawn: Pose::default(),
                seats: SeatLayout::default(),
                chassis: ChassisConfig::default(),
                wheels: default_wheels(),
                dynamics: DynamicsConfig::default(),
            }],
            agents: vec![
                AgentConfig { id: "alice".into() },
                AgentConfig { id: "bob".into() },
            ],
            script: vec![ScriptStep {
                tick: 0,
                agent: "alice".into(),
                action: ScriptAction::Focus {
                    vehicle: "buggy".into(),
                },
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_vehicle_id() {
        let mut bp = minimal_blueprint();
        bp.vehicles.push(bp.vehicles[0].clone());
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate vehicle id"));
    }

    #[test]
    fn test_duplicate_agent_id() {
        let mut bp = minimal_blueprint();
        bp.agents.push(AgentConfig { id: "bob".into() });
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate agent id"));
    }

    #[test]
    fn test_agent_named_like_host() {
        let mut bp = minimal_blueprint();
        bp.agents.push(AgentConfig { id: "host".into() });
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("host_id"));
    }

    #[test]
    fn test_missing_wheel_role() {
        let mut bp = minimal_blueprint();
        bp.vehicles[0].wheels[3].role = WheelRole::RearLeft;
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("rear_right"));
    }

    #[test]
    fn test_wrong_wheel_count() {
        let mut bp = minimal_blueprint();
        bp.vehicles[0].wheels.pop();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("expected 4 wheels"));
    }

    #[test]
    fn test_unsorted_curve() {
        let mut bp = minimal_blueprint();
        bp.vehicles[0].dynamics.brake_curve = ResponseCurve::new(vec![[0.8, 1.0], [0.2, 0.5]]);
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("brake_curve"));
    }

    #[test]
    fn test_script_unknown_agent() {
        let mut bp = minimal_blueprint();
        bp.script[0].agent = "mallory".into();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("unknown agent"));
    }

    #[test]
    fn test_script_unknown_vehicle() {
        let mut bp = minimal_blueprint();
        bp.script[0].action = ScriptAction::Focus {
            vehicle: "truck".into(),
        };
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("unknown vehicle"));
    }

    #[test]
    fn test_script_tick_past_end() {
        let mut bp = minimal_blueprint();
        bp.script[0].tick = 100;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_derived_range_check() {
        let mut bp = minimal_blueprint();
        bp.vehicles[0].dynamics.reverse_speed_limit = 0.0;
        let err = validate(&bp).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_no_vehicles() {
        let mut bp = minimal_blueprint();
        bp.vehicles.clear();
        bp.script.clear();
        assert!(validate(&bp).is_err());
    }
}
