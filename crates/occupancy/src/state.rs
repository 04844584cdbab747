//! OccupancyState - the replicated driver/passenger flags of one vehicle.
//!
//! [`OccupancyState::apply`] is the only way to change the flags and it
//! rejects any caller that is not the current authority holder.

use contracts::{AgentId, ContractError, OccupancyFlags, Participant, VehicleId};

/// Every change the holder can make to the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyMutation {
    ConfirmDriver,
    ConfirmPassenger,
    RemoveDriver,
    RemovePassenger,
    /// Unsolicited grant: authority without a committed driver
    ResetDriver,
}

impl OccupancyMutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyMutation::ConfirmDriver => "confirm_driver",
            OccupancyMutation::ConfirmPassenger => "confirm_passenger",
            OccupancyMutation::RemoveDriver => "remove_driver",
            OccupancyMutation::RemovePassenger => "remove_passenger",
            OccupancyMutation::ResetDriver => "reset_driver",
        }
    }
}

/// Single-writer occupancy flags
#[derive(Debug, Clone)]
pub struct OccupancyState {
    vehicle: VehicleId,
    host: AgentId,
    flags: OccupancyFlags,
}

impl OccupancyState {
    pub fn new(vehicle: VehicleId) -> Self {
        Self {
            vehicle,
            host: AgentId::new("host"),
            flags: OccupancyFlags::default(),
        }
    }

    /// Name reported for the session host in errors
    pub fn with_host(mut self, host: AgentId) -> Self {
        self.host = host;
        self
    }

    pub fn flags(&self) -> OccupancyFlags {
        self.flags
    }

    /// Apply `mutation` on behalf of `caller`.
    ///
    /// Returns whether the flags changed.
    ///
    /// # Errors
    /// `NotAuthority` when `caller` is not `holder`.
    pub fn apply(
        &mut self,
        holder: &Participant,
        caller: &Participant,
        mutation: OccupancyMutation,
    ) -> Result<bool, ContractError> {
        if holder != caller {
            return Err(ContractError::not_authority(
                self.vehicle.as_str(),
                caller.resolve(&self.host).to_string(),
                holder.resolve(&self.host).to_string(),
            ));
        }

        let before = self.flags;
        match mutation {
            OccupancyMutation::ConfirmDriver => self.flags.has_driver = true,
            OccupancyMutation::ConfirmPassenger => self.flags.has_passenger = true,
            OccupancyMutation::RemoveDriver | OccupancyMutation::ResetDriver => {
                self.flags.has_driver = false
            }
            OccupancyMutation::RemovePassenger => self.flags.has_passenger = false,
        }
        Ok(before != self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Participant {
        Participant::Agent("alice".into())
    }

    #[test]
    fn test_holder_mutates() {
        let mut state = OccupancyState::new("buggy".into());
        assert!(state
            .apply(&alice(), &alice(), OccupancyMutation::ConfirmDriver)
            .unwrap());
        assert!(state.flags().has_driver);

        // Same value again is not a change
        assert!(!state
            .apply(&alice(), &alice(), OccupancyMutation::ConfirmDriver)
            .unwrap());
    }

    #[test]
    fn test_non_holder_rejected() {
        let mut state = OccupancyState::new("buggy".into());
        let bob = Participant::Agent("bob".into());

        let err = state
            .apply(&alice(), &bob, OccupancyMutation::ConfirmPassenger)
            .unwrap_err();
        assert!(matches!(err, ContractError::NotAuthority { .. }));
        assert!(err.to_string().contains("'bob'"));
        assert!(!state.flags().has_passenger);

        // The host is not an agent
        assert!(state
            .apply(&Participant::Host, &alice(), OccupancyMutation::ResetDriver)
            .is_err());
    }

    #[test]
    fn test_error_names_configured_host() {
        let mut state = OccupancyState::new("buggy".into()).with_host("server".into());
        let err = state
            .apply(&Participant::Host, &alice(), OccupancyMutation::ConfirmDriver)
            .unwrap_err();
        assert!(err.to_string().contains("'server'"), "{err}");
    }

    #[test]
    fn test_reset_clears_driver_only() {
        let mut state = OccupancyState::new("buggy".into());
        let host = Participant::Host;
        state
            .apply(&host, &host, OccupancyMutation::ConfirmDriver)
            .unwrap();
        state
            .apply(&host, &host, OccupancyMutation::ConfirmPassenger)
            .unwrap();
        state
            .apply(&host, &host, OccupancyMutation::ResetDriver)
            .unwrap();

        assert!(!state.flags().has_driver);
        assert!(state.flags().has_passenger);
    }
}
