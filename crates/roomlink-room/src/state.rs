//! The room lifecycle state machine.

use std::fmt;

/// The lifecycle state of a room.
///
/// Transitions are strictly ordered and `Destroyed` is terminal:
///
/// ```text
/// Created → Active → Destroyed
///    └───────────────────↑
/// ```
///
/// - **Created**: The host is in, nobody has joined yet.
/// - **Active**: At least one member has joined at some point. The
///   room stays `Active` if members leave again.
/// - **Destroyed**: Removed from the room table. No further operation
///   on the room has any effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomState {
    Created,
    Active,
    Destroyed,
}

impl RoomState {
    /// Returns `true` if the room still accepts members.
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Destroyed)
    }

    /// Returns `true` if moving to `target` is allowed.
    ///
    /// Staying in the same live state counts as allowed, so repeated
    /// joins keep an `Active` room `Active`.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Destroyed, _) => false,
            (_, Self::Destroyed) => true,
            (Self::Created, _) => true,
            (Self::Active, Self::Active) => true,
            (Self::Active, Self::Created) => false,
        }
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Active => write!(f, "Active"),
            Self::Destroyed => write!(f, "Destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_transitions_follow_lifecycle() {
        assert!(RoomState::Created.can_transition_to(RoomState::Active));
        assert!(RoomState::Created.can_transition_to(RoomState::Destroyed));
        assert!(RoomState::Active.can_transition_to(RoomState::Active));
        assert!(RoomState::Active.can_transition_to(RoomState::Destroyed));
        assert!(!RoomState::Active.can_transition_to(RoomState::Created));
    }

    #[test]
    fn test_room_state_destroyed_is_terminal() {
        for target in [RoomState::Created, RoomState::Active, RoomState::Destroyed] {
            assert!(!RoomState::Destroyed.can_transition_to(target));
        }
        assert!(!RoomState::Destroyed.is_live());
        assert!(RoomState::Created.is_live());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::Created.to_string(), "Created");
        assert_eq!(RoomState::Destroyed.to_string(), "Destroyed");
    }
}
