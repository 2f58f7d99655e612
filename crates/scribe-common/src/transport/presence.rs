//! Presence types for editing sessions.
//!
//! The live collaborator list itself is kept in a keyed reactive set by
//! the session layer; this module only defines what a collaborator is
//! and how colours get assigned.

use serde::{Deserialize, Serialize};

use crate::entity::{CollabUser, HasId};

/// Predefined collaborator colours (RGBA, pastel-ish for readability).
pub const COLLABORATOR_COLORS: [u32; 8] = [
    0xFF6B6BFF, // Red
    0x4ECDC4FF, // Teal
    0xFFE66DFF, // Yellow
    0x95E1D3FF, // Mint
    0xF38181FF, // Coral
    0xAA96DAFF, // Purple
    0xFCBF49FF, // Orange
    0x2EC4B6FF, // Cyan
];

/// Colour for the nth collaborator to join.
pub fn color_for(index: usize) -> u32 {
    COLLABORATOR_COLORS[index % COLLABORATOR_COLORS.len()]
}

/// A collaborator present on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user: CollabUser,
    /// Assigned colour (RGBA).
    pub color: u32,
}

impl Collaborator {
    pub fn new(user: CollabUser, index: usize) -> Self {
        Self {
            user,
            color: color_for(index),
        }
    }
}

impl HasId for Collaborator {
    fn id(&self) -> &str {
        &self.user.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_cycle() {
        assert_eq!(color_for(0), COLLABORATOR_COLORS[0]);
        assert_eq!(color_for(8), COLLABORATOR_COLORS[0]);
        assert_eq!(color_for(9), COLLABORATOR_COLORS[1]);
    }

    #[test]
    fn keyed_by_user_id() {
        let c = Collaborator::new(CollabUser::new("user-1", "Alice"), 0);
        assert_eq!(c.id(), "user-1");
    }
}
