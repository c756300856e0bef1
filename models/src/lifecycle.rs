// models/src/lifecycle.rs

use std::fmt::Display;

use crate::errors::{PrectaError, PrectaResult};

/// A status column with a fixed transition table.
pub trait Lifecycle: Copy + Display + PartialEq {
    /// Whether `next` may directly follow `self`.
    fn can_transition_to(&self, next: Self) -> bool;

    /// Terminal states have no outgoing transitions.
    fn is_terminal(&self) -> bool;

    /// The human name of the entity, used in error messages.
    fn entity() -> &'static str;

    fn ensure_transition(&self, next: Self) -> PrectaResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(PrectaError::Conflict(format!(
                "Cannot move {} from '{}' to '{}'",
                Self::entity(),
                self,
                next
            )))
        }
    }
}
