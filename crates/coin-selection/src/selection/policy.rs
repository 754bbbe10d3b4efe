use crate::error::SelectionError;

use serde::{Deserialize, Serialize};

/// Tunable knobs of the Random-Improve heuristic and of the fee loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    /// Candidate draws attempted per target during the improve round.
    pub improve_attempts: usize,
    /// The improve round aims for `requirement * ideal_multiplier`.
    pub ideal_multiplier: u64,
    /// The improve round never exceeds `requirement * upper_multiplier`.
    pub upper_multiplier: u64,
    /// Fee fixed-point iterations before giving up.
    pub max_fee_iterations: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            improve_attempts: 3,
            ideal_multiplier: 2,
            upper_multiplier: 3,
            max_fee_iterations: 8,
        }
    }
}

impl SelectionPolicy {
    /// # Errors
    /// Returns [`SelectionError::InvalidPolicy`] naming the first inconsistent knob.
    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.ideal_multiplier == 0 {
            return Err(SelectionError::InvalidPolicy(
                "ideal_multiplier must be > 0".to_string(),
            ));
        }
        if self.upper_multiplier < self.ideal_multiplier {
            return Err(SelectionError::InvalidPolicy(format!(
                "upper_multiplier {} must be >= ideal_multiplier {}",
                self.upper_multiplier, self.ideal_multiplier
            )));
        }
        if self.max_fee_iterations == 0 {
            return Err(SelectionError::InvalidPolicy(
                "max_fee_iterations must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
