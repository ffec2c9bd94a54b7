//! Fill-input selection
//!
//! Candidates are drawn strictly in the order the caller gives them. The
//! amount to cover depends on how many inputs were drawn (each one adds to
//! the fee), so the target is recomputed after every draw.

use crate::error::BuilderError;

/// Anything with a spendable value
pub trait Spendable {
    /// Value in sats
    fn value(&self) -> u64;
}

/// Selection result
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult<T> {
    /// Drawn candidates, in caller order
    pub selected: Vec<T>,
    /// Value of required plus drawn inputs
    pub total_value: u64,
    /// Amount that had to be covered with this selection
    pub required: u64,
}

/// Ordered input selector
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSelector;

impl InputSelector {
    /// Create selector
    pub fn new() -> Self {
        Self
    }

    /// Draw candidates until `base_value` plus the drawn values cover
    /// `required_for(drawn)`
    pub fn select<T, F>(
        &self,
        base_value: u64,
        candidates: &[T],
        required_for: F,
    ) -> Result<SelectionResult<T>, BuilderError>
    where
        T: Spendable + Clone,
        F: Fn(&[T]) -> u64,
    {
        let mut selected: Vec<T> = Vec::new();
        let mut total = base_value;
        let mut remaining = candidates.iter();

        loop {
            let required = required_for(&selected);
            if total >= required {
                tracing::info!(
                    "Selected {} fill input(s), total={}, required={}",
                    selected.len(),
                    total,
                    required
                );
                return Ok(SelectionResult {
                    selected,
                    total_value: total,
                    required,
                });
            }

            match remaining.next() {
                Some(candidate) => {
                    total = total.saturating_add(candidate.value());
                    selected.push(candidate.clone());
                }
                None => {
                    tracing::debug!(
                        "Fill inputs exhausted: required={}, available={}",
                        required,
                        total
                    );
                    return Err(BuilderError::InsufficientFunds {
                        required,
                        available: total,
                    });
                }
            }
        }
    }

    /// Total value of candidates
    pub fn total_available<T: Spendable>(candidates: &[T]) -> u64 {
        candidates.iter().map(Spendable::value).sum()
    }
}
