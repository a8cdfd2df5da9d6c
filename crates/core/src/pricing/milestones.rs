use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestonePhase {
    pub phase: String,
    pub description: String,
    pub fraction: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub phase: String,
    pub label: String,
    pub description: String,
    pub fraction: Decimal,
    pub amount: Decimal,
}

/// Sequential payment phases whose fractions sum to exactly one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MilestoneSchedule {
    phases: Vec<MilestonePhase>,
}

impl Default for MilestoneSchedule {
    fn default() -> Self {
        Self {
            phases: vec![
                phase("Initial Deposit", "Project kickoff & discovery", 20),
                phase("Design Approval", "Final UI/UX wireframes", 25),
                phase("Development Complete", "Core features implemented", 35),
                phase("Final Delivery", "Deployment & handover", 20),
            ],
        }
    }
}

fn phase(name: &str, description: &str, percent: i64) -> MilestonePhase {
    MilestonePhase {
        phase: name.to_string(),
        description: description.to_string(),
        fraction: Decimal::new(percent, 2),
    }
}

impl MilestoneSchedule {
    pub fn new(phases: Vec<MilestonePhase>) -> Result<Self, DomainError> {
        if phases.is_empty() {
            return Err(DomainError::InvariantViolation(
                "milestone schedule needs at least one phase".to_string(),
            ));
        }
        if phases.iter().any(|phase| phase.fraction <= Decimal::ZERO) {
            return Err(DomainError::InvariantViolation(
                "milestone fractions must be positive".to_string(),
            ));
        }
        let sum: Decimal = phases.iter().map(|phase| phase.fraction).sum();
        if sum != Decimal::ONE {
            return Err(DomainError::InvariantViolation(format!(
                "milestone fractions must sum to 1, got {sum}"
            )));
        }
        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[MilestonePhase] {
        &self.phases
    }

    /// Splits `total` into whole-naira amounts. Each phase is rounded half
    /// away from zero and the final phase takes the residual, so the amounts
    /// always sum to `total`.
    pub fn split(&self, total: Decimal) -> Vec<Milestone> {
        let last_index = self.phases.len().saturating_sub(1);
        let mut allocated = Decimal::ZERO;

        self.phases
            .iter()
            .enumerate()
            .map(|(index, phase)| {
                let amount = if index == last_index {
                    total - allocated
                } else {
                    (total * phase.fraction)
                        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                };
                allocated += amount;
                Milestone {
                    phase: phase.phase.clone(),
                    label: format!(
                        "{} ({}%)",
                        phase.phase,
                        (phase.fraction * Decimal::ONE_HUNDRED).normalize()
                    ),
                    description: phase.description.clone(),
                    fraction: phase.fraction,
                    amount,
                }
            })
            .collect()
    }
}
