//! Production coordinator
//!
//! Owns the cycle loop: cadence, failure counting, cooldown and the
//! operational surface (`start`, `stop`, `restart`, `status`, `health`).

mod production;
mod state;

pub use production::ProductionCoordinator;
pub use state::{CoordinatorPhase, CoordinatorState};
