//! Decision-making agents for MazeBots mazes.
//!
//! The flagship agent is [`MdpAgent`], which re-plans every turn by running
//! value iteration over a reward map rebuilt from fresh percepts. The
//! [`baseline`] module keeps a few simpler agents around as yardsticks.

use mazebots_core::{Direction, GameWorld};
use thiserror::Error;

mod baseline;
mod mdp;

pub use baseline::{RandomAgent, RandomishAgent, SensingAgent};
pub use mdp::{CellValue, MdpAgent, MdpConfig, MoveChoice, SweepSummary, ValueMap};

/// Errors raised while planning a move or validating planner configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// A configuration value fails its sanity check.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The host offered an empty action set, which violates its contract.
    #[error("host offered no legal actions")]
    NoLegalActions,
}

/// Interface every maze agent implements.
pub trait Agent {
    /// Stable identifier used in logs and agent selection.
    fn kind(&self) -> &'static str;

    /// Run one full decision cycle against the live world: observe, choose,
    /// and commit a move. Returns the move the host actually applied.
    fn act(&mut self, world: &mut dyn GameWorld) -> Result<Direction, PlanError>;
}
