//! Baseline agents: cheap yardsticks for comparing against the planner and
//! a sensing probe that dumps percepts to the log.

use mazebots_core::{Direction, GameWorld};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::{Agent, PlanError};

/// Picks uniformly among the legal moves every turn.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: SmallRng,
}

impl RandomAgent {
    /// Build with an explicit seed for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Build from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        let seed: u64 = rand::random();
        Self::seeded(seed)
    }
}

impl Agent for RandomAgent {
    fn kind(&self) -> &'static str {
        "random"
    }

    fn act(&mut self, world: &mut dyn GameWorld) -> Result<Direction, PlanError> {
        let mut legal = world.legal_actions();
        legal.retain(|direction| *direction != Direction::Stop);
        if legal.is_empty() {
            return Err(PlanError::NoLegalActions);
        }
        let pick = legal[self.rng.random_range(0..legal.len())];
        Ok(world.commit(pick, &legal))
    }
}

/// Keeps walking in its previous direction for as long as that stays legal,
/// otherwise picks a fresh random legal move.
#[derive(Debug, Clone)]
pub struct RandomishAgent {
    rng: SmallRng,
    last: Direction,
}

impl RandomishAgent {
    /// Build with an explicit seed for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            last: Direction::Stop,
        }
    }

    /// Build from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        let seed: u64 = rand::random();
        Self::seeded(seed)
    }
}

impl Agent for RandomishAgent {
    fn kind(&self) -> &'static str {
        "randomish"
    }

    fn act(&mut self, world: &mut dyn GameWorld) -> Result<Direction, PlanError> {
        let mut legal = world.legal_actions();
        legal.retain(|direction| *direction != Direction::Stop);
        if legal.is_empty() {
            return Err(PlanError::NoLegalActions);
        }
        if !legal.contains(&self.last) {
            self.last = legal[self.rng.random_range(0..legal.len())];
        }
        Ok(world.commit(self.last, &legal))
    }
}

/// Stands still and logs everything it can see. Useful when wiring a new
/// host surface up to the agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensingAgent;

impl Agent for SensingAgent {
    fn kind(&self) -> &'static str {
        "sensing"
    }

    fn act(&mut self, world: &mut dyn GameWorld) -> Result<Direction, PlanError> {
        let agent = world.agent_cell();
        let legal = world.legal_actions();
        info!(
            cell = %agent,
            legal = ?legal,
            food = world.food().len(),
            capsules = world.capsules().len(),
            walls = world.walls().len(),
            ghosts = world.ghosts().len(),
            "maze percepts"
        );
        for sighting in world.ghosts() {
            info!(
                x = sighting.position.0,
                y = sighting.position.1,
                danger_ticks = sighting.danger_ticks,
                distance = agent.manhattan_distance(sighting.cell()),
                "ghost sighted"
            );
        }
        Ok(world.commit(Direction::Stop, &legal))
    }
}
