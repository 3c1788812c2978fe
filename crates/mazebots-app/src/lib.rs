//! Episode plumbing for the MazeBots demo binary: built-in layouts and a
//! bounded game loop over a [`MazeSnapshot`].

use mazebots_brain::{Agent, MdpConfig, PlanError};
use mazebots_core::{GameWorld, MazeSnapshot};
use tracing::debug;

/// Small bordered maze with one static ghost, quick to clear.
pub const SMALL_LAYOUT: &str = "
%%%%%%%%%
%o.   ..%
%.%% %%.%
%   P  G%
%.%% %%.%
%..   ..%
%%%%%%%%%";

/// Larger maze in the classic style: two ghosts boxed mid-maze and a
/// capsule in each lower pocket.
pub const MEDIUM_LAYOUT: &str = "
%%%%%%%%%%%%%%%%%%%%
%....%........%....%
%.%%.%.%%%%%%.%.%%.%
%.%..............%.%
%.%.%%.%%  %%.%%.%.%
%...%  %G  G%  %...%
%.%.%%.%%%%%%.%%.%.%
%.%....o......%..%.%
%.%%.%.%%%%%%.%.%%.%
%o...%....P...%....%
%%%%%%%%%%%%%%%%%%%%";

/// Resolve a named built-in layout.
#[must_use]
pub fn builtin_layout(name: &str) -> Option<&'static str> {
    match name {
        "small" => Some(SMALL_LAYOUT),
        "medium" => Some(MEDIUM_LAYOUT),
        _ => None,
    }
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All food eaten.
    Cleared,
    /// The agent shares a cell with a dangerous ghost.
    Caught,
    /// The turn cap ran out first.
    TurnLimit,
}

/// Statistics from one finished episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub outcome: Outcome,
    pub turns: u32,
    pub food_eaten: usize,
}

/// Drive `agent` through `world` until the maze is cleared, the agent is
/// caught, or the turn cap runs out. Ghost sightings stay where the layout
/// put them; the loop exercises decision-making, not ghost pathing.
pub fn run_episode(
    agent: &mut dyn Agent,
    world: &mut MazeSnapshot,
    max_turns: u32,
) -> Result<EpisodeSummary, PlanError> {
    let food_at_start = world.food().len();
    let edible_threshold = MdpConfig::default().edible_threshold;
    let mut turns = 0;
    let outcome = loop {
        if world.food().is_empty() {
            break Outcome::Cleared;
        }
        if caught(world, edible_threshold) {
            break Outcome::Caught;
        }
        if turns == max_turns {
            break Outcome::TurnLimit;
        }
        turns += 1;
        let applied = agent.act(world)?;
        debug!(
            turn = turns,
            applied = %applied,
            cell = %world.agent_cell(),
            food = world.food().len(),
            "turn finished"
        );
    };
    Ok(EpisodeSummary {
        outcome,
        turns,
        food_eaten: food_at_start - world.food().len(),
    })
}

fn caught(world: &MazeSnapshot, edible_threshold: u32) -> bool {
    let agent = world.agent_cell();
    world
        .ghosts()
        .iter()
        .any(|sighting| sighting.danger_ticks >= edible_threshold && sighting.cell() == agent)
}
