//! Value-iteration planner.
//!
//! Every decision cycle rebuilds a reward map from fresh percepts, relaxes
//! cell utilities with Bellman sweeps until they settle, then picks the legal
//! move with the best expected utility under the host's actuation noise.

use mazebots_core::{
    Bounds, Cell, Direction, GameWorld, SizeTier, DIRECT_MOVE_CHANCE, LATERAL_DRIFT_CHANCE,
};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::{Agent, PlanError};

/// Floor seeding the unconstrained running maximum in [`ValueMap::appraise`].
const OPTIMUM_FLOOR: f64 = -500.0;

/// Tuning knobs for the value-iteration planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MdpConfig {
    /// Reward carried by every open cell, the per-turn living cost.
    pub living_cost: f64,
    /// Sentinel reward marking walls. Any cell at or below it is impassable.
    pub wall_reward: f64,
    /// Flat food reward on small mazes.
    pub small_food_reward: f64,
    /// Column multiplier of the food reward on large mazes.
    pub food_reward_slope: f64,
    /// Base offset of the food reward on large mazes.
    pub food_reward_offset: f64,
    /// Reward written onto capsule cells.
    pub capsule_reward: f64,
    /// Reward on the cell of a ghost whose danger countdown has nearly run out.
    pub edible_ghost_reward: f64,
    /// Danger countdown below which a ghost counts as edible.
    pub edible_threshold: u32,
    /// Manhattan radius within which a dangerous ghost is close.
    pub proximity_radius: u32,
    /// Penalty on the cell of a close dangerous ghost.
    pub close_ghost_penalty: f64,
    /// Penalty on each orthogonal neighbour of a close dangerous ghost.
    pub ghost_halo_penalty: f64,
    /// Penalty on the cell of a distant dangerous ghost.
    pub far_ghost_penalty: f64,
    /// Flat penalty on every ghost cell on small mazes.
    pub small_ghost_penalty: f64,
    /// Weight applied to future utility in each Bellman update.
    pub discount: f64,
    /// Per-cell utility delta under which a cell counts as settled.
    pub convergence_epsilon: f64,
    /// Hard cap on Bellman sweeps per decision.
    pub max_sweeps: u32,
}

impl Default for MdpConfig {
    fn default() -> Self {
        Self {
            living_cost: -0.04,
            wall_reward: -1000.0,
            small_food_reward: 10.0,
            food_reward_slope: 5.0,
            food_reward_offset: 5.0,
            capsule_reward: 50.0,
            edible_ghost_reward: 5.0,
            edible_threshold: 3,
            proximity_radius: 5,
            close_ghost_penalty: -150.0,
            ghost_halo_penalty: -100.0,
            far_ghost_penalty: -200.0,
            small_ghost_penalty: -100.0,
            discount: 0.9,
            convergence_epsilon: 0.05,
            max_sweeps: 50,
        }
    }
}

impl MdpConfig {
    /// Check invariants between the knobs. Call before handing the
    /// configuration to an agent.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.living_cost.is_finite() || !self.wall_reward.is_finite() {
            return Err(PlanError::InvalidConfig(
                "living cost and wall sentinel must be finite",
            ));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(PlanError::InvalidConfig("discount must lie in (0, 1]"));
        }
        if !(self.convergence_epsilon > 0.0) || !self.convergence_epsilon.is_finite() {
            return Err(PlanError::InvalidConfig(
                "convergence epsilon must be positive and finite",
            ));
        }
        if self.max_sweeps == 0 {
            return Err(PlanError::InvalidConfig("sweep cap must be at least one"));
        }
        if self.wall_reward >= self.living_cost {
            return Err(PlanError::InvalidConfig(
                "wall sentinel must sit below the living cost",
            ));
        }
        if self.close_ghost_penalty <= self.wall_reward
            || self.ghost_halo_penalty <= self.wall_reward
            || self.far_ghost_penalty <= self.wall_reward
            || self.small_ghost_penalty <= self.wall_reward
        {
            return Err(PlanError::InvalidConfig(
                "ghost penalties must stay above the wall sentinel",
            ));
        }
        Ok(())
    }
}

/// Reward and utility tracked for one maze cell.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CellValue {
    pub reward: f64,
    pub utility: f64,
}

impl CellValue {
    const fn seeded(reward: f64) -> Self {
        Self {
            reward,
            utility: 0.0,
        }
    }
}

/// Per-cell rewards and utilities over the maze rectangle, rebuilt from
/// scratch for every decision.
#[derive(Debug, Clone)]
pub struct ValueMap {
    cells: HashMap<Cell, CellValue>,
    wall_sentinel: f64,
}

impl ValueMap {
    /// Seed a map covering every cell of `bounds`: walls get the sentinel
    /// reward, open cells the living cost, and all utilities start at zero.
    #[must_use]
    pub fn seed(bounds: Bounds, walls: &HashSet<Cell>, config: &MdpConfig) -> Self {
        let mut cells = HashMap::with_capacity((bounds.width() * bounds.height()) as usize);
        for cell in bounds.cells() {
            let reward = if walls.contains(&cell) {
                config.wall_reward
            } else {
                config.living_cost
            };
            cells.insert(cell, CellValue::seeded(reward));
        }
        Self {
            cells,
            wall_sentinel: config.wall_reward,
        }
    }

    /// Overlay entity rewards onto a freshly seeded map.
    ///
    /// Writes land in a fixed order so that later entities win overlaps:
    /// food, then capsules, then ghosts, and finally the agent's own cell is
    /// reset to the living cost. Wall cells are never overwritten.
    pub fn annotate(&mut self, world: &dyn GameWorld, tier: SizeTier, config: &MdpConfig) {
        let agent = world.agent_cell();
        for &cell in world.food() {
            let reward = match tier {
                SizeTier::Large => {
                    f64::from(cell.x) * config.food_reward_slope + config.food_reward_offset
                }
                SizeTier::Small => config.small_food_reward,
            };
            self.set_reward(cell, reward);
        }
        for &cell in world.capsules() {
            self.set_reward(cell, config.capsule_reward);
        }
        for sighting in world.ghosts() {
            let ghost = sighting.cell();
            match tier {
                SizeTier::Large => {
                    if sighting.danger_ticks < config.edible_threshold {
                        self.set_reward(ghost, config.edible_ghost_reward);
                    } else if agent.manhattan_distance(ghost) < config.proximity_radius {
                        self.set_reward(ghost, config.close_ghost_penalty);
                        for direction in Direction::CARDINALS {
                            self.set_reward(ghost.step(direction), config.ghost_halo_penalty);
                        }
                    } else {
                        self.set_reward(ghost, config.far_ghost_penalty);
                    }
                }
                SizeTier::Small => self.set_reward(ghost, config.small_ghost_penalty),
            }
        }
        // The agent's own cell never carries an entity reward.
        self.set_reward(agent, config.living_cost);
    }

    /// Write `reward` into `cell`, leaving walls and cells outside the map
    /// untouched.
    fn set_reward(&mut self, cell: Cell, reward: f64) {
        if let Some(value) = self.cells.get_mut(&cell) {
            if value.reward > self.wall_sentinel {
                value.reward = reward;
            }
        }
    }

    /// Stored value of `cell`, if the cell lies inside the map.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<CellValue> {
        self.cells.get(&cell).copied()
    }

    /// Utility of `cell`, zero when the cell lies outside the map.
    #[must_use]
    pub fn utility(&self, cell: Cell) -> f64 {
        self.cells.get(&cell).map_or(0.0, |value| value.utility)
    }

    /// Whether `cell` holds the impassable sentinel.
    #[must_use]
    pub fn is_wall(&self, cell: Cell) -> bool {
        self.cells
            .get(&cell)
            .is_some_and(|value| value.reward <= self.wall_sentinel)
    }

    /// Number of tracked cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the map tracks no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Utility of each cardinal move's destination, in [`Direction::CARDINALS`]
    /// order. A destination outside the map or inside a wall collapses to the
    /// origin cell, which is where a blocked move leaves the agent.
    #[must_use]
    pub fn move_utilities(&self, origin: Cell) -> [f64; 4] {
        let origin_utility = self.utility(origin);
        let mut utilities = [0.0; 4];
        for (slot, direction) in utilities.iter_mut().zip(Direction::CARDINALS) {
            let destination = origin.step(direction);
            *slot = match self.cells.get(&destination) {
                Some(value) if value.reward > self.wall_sentinel => value.utility,
                _ => origin_utility,
            };
        }
        utilities
    }

    /// Appraise the four cardinal moves from `origin` under actuation noise.
    ///
    /// Ties break toward the earlier direction in [`Direction::CARDINALS`].
    /// When no legal move beats the zero seed the choice stays at the North
    /// default.
    #[must_use]
    pub fn appraise(&self, origin: Cell, legal: &[Direction]) -> MoveChoice {
        let utilities = self.move_utilities(origin);
        let mut choice = MoveChoice {
            action: Direction::North,
            optimum: OPTIMUM_FLOOR,
            legal_best: 0.0,
        };
        for candidate in Direction::CARDINALS {
            let expected = expected_value(&utilities, candidate);
            if expected > choice.optimum {
                choice.optimum = expected;
            }
            if expected > choice.legal_best && legal.contains(&candidate) {
                choice.legal_best = expected;
                choice.action = candidate;
            }
        }
        choice
    }

    /// Relax utilities with Bellman sweeps until every delta keeps falling
    /// under the convergence epsilon or the sweep cap is reached.
    ///
    /// Each sweep freezes the map, recomputes every open cell from the frozen
    /// copy, and writes results into the live map. A settled cell only ends
    /// the loop once its full sweep has finished, and never on the first
    /// sweep. Returns the frozen copy of the final sweep, whose utilities the
    /// move choice is read from, together with sweep statistics.
    pub fn converge(&mut self, legal: &[Direction], config: &MdpConfig) -> (ValueMap, SweepSummary) {
        let mut sweeps: u32 = 0;
        let mut keep_sweeping = true;
        let mut frozen = self.clone();
        while keep_sweeping && sweeps < config.max_sweeps {
            sweeps += 1;
            frozen = self.clone();
            let snapshot = &frozen;
            let updates: Vec<(Cell, f64, bool)> = snapshot
                .cells
                .par_iter()
                .filter(|(_, value)| value.reward > snapshot.wall_sentinel)
                .map(|(&cell, value)| {
                    let choice = snapshot.appraise(cell, legal);
                    let utility = value.reward + config.discount * choice.optimum;
                    let delta = (utility - value.utility).abs();
                    let settled = delta < config.convergence_epsilon && delta > 0.0 && sweeps > 1;
                    (cell, utility, settled)
                })
                .collect();
            for (cell, utility, settled) in updates {
                if settled {
                    keep_sweeping = false;
                }
                if let Some(value) = self.cells.get_mut(&cell) {
                    value.utility = utility;
                }
            }
        }
        let summary = SweepSummary {
            sweeps,
            settled_early: !keep_sweeping,
        };
        debug!(
            sweeps = summary.sweeps,
            settled = summary.settled_early,
            cells = self.cells.len(),
            "value sweeps finished"
        );
        (frozen, summary)
    }

    /// Highest-utility open cell, handy when inspecting a converged field.
    #[must_use]
    pub fn peak_utility(&self) -> Option<(Cell, f64)> {
        self.cells
            .iter()
            .filter(|(_, value)| value.reward > self.wall_sentinel)
            .max_by_key(|(_, value)| OrderedFloat(value.utility))
            .map(|(&cell, value)| (cell, value.utility))
    }
}

/// Expected utility of submitting `candidate`: the direct weight on its
/// destination plus the lateral weight on each perpendicular destination.
/// The opposite direction carries no mass.
fn expected_value(utilities: &[f64; 4], candidate: Direction) -> f64 {
    let opposite = candidate.opposite();
    let mut total = 0.0;
    for (direction, utility) in Direction::CARDINALS.into_iter().zip(utilities) {
        if direction == opposite {
            continue;
        }
        let weight = if direction == candidate {
            DIRECT_MOVE_CHANCE
        } else {
            LATERAL_DRIFT_CHANCE
        };
        total += weight * utility;
    }
    total
}

/// Outcome of appraising the four cardinal moves from one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveChoice {
    /// Best legal move, or North when nothing beats the legal seed.
    pub action: Direction,
    /// Best expected utility over all four directions, legal or not.
    pub optimum: f64,
    /// Best expected utility among the legal directions.
    pub legal_best: f64,
}

/// Statistics from one value-iteration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Sweeps executed before the loop stopped.
    pub sweeps: u32,
    /// Whether a settled cell ended the loop before the cap.
    pub settled_early: bool,
}

/// Maze agent that plans every move with value iteration over a fresh
/// reward map.
#[derive(Debug, Clone, Default)]
pub struct MdpAgent {
    config: MdpConfig,
}

impl MdpAgent {
    /// Build an agent after validating `config`.
    pub fn new(config: MdpConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration the agent plans with.
    #[must_use]
    pub fn config(&self) -> &MdpConfig {
        &self.config
    }

    /// Run one planning cycle and return the chosen move without committing
    /// it. Deterministic for a given world state.
    pub fn plan(&self, world: &dyn GameWorld) -> Result<Direction, PlanError> {
        let mut legal = world.legal_actions();
        legal.retain(|direction| *direction != Direction::Stop);
        if legal.is_empty() {
            return Err(PlanError::NoLegalActions);
        }
        let origin = world.agent_cell();
        let tier = SizeTier::from_bounds(world.bounds());
        let mut values = ValueMap::seed(world.bounds(), world.walls(), &self.config);
        values.annotate(world, tier, &self.config);
        let (converged, summary) = values.converge(&legal, &self.config);
        let choice = converged.appraise(origin, &legal);
        debug!(
            sweeps = summary.sweeps,
            settled = summary.settled_early,
            action = %choice.action,
            optimum = choice.optimum,
            legal_best = choice.legal_best,
            "planned move"
        );
        Ok(choice.action)
    }
}

impl Agent for MdpAgent {
    fn kind(&self) -> &'static str {
        "mdp"
    }

    fn act(&mut self, world: &mut dyn GameWorld) -> Result<Direction, PlanError> {
        let action = self.plan(&*world)?;
        let mut legal = world.legal_actions();
        legal.retain(|direction| *direction != Direction::Stop);
        Ok(world.commit(action, &legal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazebots_core::MazeSnapshot;

    fn open_map(width: i32, height: i32, config: &MdpConfig) -> ValueMap {
        let bounds = Bounds::new(Cell::new(0, 0), Cell::new(width - 1, height - 1));
        ValueMap::seed(bounds, &HashSet::new(), config)
    }

    fn set_utility(map: &mut ValueMap, cell: Cell, utility: f64) {
        map.cells.get_mut(&cell).expect("cell in map").utility = utility;
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn default_config_validates() {
        assert_eq!(MdpConfig::default().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_broken_knobs() {
        let broken = [
            MdpConfig {
                discount: 0.0,
                ..MdpConfig::default()
            },
            MdpConfig {
                discount: 1.5,
                ..MdpConfig::default()
            },
            MdpConfig {
                convergence_epsilon: 0.0,
                ..MdpConfig::default()
            },
            MdpConfig {
                max_sweeps: 0,
                ..MdpConfig::default()
            },
            MdpConfig {
                wall_reward: 0.0,
                ..MdpConfig::default()
            },
            MdpConfig {
                ghost_halo_penalty: -2000.0,
                ..MdpConfig::default()
            },
        ];
        for config in broken {
            assert!(config.validate().is_err(), "{config:?} should not validate");
        }
    }

    #[test]
    fn seed_covers_the_whole_rectangle() {
        let config = MdpConfig::default();
        let bounds = Bounds::new(Cell::new(0, 0), Cell::new(4, 3));
        let walls = HashSet::from([Cell::new(2, 1), Cell::new(2, 2)]);
        let map = ValueMap::seed(bounds, &walls, &config);

        assert_eq!(map.len(), 20);
        let wall = map.get(Cell::new(2, 1)).expect("wall cell");
        assert_eq!(wall.reward, config.wall_reward);
        assert_eq!(wall.utility, 0.0);
        let open = map.get(Cell::new(0, 0)).expect("open cell");
        assert_eq!(open.reward, config.living_cost);
        assert_eq!(open.utility, 0.0);
        assert!(map.is_wall(Cell::new(2, 2)));
        assert!(!map.is_wall(Cell::new(0, 3)));
    }

    #[test]
    fn small_tier_uses_flat_rewards() {
        let config = MdpConfig::default();
        let maze = MazeSnapshot::from_layout(
            "
%%%%%%%%
%P .  o%
%    G %
%%%%%%%%",
        )
        .expect("layout");
        let tier = SizeTier::from_bounds(maze.bounds());
        assert_eq!(tier, SizeTier::Small);

        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, tier, &config);

        let food = map.get(Cell::new(3, 2)).expect("food cell");
        assert_eq!(food.reward, config.small_food_reward);
        let capsule = map.get(Cell::new(6, 2)).expect("capsule cell");
        assert_eq!(capsule.reward, config.capsule_reward);
        // Small mazes treat every ghost the same, whatever its countdown.
        let ghost = map.get(Cell::new(5, 1)).expect("ghost cell");
        assert_eq!(ghost.reward, config.small_ghost_penalty);
    }

    #[test]
    fn large_tier_scales_food_by_column() {
        let config = MdpConfig::default();
        let maze = MazeSnapshot::from_layout(
            "
%%%%%%%%%%%%
%P .      .%
%%%%%%%%%%%%",
        )
        .expect("layout");
        let tier = SizeTier::from_bounds(maze.bounds());
        assert_eq!(tier, SizeTier::Large);

        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, tier, &config);

        let near = map.get(Cell::new(3, 1)).expect("near food");
        assert!(approx(near.reward, 20.0));
        let far = map.get(Cell::new(10, 1)).expect("far food");
        assert!(approx(far.reward, 55.0));
    }

    #[test]
    fn dangerous_ghost_branches_on_distance() {
        let config = MdpConfig::default();
        // Agent far left, one ghost within the proximity radius and one beyond it.
        let maze = MazeSnapshot::from_layout(
            "
%%%%%%%%%%%%%%%%
%P  G          %
%              %
%            G %
%%%%%%%%%%%%%%%%",
        )
        .expect("layout");
        let tier = SizeTier::from_bounds(maze.bounds());
        assert_eq!(tier, SizeTier::Large);

        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, tier, &config);

        // Close ghost at (4, 3): distance 3 from the agent at (1, 3).
        let close = map.get(Cell::new(4, 3)).expect("close ghost");
        assert_eq!(close.reward, config.close_ghost_penalty);
        for direction in Direction::CARDINALS {
            let neighbour = Cell::new(4, 3).step(direction);
            if let Some(value) = map.get(neighbour) {
                if !map.is_wall(neighbour) {
                    assert_eq!(value.reward, config.ghost_halo_penalty);
                }
            }
        }
        // Far ghost at (13, 1): distance 14, no halo around it.
        let far = map.get(Cell::new(13, 1)).expect("far ghost");
        assert_eq!(far.reward, config.far_ghost_penalty);
        let beside_far = map.get(Cell::new(12, 1)).expect("cell beside far ghost");
        assert_eq!(beside_far.reward, config.living_cost);
    }

    #[test]
    fn edible_ghost_turns_into_reward() {
        let config = MdpConfig::default();
        let mut maze = MazeSnapshot::from_layout(
            "
%%%%%%%%%%%%
%P   G     %
%          %
%%%%%%%%%%%%",
        )
        .expect("layout");
        maze.ghosts_mut()[0].danger_ticks = config.edible_threshold - 1;

        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, SizeTier::Large, &config);

        let ghost = map.get(Cell::new(5, 2)).expect("ghost cell");
        assert_eq!(ghost.reward, config.edible_ghost_reward);
        // No halo for an edible ghost.
        let beside = map.get(Cell::new(4, 2)).expect("cell beside ghost");
        assert_eq!(beside.reward, config.living_cost);
    }

    #[test]
    fn later_annotations_win_and_agent_cell_resets() {
        let config = MdpConfig::default();
        // The ghost stands on a food pellet; the agent stands on another.
        let parsed = MazeSnapshot::from_layout(
            "
%%%%%%%%%%%%
%P   G     %
%          %
%%%%%%%%%%%%",
        )
        .expect("layout");
        let ghost_cell = Cell::new(5, 2);
        let agent_cell = Cell::new(1, 2);
        let mut food = parsed.food().clone();
        food.insert(ghost_cell);
        food.insert(agent_cell);
        let maze = MazeSnapshot::new(
            parsed.bounds(),
            parsed.walls().clone(),
            food,
            parsed.capsules().clone(),
            parsed.ghosts().to_vec(),
            parsed.agent_cell(),
        );

        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, SizeTier::Large, &config);

        let ghost = map.get(ghost_cell).expect("ghost cell");
        assert_eq!(ghost.reward, config.close_ghost_penalty);
        let agent = map.get(agent_cell).expect("agent cell");
        assert_eq!(agent.reward, config.living_cost);
    }

    #[test]
    fn annotation_never_touches_walls_or_outside_cells() {
        let config = MdpConfig::default();
        // Ghost in the corner pocket: halo writes aim at walls and stay out.
        let maze = MazeSnapshot::from_layout(
            "
%%%%%%%%%%%%
%G         %
%   P      %
%%%%%%%%%%%%",
        )
        .expect("layout");
        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        let cells_before = map.len();
        map.annotate(&maze, SizeTier::Large, &config);

        assert_eq!(map.len(), cells_before);
        let west_wall = map.get(Cell::new(0, 2)).expect("wall west of ghost");
        assert_eq!(west_wall.reward, config.wall_reward);
        let north_wall = map.get(Cell::new(1, 3)).expect("wall north of ghost");
        assert_eq!(north_wall.reward, config.wall_reward);

        // Without border walls the halo writes aim outside the rectangle and
        // must not widen the map.
        let open = MazeSnapshot::from_layout("G  P").expect("layout");
        let mut map = ValueMap::seed(open.bounds(), open.walls(), &config);
        map.annotate(&open, SizeTier::Large, &config);
        assert_eq!(map.len(), 4);
        let beside = map.get(Cell::new(1, 0)).expect("cell east of ghost");
        assert_eq!(beside.reward, config.ghost_halo_penalty);
    }

    #[test]
    fn blocked_moves_fall_back_to_the_origin_utility() {
        let config = MdpConfig::default();
        let bounds = Bounds::new(Cell::new(0, 0), Cell::new(2, 2));
        let walls = HashSet::from([Cell::new(1, 2)]);
        let mut map = ValueMap::seed(bounds, &walls, &config);
        let origin = Cell::new(1, 1);
        set_utility(&mut map, origin, 7.0);
        set_utility(&mut map, Cell::new(1, 0), 1.0);
        set_utility(&mut map, Cell::new(2, 1), 2.0);
        set_utility(&mut map, Cell::new(0, 1), 3.0);

        let utilities = map.move_utilities(origin);
        // North hits a wall and collapses to the origin.
        assert_eq!(utilities, [7.0, 1.0, 2.0, 3.0]);

        // From the corner, south and west leave the map and collapse too.
        let corner = Cell::new(0, 0);
        set_utility(&mut map, corner, 4.0);
        let utilities = map.move_utilities(corner);
        assert_eq!(utilities[1], 4.0);
        assert_eq!(utilities[3], 4.0);
    }

    #[test]
    fn uniform_fields_conserve_expected_value() {
        let utilities = [4.0, 4.0, 4.0, 4.0];
        for candidate in Direction::CARDINALS {
            assert!(approx(expected_value(&utilities, candidate), 4.0));
        }
    }

    #[test]
    fn expected_value_ignores_the_opposite_direction() {
        // North carries 0.8, East and West 0.1 each, South nothing.
        let utilities = [10.0, -1000.0, 2.0, 4.0];
        let expected = expected_value(&utilities, Direction::North);
        assert!(approx(expected, 0.8 * 10.0 + 0.1 * 2.0 + 0.1 * 4.0));
    }

    #[test]
    fn appraise_defaults_north_when_nothing_beats_zero() {
        let config = MdpConfig::default();
        let mut map = open_map(3, 3, &config);
        for cell in Bounds::new(Cell::new(0, 0), Cell::new(2, 2)).cells() {
            set_utility(&mut map, cell, -1.0);
        }
        let choice = map.appraise(Cell::new(1, 1), &Direction::CARDINALS);
        assert_eq!(choice.action, Direction::North);
        assert!(approx(choice.optimum, -1.0));
        assert_eq!(choice.legal_best, 0.0);
    }

    #[test]
    fn appraise_breaks_ties_toward_earlier_directions() {
        let config = MdpConfig::default();
        let mut map = open_map(3, 3, &config);
        for cell in Bounds::new(Cell::new(0, 0), Cell::new(2, 2)).cells() {
            set_utility(&mut map, cell, 5.0);
        }
        let centre = Cell::new(1, 1);

        let all = map.appraise(centre, &Direction::CARDINALS);
        assert_eq!(all.action, Direction::North);
        assert!(approx(all.optimum, 5.0));
        assert!(approx(all.legal_best, 5.0));

        let southeast = map.appraise(centre, &[Direction::South, Direction::East]);
        assert_eq!(southeast.action, Direction::South);

        let eastwest = map.appraise(centre, &[Direction::East, Direction::West]);
        assert_eq!(eastwest.action, Direction::East);
    }

    #[test]
    fn uniform_field_settles_on_the_second_sweep() {
        let config = MdpConfig::default();
        let mut map = open_map(3, 3, &config);
        let (frozen, summary) = map.converge(&Direction::CARDINALS, &config);

        assert_eq!(summary.sweeps, 2);
        assert!(summary.settled_early);
        // The frozen copy lags the live map by exactly one sweep.
        let first = config.living_cost;
        let second = config.living_cost + config.discount * first;
        for cell in Bounds::new(Cell::new(0, 0), Cell::new(2, 2)).cells() {
            assert!(approx(frozen.utility(cell), first));
            assert!(approx(map.utility(cell), second));
        }
    }

    #[test]
    fn zero_reward_fields_run_the_full_sweep_cap() {
        let config = MdpConfig {
            living_cost: 0.0,
            ..MdpConfig::default()
        };
        let mut map = open_map(3, 3, &config);
        let (_, summary) = map.converge(&Direction::CARDINALS, &config);

        // Deltas of exactly zero never count as settled.
        assert_eq!(summary.sweeps, config.max_sweeps);
        assert!(!summary.settled_early);
    }

    #[test]
    fn walls_keep_sentinel_reward_and_zero_utility() {
        let config = MdpConfig::default();
        let maze = MazeSnapshot::from_layout(
            "
%%%%%%%%%%%%
%P .  %   .%
%  %% %  G %
%          %
%%%%%%%%%%%%",
        )
        .expect("layout");
        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, SizeTier::from_bounds(maze.bounds()), &config);
        let (frozen, _) = map.converge(&Direction::CARDINALS, &config);

        for &wall in maze.walls() {
            for view in [&map, &frozen] {
                let value = view.get(wall).expect("wall cell");
                assert_eq!(value.reward, config.wall_reward);
                assert_eq!(value.utility, 0.0);
            }
        }
    }

    #[test]
    fn peak_utility_lands_on_the_first_food_run() {
        let config = MdpConfig::default();
        let maze = MazeSnapshot::from_layout(
            "
%%%%%%%%
%P    .%
%%%%%%%%",
        )
        .expect("layout");
        let mut map = ValueMap::seed(maze.bounds(), maze.walls(), &config);
        map.annotate(&maze, SizeTier::from_bounds(maze.bounds()), &config);
        map.converge(&[Direction::East, Direction::West], &config);

        let (cell, utility) = map.peak_utility().expect("non-empty map");
        assert_eq!(cell, Cell::new(6, 1));
        assert!(utility > 0.0);
    }

    #[test]
    fn plan_fails_without_legal_moves() {
        let maze = MazeSnapshot::from_layout(
            "
%%%
%P%
%%%",
        )
        .expect("layout");
        let agent = MdpAgent::default();
        assert_eq!(agent.plan(&maze), Err(PlanError::NoLegalActions));
    }
}
