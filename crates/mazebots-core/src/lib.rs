//! Core grid types and the world surface shared across the MazeBots workspace.
//!
//! A maze is a bounded rectangle of integer cells holding walls, food pellets,
//! capsules, one agent, and a handful of roaming ghosts. Agents never talk to
//! a concrete game engine; they see the world through [`GameWorld`], and hosts
//! hand them percepts via [`MazeSnapshot`] or their own implementation.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Probability that the host applies a committed move as-is.
pub const DIRECT_MOVE_CHANCE: f64 = 0.8;
/// Probability that actuation noise deflects a committed move into one
/// particular lateral direction (the remaining mass goes to the other one).
pub const LATERAL_DRIFT_CHANCE: f64 = 0.1;

/// A move an agent can submit to the host.
///
/// `Stop` is the no-op the host may offer alongside the cardinal moves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Stop,
}

impl Direction {
    /// The four cardinal moves in the fixed enumeration order every planner
    /// loop uses. Earlier entries win ties.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The direction pointing the opposite way. `Stop` is its own opposite.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Stop => Self::Stop,
        }
    }

    /// The two perpendicular directions actuation noise can deflect a move
    /// into. `Stop` never drifts.
    #[must_use]
    pub const fn laterals(self) -> [Direction; 2] {
        match self {
            Self::North | Self::South => [Self::East, Self::West],
            Self::East | Self::West => [Self::North, Self::South],
            Self::Stop => [Self::Stop, Self::Stop],
        }
    }

    /// Grid offset of a single step in this direction. North is +y, East +x.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::Stop => (0, 0),
        }
    }

    /// Printable name, matching the `Display` output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::South => "South",
            Self::East => "East",
            Self::West => "West",
            Self::Stop => "Stop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer maze coordinate. Value equality; the key for every cell map.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// Construct a new cell.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one step away in `direction`. Stepping with `Stop` returns
    /// the cell itself.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Manhattan distance to `other`.
    #[must_use]
    pub const fn manhattan_distance(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive bounding rectangle of a maze.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min: Cell,
    pub max: Cell,
}

impl Bounds {
    /// Construct from the two extreme corners.
    #[must_use]
    pub const fn new(min: Cell, max: Cell) -> Self {
        Self { min, max }
    }

    /// Bounding rectangle spanned by the four boundary cells a host reports.
    #[must_use]
    pub fn from_corners(corners: [Cell; 4]) -> Self {
        let mut min = corners[0];
        let mut max = corners[0];
        for corner in corners {
            min.x = min.x.min(corner.x);
            min.y = min.y.min(corner.y);
            max.x = max.x.max(corner.x);
            max.y = max.y.max(corner.y);
        }
        Self { min, max }
    }

    /// Whether `cell` lies inside the rectangle.
    #[must_use]
    pub const fn contains(self, cell: Cell) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Number of columns covered, including both extremes.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.max.x.abs_diff(self.min.x) + 1
    }

    /// Number of rows covered, including both extremes.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.max.y.abs_diff(self.min.y) + 1
    }

    /// Iterate every cell of the rectangle in row-major order.
    pub fn cells(self) -> impl Iterator<Item = Cell> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| Cell::new(x, y)))
    }
}

/// Maze size classification steering reward shaping and ghost handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SizeTier {
    Small,
    Large,
}

impl SizeTier {
    /// A maze whose top corner stays below this limit on both axes is small.
    pub const SMALL_LIMIT: i32 = 10;

    /// Classify a maze from its bounding rectangle.
    #[must_use]
    pub const fn from_bounds(bounds: Bounds) -> Self {
        if bounds.max.x < Self::SMALL_LIMIT && bounds.max.y < Self::SMALL_LIMIT {
            Self::Small
        } else {
            Self::Large
        }
    }
}

/// One observed ghost: a continuous position plus the countdown of ticks it
/// remains dangerous. Once the countdown runs below the edible threshold the
/// ghost is safe to approach.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GhostSighting {
    /// Continuous position; ghosts sit between cells mid-transit.
    pub position: (f64, f64),
    /// Remaining dangerous ticks.
    pub danger_ticks: u32,
}

impl GhostSighting {
    /// Danger window assigned to ghosts parsed from a layout.
    pub const DEFAULT_DANGER_TICKS: u32 = 40;

    /// Construct a new sighting.
    #[must_use]
    pub const fn new(position: (f64, f64), danger_ticks: u32) -> Self {
        Self {
            position,
            danger_ticks,
        }
    }

    /// The nearest integer cell, rounding half away from zero on both axes.
    #[must_use]
    pub fn cell(self) -> Cell {
        Cell::new(self.position.0.round() as i32, self.position.1.round() as i32)
    }
}

/// Surface a host simulation exposes to agents.
///
/// Observation calls are cheap and may be issued any number of times per
/// decision; `commit` is the side-effecting terminal call of a decision cycle
/// and applies the host's actuation noise to the submitted move.
pub trait GameWorld {
    /// Moves currently available to the agent, possibly including [`Direction::Stop`].
    fn legal_actions(&self) -> Vec<Direction>;

    /// The agent's current cell.
    fn agent_cell(&self) -> Cell;

    /// Cells holding food pellets.
    fn food(&self) -> &HashSet<Cell>;

    /// Cells holding capsules.
    fn capsules(&self) -> &HashSet<Cell>;

    /// Impassable wall cells.
    fn walls(&self) -> &HashSet<Cell>;

    /// Bounding rectangle of the maze.
    fn bounds(&self) -> Bounds;

    /// Every ghost currently visible, with danger countdowns.
    fn ghosts(&self) -> &[GhostSighting];

    /// Submit `action` for execution given the legal set the agent derived.
    /// Returns the move the host actually applied after noise.
    fn commit(&mut self, action: Direction, legal: &[Direction]) -> Direction;
}

/// Errors raised while parsing a text maze layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout text contains no rows.
    #[error("layout contains no rows")]
    Empty,
    /// No agent start cell was placed.
    #[error("layout does not place an agent start cell")]
    MissingAgent,
    /// More than one agent start cell was placed.
    #[error("layout places more than one agent start cell")]
    DuplicateAgent,
    /// A character outside the layout alphabet was found.
    #[error("unrecognised glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        glyph: char,
        row: usize,
        column: usize,
    },
}

/// Owned percept bundle implementing [`GameWorld`].
///
/// This is the reference host surface: tests and the demo shell build one per
/// episode, and embedding code can construct one from whatever engine state it
/// tracks. `commit` applies the standard 0.8/0.1/0.1 actuation noise, moves
/// the agent, and consumes any food or capsule at the destination. Ghosts are
/// percepts here and do not move on their own.
#[derive(Debug, Clone)]
pub struct MazeSnapshot {
    bounds: Bounds,
    walls: HashSet<Cell>,
    food: HashSet<Cell>,
    capsules: HashSet<Cell>,
    ghosts: Vec<GhostSighting>,
    agent: Cell,
    rng: SmallRng,
}

impl MazeSnapshot {
    /// Build a snapshot from raw percepts. The actuation RNG is seeded from
    /// entropy; use [`MazeSnapshot::with_seed`] for reproducible runs.
    #[must_use]
    pub fn new(
        bounds: Bounds,
        walls: HashSet<Cell>,
        food: HashSet<Cell>,
        capsules: HashSet<Cell>,
        ghosts: Vec<GhostSighting>,
        agent: Cell,
    ) -> Self {
        let seed: u64 = rand::random();
        Self {
            bounds,
            walls,
            food,
            capsules,
            ghosts,
            agent,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Parse a text layout into a snapshot.
    ///
    /// Alphabet: `%` wall, `.` food, `o` capsule, `P` agent start, `G` ghost,
    /// space open floor. Rows read top to bottom; y is flipped so that North
    /// points up. Ghosts start with [`GhostSighting::DEFAULT_DANGER_TICKS`].
    pub fn from_layout(text: &str) -> Result<Self, LayoutError> {
        let mut rows: Vec<&str> = text.lines().map(str::trim_end).collect();
        while rows.first().is_some_and(|row| row.is_empty()) {
            rows.remove(0);
        }
        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }

        let height = rows.len();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut walls = HashSet::new();
        let mut food = HashSet::new();
        let mut capsules = HashSet::new();
        let mut ghosts = Vec::new();
        let mut agent: Option<Cell> = None;

        for (row_index, row) in rows.iter().enumerate() {
            let y = (height - 1 - row_index) as i32;
            for (column, glyph) in row.chars().enumerate() {
                let cell = Cell::new(column as i32, y);
                match glyph {
                    '%' => {
                        walls.insert(cell);
                    }
                    '.' => {
                        food.insert(cell);
                    }
                    'o' => {
                        capsules.insert(cell);
                    }
                    'G' => ghosts.push(GhostSighting::new(
                        (f64::from(cell.x), f64::from(cell.y)),
                        GhostSighting::DEFAULT_DANGER_TICKS,
                    )),
                    'P' => {
                        if agent.replace(cell).is_some() {
                            return Err(LayoutError::DuplicateAgent);
                        }
                    }
                    ' ' => {}
                    _ => {
                        return Err(LayoutError::UnknownGlyph {
                            glyph,
                            row: row_index,
                            column,
                        });
                    }
                }
            }
        }

        let agent = agent.ok_or(LayoutError::MissingAgent)?;
        let bounds = Bounds::new(Cell::new(0, 0), Cell::new(width as i32 - 1, height as i32 - 1));
        Ok(Self::new(bounds, walls, food, capsules, ghosts, agent))
    }

    /// Reseed the actuation RNG for reproducible noise.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Mutable access to the ghost list, for hosts that move ghosts between
    /// decisions or tests that adjust danger countdowns.
    #[must_use]
    pub fn ghosts_mut(&mut self) -> &mut Vec<GhostSighting> {
        &mut self.ghosts
    }

    /// Apply actuation noise to a submitted move.
    fn drift(&mut self, action: Direction) -> Direction {
        if action == Direction::Stop {
            return Direction::Stop;
        }
        let roll: f64 = self.rng.random();
        let [left, right] = action.laterals();
        if roll < DIRECT_MOVE_CHANCE {
            action
        } else if roll < DIRECT_MOVE_CHANCE + LATERAL_DRIFT_CHANCE {
            left
        } else {
            right
        }
    }
}

impl GameWorld for MazeSnapshot {
    fn legal_actions(&self) -> Vec<Direction> {
        let mut actions: Vec<Direction> = Direction::CARDINALS
            .into_iter()
            .filter(|direction| {
                let destination = self.agent.step(*direction);
                self.bounds.contains(destination) && !self.walls.contains(&destination)
            })
            .collect();
        actions.push(Direction::Stop);
        actions
    }

    fn agent_cell(&self) -> Cell {
        self.agent
    }

    fn food(&self) -> &HashSet<Cell> {
        &self.food
    }

    fn capsules(&self) -> &HashSet<Cell> {
        &self.capsules
    }

    fn walls(&self) -> &HashSet<Cell> {
        &self.walls
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn ghosts(&self) -> &[GhostSighting] {
        &self.ghosts
    }

    fn commit(&mut self, action: Direction, legal: &[Direction]) -> Direction {
        let drifted = self.drift(action);
        // A drift into a blocked direction bumps the agent into the wall.
        let applied = if drifted == Direction::Stop || legal.contains(&drifted) {
            drifted
        } else {
            Direction::Stop
        };
        self.agent = self.agent.step(applied);
        debug_assert!(!self.walls.contains(&self.agent));
        self.food.remove(&self.agent);
        self.capsules.remove(&self.agent);
        applied
    }
}
