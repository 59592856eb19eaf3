#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Grid Pursuit engine.
//!
//! This crate defines the message surface that connects the host loop, the
//! authoritative world, and pure systems. Systems consume event streams and
//! immutable snapshots and respond exclusively with new [`Command`] batches;
//! the world executes those commands via its `apply` entry point and then
//! broadcasts [`Event`] values for systems to react to deterministically.

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests that the player advance one step in the given direction.
    MovePlayer {
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Requests that an agent commit its planned move for the current turn.
    StepAgent {
        /// Identifier of the agent attempting to move.
        agent: AgentId,
        /// Planner-resolved outcome for the agent this turn.
        decision: MoveDecision,
    },
    /// Replaces the active role partition with a freshly clustered one.
    AssignRoles {
        /// Partition of every live agent into the three behavioral roles.
        assignment: RoleAssignment,
    },
    /// Requests that a helper convert an empty cell into mud.
    CastMud {
        /// Identifier of the helper performing the cast.
        agent: AgentId,
        /// Cell targeted by the cast.
        cell: Cell,
    },
    /// Requests that a helper soften terrain (water to mud, mud to empty).
    DowngradeTerrain {
        /// Identifier of the helper performing the downgrade.
        agent: AgentId,
        /// Cell targeted by the downgrade.
        cell: Cell,
    },
    /// Requests that a blocker erect a wall on the provided cell.
    RaiseWall {
        /// Identifier of the blocker raising the wall.
        agent: AgentId,
        /// Cell targeted by the wall.
        cell: Cell,
    },
    /// Closes the current simulation turn.
    EndTurn,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the player moved between two cells.
    PlayerMoved {
        /// Cell the player occupied before moving.
        from: Cell,
        /// Cell the player occupies after the move.
        to: Cell,
    },
    /// Reports that terrain imposed a slow-down on the player.
    PlayerSlowed {
        /// Number of turns the player must skip.
        turns: u32,
    },
    /// Confirms that an agent committed a move between two cells.
    AgentAdvanced {
        /// Identifier of the agent that advanced.
        agent: AgentId,
        /// Cell the agent occupied before moving.
        from: Cell,
        /// Cell the agent occupies after the move.
        to: Cell,
    },
    /// Reports that terrain or a skill imposed a slow-down on an agent.
    AgentSlowed {
        /// Identifier of the slowed agent.
        agent: AgentId,
        /// Number of turns the agent must skip.
        turns: u32,
    },
    /// Reports that an agent closed to within one cell of the player.
    AgentCaught {
        /// Identifier of the agent that reached the player.
        agent: AgentId,
        /// Cell the agent occupied when it was caught.
        cell: Cell,
    },
    /// Confirms that a caught agent was relocated to a fresh cell.
    AgentRespawned {
        /// Identifier of the relocated agent.
        agent: AgentId,
        /// Cell the agent occupied before relocation.
        from: Cell,
        /// Cell the agent occupies after relocation.
        to: Cell,
    },
    /// Announces that a new role partition became active.
    RolesAssigned,
    /// Reports that a proposed role partition did not cover the agent set.
    RolesRejected,
    /// Confirms that a cell changed terrain category.
    TerrainChanged {
        /// Cell whose terrain changed.
        cell: Cell,
        /// Terrain category before the change.
        from: Terrain,
        /// Terrain category after the change.
        to: Terrain,
    },
    /// Confirms that a blocker wall was committed to the grid.
    WallRaised {
        /// Identifier of the blocker that raised the wall.
        agent: AgentId,
        /// Cell now occupied by the wall.
        cell: Cell,
    },
    /// Reports that a wall request was rejected and left the grid untouched.
    WallRejected {
        /// Identifier of the blocker whose request failed.
        agent: AgentId,
        /// Cell proposed for the wall.
        cell: Cell,
        /// Specific reason the wall was refused.
        reason: WallError,
    },
    /// Announces that the simulation turn counter advanced.
    TurnEnded {
        /// Zero-based index of the turn that just completed.
        turn: u64,
    },
}

/// Reasons a wall request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallError {
    /// The proposed cell lies outside the grid.
    OutOfBounds,
    /// The proposed cell already carries a wall.
    AlreadyWall,
    /// The proposed cell is occupied by the player or an agent.
    Occupied,
    /// Committing the wall would cut an agent off from the player.
    DisconnectsRegion,
}

/// Cardinal movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Column and row deltas applied by one step in this direction.
    #[must_use]
    pub const fn deltas(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Unique identifier assigned to a pursuing agent.
///
/// Identity is deliberately separate from position: an agent keeps its id
/// across moves and respawns, and position is a derived, mutable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    column: u32,
    row: u32,
}

impl Cell {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: Cell) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Translates the cell by the provided deltas.
    ///
    /// Returns `None` when the translation would leave the non-negative
    /// coordinate space; upper bounds are the grid's concern.
    #[must_use]
    pub fn offset_by(self, column_delta: i64, row_delta: i64) -> Option<Cell> {
        let column = i64::from(self.column).checked_add(column_delta)?;
        let row = i64::from(self.row).checked_add(row_delta)?;
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        Some(Cell::new(column, row))
    }
}

/// Terrain category occupying a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Open ground traversed at unit cost.
    Empty,
    /// Soft ground that slows whoever enters it by one turn.
    Mud,
    /// Deep ground that slows whoever enters it by two turns.
    Water,
    /// Impassable obstruction.
    Wall,
}

impl Terrain {
    /// Traversal cost of entering a cell with this terrain.
    ///
    /// Walls are impassable and carry no finite cost.
    #[must_use]
    pub const fn cost(self) -> Option<u32> {
        match self {
            Self::Empty => Some(1),
            Self::Mud => Some(2),
            Self::Water => Some(3),
            Self::Wall => None,
        }
    }

    /// Reports whether the terrain can be entered at all.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        self.cost().is_some()
    }

    /// Number of turns an occupant skips after entering this terrain.
    #[must_use]
    pub const fn slow_turns(self) -> u32 {
        match self {
            Self::Mud => 1,
            Self::Water => 2,
            Self::Empty | Self::Wall => 0,
        }
    }
}

/// Dense square terrain map indexed by [`Cell`].
///
/// The grid's shape is immutable after construction; only cell contents
/// change, and exclusively through the world's command execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    size: u32,
    cells: Vec<Terrain>,
}

impl TerrainGrid {
    /// Creates a grid of the provided side length filled with one terrain.
    #[must_use]
    pub fn filled(size: u32, terrain: Terrain) -> Self {
        let capacity = usize::try_from(u64::from(size) * u64::from(size)).unwrap_or(0);
        Self {
            size,
            cells: vec![terrain; capacity],
        }
    }

    /// Creates a grid from row-major cell contents.
    ///
    /// Returns `None` when the slice length does not match `size * size`.
    #[must_use]
    pub fn from_cells(size: u32, cells: Vec<Terrain>) -> Option<Self> {
        let expected = usize::try_from(u64::from(size) * u64::from(size)).ok()?;
        if cells.len() != expected {
            return None;
        }
        Some(Self { size, cells })
    }

    /// Side length of the square grid measured in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub const fn in_bounds(&self, cell: Cell) -> bool {
        cell.column() < self.size && cell.row() < self.size
    }

    /// Terrain category stored at the provided cell, if in bounds.
    #[must_use]
    pub fn terrain(&self, cell: Cell) -> Option<Terrain> {
        self.index(cell).and_then(|index| self.cells.get(index).copied())
    }

    /// Replaces the terrain stored at the provided cell.
    ///
    /// Returns the previous terrain, or `None` when the cell is out of
    /// bounds and the grid is left untouched.
    pub fn set_terrain(&mut self, cell: Cell, terrain: Terrain) -> Option<Terrain> {
        let index = self.index(cell)?;
        let slot = self.cells.get_mut(index)?;
        let previous = *slot;
        *slot = terrain;
        Some(previous)
    }

    /// Traversal cost of entering the cell; `None` for walls or out of bounds.
    #[must_use]
    pub fn cost(&self, cell: Cell) -> Option<u32> {
        self.terrain(cell).and_then(Terrain::cost)
    }

    /// Reports whether the cell is in bounds and free of walls.
    #[must_use]
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.terrain(cell).is_some_and(Terrain::is_passable)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.size).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Behavioral class assigned to an agent via clustering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Pursues the player's current cell head-on.
    Chaser,
    /// Shadows the player at casting range and shapes terrain.
    Helper,
    /// Moves toward the predicted intercept cell and raises walls.
    Blocker,
}

impl Role {
    /// Roles in the fixed order the planner processes them.
    ///
    /// This order decides who wins a contested cell within a turn.
    pub const PROCESSING_ORDER: [Role; 3] = [Role::Chaser, Role::Helper, Role::Blocker];
}

/// Partition of the live agent set into the three behavioral roles.
///
/// Membership is recomputed by the clustering system; it is not a stable
/// identity, only a distance-rank-derived grouping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    chasers: Vec<AgentId>,
    helpers: Vec<AgentId>,
    blockers: Vec<AgentId>,
}

impl RoleAssignment {
    /// Creates a new assignment from per-role member lists.
    #[must_use]
    pub fn new(chasers: Vec<AgentId>, helpers: Vec<AgentId>, blockers: Vec<AgentId>) -> Self {
        Self {
            chasers,
            helpers,
            blockers,
        }
    }

    /// Members carrying the provided role, in stored order.
    #[must_use]
    pub fn members(&self, role: Role) -> &[AgentId] {
        match role {
            Role::Chaser => &self.chasers,
            Role::Helper => &self.helpers,
            Role::Blocker => &self.blockers,
        }
    }

    /// Role carried by the provided agent, if it appears in the partition.
    #[must_use]
    pub fn role_of(&self, agent: AgentId) -> Option<Role> {
        Role::PROCESSING_ORDER
            .into_iter()
            .find(|role| self.members(*role).contains(&agent))
    }

    /// Total number of agents across all three roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chasers.len() + self.helpers.len() + self.blockers.len()
    }

    /// Reports whether the assignment contains no agents at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates role/agent pairs in planner processing order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, AgentId)> + '_ {
        Role::PROCESSING_ORDER.into_iter().flat_map(move |role| {
            self.members(role)
                .iter()
                .copied()
                .map(move |agent| (role, agent))
        })
    }

    /// Reports whether the assignment covers every id exactly once.
    #[must_use]
    pub fn partitions(&self, agents: &[AgentId]) -> bool {
        if self.len() != agents.len() {
            return false;
        }
        let mut seen: Vec<AgentId> = self.iter().map(|(_, agent)| agent).collect();
        seen.sort_unstable();
        if seen.windows(2).any(|pair| pair[0] == pair[1]) {
            return false;
        }
        agents
            .iter()
            .all(|agent| seen.binary_search(agent).is_ok())
    }
}

/// Planner-resolved outcome for a single agent in a single turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveDecision {
    /// The agent keeps its current cell this turn.
    Stay,
    /// The agent commits to the provided cell this turn.
    MoveTo(Cell),
}

/// Smoothed recent displacement vector of the player.
///
/// Computed by the world from a bounded history of past positions and used
/// to predict where the player is heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tendency {
    dx: f32,
    dy: f32,
}

impl Tendency {
    /// Fallback tendency used while the history holds fewer than two entries.
    pub const DEFAULT: Tendency = Tendency { dx: 1.0, dy: 0.0 };

    /// Creates a tendency from per-turn column and row displacement.
    #[must_use]
    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    /// Average per-turn column displacement.
    #[must_use]
    pub const fn dx(&self) -> f32 {
        self.dx
    }

    /// Average per-turn row displacement.
    #[must_use]
    pub const fn dy(&self) -> f32 {
        self.dy
    }

    /// Dot product of the tendency with an integer cell offset.
    ///
    /// Non-negative values mean the offset points ahead of the player's
    /// motion, negative values behind it.
    #[must_use]
    pub fn dot(&self, column_delta: i64, row_delta: i64) -> f32 {
        self.dx * column_delta as f32 + self.dy * row_delta as f32
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Grid cell currently occupied by the agent.
    pub cell: Cell,
    /// Remaining turns the agent must skip before moving again.
    pub slow_turns: u32,
}

/// Read-only snapshot describing all agents in the pursuit.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot captured for the provided agent, if it exists.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of agents captured in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view contains no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AgentId, AgentSnapshot, AgentView, Cell, Role, RoleAssignment, Terrain, TerrainGrid,
        Tendency, WallError,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = Cell::new(1, 1);
        let destination = Cell::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn offset_by_rejects_negative_coordinates() {
        let cell = Cell::new(1, 0);
        assert_eq!(cell.offset_by(-1, 0), Some(Cell::new(0, 0)));
        assert_eq!(cell.offset_by(0, -1), None);
        assert_eq!(cell.offset_by(-2, 0), None);
    }

    #[test]
    fn terrain_costs_match_specification() {
        assert_eq!(Terrain::Empty.cost(), Some(1));
        assert_eq!(Terrain::Mud.cost(), Some(2));
        assert_eq!(Terrain::Water.cost(), Some(3));
        assert_eq!(Terrain::Wall.cost(), None);
        assert!(!Terrain::Wall.is_passable());
    }

    #[test]
    fn terrain_slow_turns_match_specification() {
        assert_eq!(Terrain::Empty.slow_turns(), 0);
        assert_eq!(Terrain::Mud.slow_turns(), 1);
        assert_eq!(Terrain::Water.slow_turns(), 2);
    }

    #[test]
    fn grid_reads_and_writes_round_trip() {
        let mut grid = TerrainGrid::filled(4, Terrain::Empty);
        let cell = Cell::new(2, 3);
        assert_eq!(grid.terrain(cell), Some(Terrain::Empty));
        assert_eq!(grid.set_terrain(cell, Terrain::Water), Some(Terrain::Empty));
        assert_eq!(grid.terrain(cell), Some(Terrain::Water));
        assert_eq!(grid.cost(cell), Some(3));
    }

    #[test]
    fn grid_rejects_out_of_bounds_access() {
        let mut grid = TerrainGrid::filled(4, Terrain::Empty);
        let outside = Cell::new(4, 0);
        assert!(!grid.in_bounds(outside));
        assert_eq!(grid.terrain(outside), None);
        assert_eq!(grid.set_terrain(outside, Terrain::Wall), None);
        assert!(!grid.is_passable(outside));
    }

    #[test]
    fn from_cells_requires_matching_length() {
        assert!(TerrainGrid::from_cells(2, vec![Terrain::Empty; 4]).is_some());
        assert!(TerrainGrid::from_cells(2, vec![Terrain::Empty; 3]).is_none());
    }

    #[test]
    fn role_assignment_partitions_agent_set() {
        let assignment = RoleAssignment::new(
            vec![AgentId::new(0), AgentId::new(2)],
            vec![AgentId::new(1)],
            vec![AgentId::new(3)],
        );
        let agents = [
            AgentId::new(0),
            AgentId::new(1),
            AgentId::new(2),
            AgentId::new(3),
        ];
        assert!(assignment.partitions(&agents));
        assert_eq!(assignment.role_of(AgentId::new(1)), Some(Role::Helper));
        assert_eq!(assignment.role_of(AgentId::new(9)), None);
    }

    #[test]
    fn role_assignment_detects_duplicates_and_omissions() {
        let duplicated = RoleAssignment::new(
            vec![AgentId::new(0)],
            vec![AgentId::new(0)],
            Vec::new(),
        );
        assert!(!duplicated.partitions(&[AgentId::new(0), AgentId::new(1)]));

        let short = RoleAssignment::new(vec![AgentId::new(0)], Vec::new(), Vec::new());
        assert!(!short.partitions(&[AgentId::new(0), AgentId::new(1)]));
    }

    #[test]
    fn role_assignment_iterates_in_processing_order() {
        let assignment = RoleAssignment::new(
            vec![AgentId::new(5)],
            vec![AgentId::new(1)],
            vec![AgentId::new(3)],
        );
        let order: Vec<_> = assignment.iter().collect();
        assert_eq!(
            order,
            vec![
                (Role::Chaser, AgentId::new(5)),
                (Role::Helper, AgentId::new(1)),
                (Role::Blocker, AgentId::new(3)),
            ]
        );
    }

    #[test]
    fn tendency_dot_separates_ahead_from_behind() {
        let tendency = Tendency::new(1.0, 0.0);
        assert!(tendency.dot(3, 1) > 0.0);
        assert!(tendency.dot(-2, 0) < 0.0);
        assert_eq!(Tendency::DEFAULT.dx(), 1.0);
        assert_eq!(Tendency::DEFAULT.dy(), 0.0);
    }

    #[test]
    fn agent_view_sorts_and_looks_up_by_id() {
        let view = AgentView::from_snapshots(vec![
            AgentSnapshot {
                id: AgentId::new(2),
                cell: Cell::new(1, 1),
                slow_turns: 0,
            },
            AgentSnapshot {
                id: AgentId::new(0),
                cell: Cell::new(3, 3),
                slow_turns: 1,
            },
        ]);
        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(
            view.get(AgentId::new(0)).map(|snapshot| snapshot.cell),
            Some(Cell::new(3, 3))
        );
        assert!(view.get(AgentId::new(7)).is_none());

        let snapshots = view.into_vec();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].id, AgentId::new(0));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_round_trips_through_bincode() {
        assert_round_trip(&Cell::new(12, 29));
    }

    #[test]
    fn terrain_round_trips_through_bincode() {
        assert_round_trip(&Terrain::Water);
    }

    #[test]
    fn agent_id_round_trips_through_bincode() {
        assert_round_trip(&AgentId::new(17));
    }

    #[test]
    fn role_assignment_round_trips_through_bincode() {
        let assignment = RoleAssignment::new(
            vec![AgentId::new(0)],
            vec![AgentId::new(1)],
            vec![AgentId::new(2)],
        );
        assert_round_trip(&assignment);
    }

    #[test]
    fn wall_error_round_trips_through_bincode() {
        assert_round_trip(&WallError::DisconnectsRegion);
    }
}
