#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative state for the grid pursuit.
//!
//! The world owns the terrain grid, the player, the agent roster, and the
//! active role partition. All mutation flows through [`apply`], which
//! executes one [`Command`] at a time, enforces the occupancy and
//! connectivity invariants, and reports what actually happened as [`Event`]
//! values. Systems never touch this state directly; they read it through
//! [`query`] and answer with fresh command batches.

pub mod connectivity;
mod generation;

pub use generation::GenerationError;

use std::collections::VecDeque;

use grid_pursuit_core::{
    AgentId, Cell, Command, Direction, Event, MoveDecision, RoleAssignment, Tendency, Terrain,
    TerrainGrid, WallError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default side length of the square grid.
pub const DEFAULT_GRID_SIZE: u32 = 30;

/// Default number of pursuing agents.
pub const DEFAULT_AGENT_COUNT: u32 = 20;

/// Number of past player positions retained for tendency estimation.
pub const HISTORY_LIMIT: usize = 10;

/// Manhattan distance a respawned agent must exceed from the player.
pub const RESPAWN_MIN_DISTANCE: u32 = 5;

/// Manhattan distance at or below which an agent catches the player.
pub const CATCH_DISTANCE: u32 = 1;

/// Turns an agent skips after using a terrain skill.
const SKILL_RECOVERY_TURNS: u32 = 1;

const RESPAWN_ATTEMPTS: u32 = 1_024;

/// Configuration parameters required to construct a fresh world.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    grid_size: u32,
    agent_count: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration with explicit dimensions and seed.
    #[must_use]
    pub const fn new(grid_size: u32, agent_count: u32, rng_seed: u64) -> Self {
        Self {
            grid_size,
            agent_count,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE, DEFAULT_AGENT_COUNT, 0)
    }
}

#[derive(Clone, Copy, Debug)]
struct Agent {
    id: AgentId,
    cell: Cell,
    slow_turns: u32,
}

#[derive(Clone, Debug)]
struct Player {
    cell: Cell,
    slow_turns: u32,
    history: VecDeque<Cell>,
}

impl Player {
    fn at(cell: Cell) -> Self {
        Self {
            cell,
            slow_turns: 0,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    fn record_history(&mut self) {
        if self.history.len() == HISTORY_LIMIT {
            let _ = self.history.pop_front();
        }
        self.history.push_back(self.cell);
    }

    /// Average per-turn displacement across the retained history.
    fn tendency(&self) -> Tendency {
        let (Some(first), Some(last)) = (self.history.front(), self.history.back()) else {
            return Tendency::DEFAULT;
        };
        if self.history.len() < 2 {
            return Tendency::DEFAULT;
        }
        let turns = self.history.len() as f32;
        let dx = (i64::from(last.column()) - i64::from(first.column())) as f32;
        let dy = (i64::from(last.row()) - i64::from(first.row())) as f32;
        Tendency::new(dx / turns, dy / turns)
    }
}

/// Authoritative simulation state mutated exclusively through [`apply`].
#[derive(Debug)]
pub struct World {
    grid: TerrainGrid,
    player: Player,
    agents: Vec<Agent>,
    roles: RoleAssignment,
    turn_index: u64,
    rng: StdRng,
}

impl World {
    /// Generates a fresh world from the provided configuration.
    ///
    /// Spawn positions are drawn first, then terrain layouts are sampled
    /// until every agent can reach the player. Role membership starts empty
    /// and is installed by the first [`Command::AssignRoles`].
    pub fn new(config: Config) -> Result<Self, GenerationError> {
        let mut rng = StdRng::seed_from_u64(config.rng_seed);
        let (player_cell, agent_cells) =
            generation::generate_positions(&mut rng, config.grid_size, config.agent_count)?;
        let grid =
            generation::generate_grid(&mut rng, config.grid_size, player_cell, &agent_cells)?;

        Ok(Self::assemble(grid, player_cell, &agent_cells, rng))
    }

    /// Builds a world from an explicit layout, for replays and tests.
    ///
    /// Returns `None` when an occupant sits out of bounds or on a wall, when
    /// two occupants share a cell, or when some agent cannot reach the
    /// player.
    #[must_use]
    pub fn from_parts(
        grid: TerrainGrid,
        player: Cell,
        agents: &[Cell],
        rng_seed: u64,
    ) -> Option<Self> {
        if !grid.is_passable(player) {
            return None;
        }
        for (index, cell) in agents.iter().enumerate() {
            if !grid.is_passable(*cell) || *cell == player || agents[index + 1..].contains(cell) {
                return None;
            }
        }
        if !connectivity::region_connected(&grid, player, agents) {
            return None;
        }

        let rng = StdRng::seed_from_u64(rng_seed);
        Some(Self::assemble(grid, player, agents, rng))
    }

    fn assemble(grid: TerrainGrid, player: Cell, agents: &[Cell], rng: StdRng) -> Self {
        let agents = agents
            .iter()
            .enumerate()
            .map(|(index, cell)| Agent {
                id: AgentId::new(index as u32),
                cell: *cell,
                slow_turns: 0,
            })
            .collect();

        Self {
            grid,
            player: Player::at(player),
            agents,
            roles: RoleAssignment::default(),
            turn_index: 0,
            rng,
        }
    }
}

/// Executes a single command against the world.
///
/// Invalid or stale requests are dropped without mutating state; observable
/// outcomes, including rejections that carry a reason, are appended to
/// `out_events` in the order they occurred.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { direction } => move_player(world, direction, out_events),
        Command::StepAgent { agent, decision } => step_agent(world, agent, decision, out_events),
        Command::AssignRoles { assignment } => assign_roles(world, assignment, out_events),
        Command::CastMud { agent, cell } => cast_mud(world, agent, cell, out_events),
        Command::DowngradeTerrain { agent, cell } => {
            downgrade_terrain(world, agent, cell, out_events);
        }
        Command::RaiseWall { agent, cell } => raise_wall(world, agent, cell, out_events),
        Command::EndTurn => end_turn(world, out_events),
    }
}

fn move_player(world: &mut World, direction: Direction, out: &mut Vec<Event>) {
    // History records the attempt, not the outcome, so a blocked or slowed
    // player drags the tendency toward zero displacement.
    world.player.record_history();

    if world.player.slow_turns > 0 {
        world.player.slow_turns -= 1;
        return;
    }

    let (dx, dy) = direction.deltas();
    let Some(destination) = world.player.cell.offset_by(dx, dy) else {
        return;
    };
    if !world.grid.is_passable(destination) {
        return;
    }

    let from = world.player.cell;
    world.player.cell = destination;
    out.push(Event::PlayerMoved {
        from,
        to: destination,
    });

    let slow = world.grid.terrain(destination).map_or(0, Terrain::slow_turns);
    if slow > 0 {
        world.player.slow_turns = slow;
        out.push(Event::PlayerSlowed { turns: slow });
    }
}

fn step_agent(world: &mut World, agent: AgentId, decision: MoveDecision, out: &mut Vec<Event>) {
    let Some(index) = world.agents.iter().position(|entry| entry.id == agent) else {
        return;
    };

    if world.agents[index].slow_turns > 0 {
        world.agents[index].slow_turns -= 1;
        return;
    }

    let MoveDecision::MoveTo(destination) = decision else {
        return;
    };
    // Step length is the planner's concern; the world only guards terrain
    // and occupancy.
    if !world.grid.is_passable(destination) {
        return;
    }
    let occupied = world
        .agents
        .iter()
        .enumerate()
        .any(|(other, entry)| other != index && entry.cell == destination);
    if occupied {
        return;
    }

    let from = world.agents[index].cell;
    world.agents[index].cell = destination;
    out.push(Event::AgentAdvanced {
        agent,
        from,
        to: destination,
    });

    if destination.manhattan_distance(world.player.cell) <= CATCH_DISTANCE {
        out.push(Event::AgentCaught {
            agent,
            cell: destination,
        });
        respawn_agent(world, index, out);
        return;
    }

    let slow = world.grid.terrain(destination).map_or(0, Terrain::slow_turns);
    if slow > 0 {
        world.agents[index].slow_turns = slow;
        out.push(Event::AgentSlowed { agent, turns: slow });
    }
}

fn respawn_agent(world: &mut World, index: usize, out: &mut Vec<Event>) {
    let size = world.grid.size();

    for _ in 0..RESPAWN_ATTEMPTS {
        let candidate = Cell::new(
            world.rng.gen_range(0..size),
            world.rng.gen_range(0..size),
        );
        if admissible_respawn(world, index, candidate)
            && relocation_keeps_connectivity(world, index, candidate)
        {
            finish_respawn(world, index, candidate, out);
            return;
        }
    }

    // Sampling exhausted its budget; fall back to the player's reachable
    // set, where connectivity holds by construction. An agent with no
    // admissible cell at all stays where it was caught.
    let reachable = connectivity::reachable_cells(&world.grid, world.player.cell);
    let fallback = reachable
        .into_iter()
        .find(|cell| admissible_respawn(world, index, *cell));
    if let Some(candidate) = fallback {
        finish_respawn(world, index, candidate, out);
    }
}

fn admissible_respawn(world: &World, index: usize, candidate: Cell) -> bool {
    world.grid.is_passable(candidate)
        && candidate.manhattan_distance(world.player.cell) > RESPAWN_MIN_DISTANCE
        && !world
            .agents
            .iter()
            .enumerate()
            .any(|(other, entry)| other != index && entry.cell == candidate)
}

fn relocation_keeps_connectivity(world: &World, index: usize, candidate: Cell) -> bool {
    let targets: Vec<Cell> = world
        .agents
        .iter()
        .enumerate()
        .map(|(other, entry)| if other == index { candidate } else { entry.cell })
        .collect();
    connectivity::region_connected(&world.grid, world.player.cell, &targets)
}

fn finish_respawn(world: &mut World, index: usize, destination: Cell, out: &mut Vec<Event>) {
    let from = world.agents[index].cell;
    let agent = world.agents[index].id;
    world.agents[index].cell = destination;
    world.agents[index].slow_turns = 0;
    out.push(Event::AgentRespawned {
        agent,
        from,
        to: destination,
    });

    let slow = world.grid.terrain(destination).map_or(0, Terrain::slow_turns);
    if slow > 0 {
        world.agents[index].slow_turns = slow;
        out.push(Event::AgentSlowed { agent, turns: slow });
    }
}

fn assign_roles(world: &mut World, assignment: RoleAssignment, out: &mut Vec<Event>) {
    let ids: Vec<AgentId> = world.agents.iter().map(|entry| entry.id).collect();
    if assignment.partitions(&ids) {
        world.roles = assignment;
        out.push(Event::RolesAssigned);
    } else {
        out.push(Event::RolesRejected);
    }
}

fn cast_mud(world: &mut World, agent: AgentId, cell: Cell, out: &mut Vec<Event>) {
    let Some(index) = world.agents.iter().position(|entry| entry.id == agent) else {
        return;
    };
    if world.grid.terrain(cell) != Some(Terrain::Empty) {
        return;
    }
    if cell == world.player.cell || world.agents.iter().any(|entry| entry.cell == cell) {
        return;
    }
    if world.grid.set_terrain(cell, Terrain::Mud).is_none() {
        return;
    }
    out.push(Event::TerrainChanged {
        cell,
        from: Terrain::Empty,
        to: Terrain::Mud,
    });
    slow_caster(world, index, out);
}

fn downgrade_terrain(world: &mut World, agent: AgentId, cell: Cell, out: &mut Vec<Event>) {
    let Some(index) = world.agents.iter().position(|entry| entry.id == agent) else {
        return;
    };
    let Some(original) = world.grid.terrain(cell) else {
        return;
    };
    let softened = match original {
        Terrain::Water => Terrain::Mud,
        Terrain::Mud => Terrain::Empty,
        Terrain::Empty | Terrain::Wall => return,
    };
    if world.grid.set_terrain(cell, softened).is_none() {
        return;
    }
    out.push(Event::TerrainChanged {
        cell,
        from: original,
        to: softened,
    });
    slow_caster(world, index, out);
}

fn raise_wall(world: &mut World, agent: AgentId, cell: Cell, out: &mut Vec<Event>) {
    let Some(index) = world.agents.iter().position(|entry| entry.id == agent) else {
        return;
    };

    match commit_wall(world, cell) {
        Ok(()) => out.push(Event::WallRaised { agent, cell }),
        Err(reason) => out.push(Event::WallRejected {
            agent,
            cell,
            reason,
        }),
    }
    // Raising costs the turn whether or not the wall landed.
    slow_caster(world, index, out);
}

fn commit_wall(world: &mut World, cell: Cell) -> Result<(), WallError> {
    let Some(previous) = world.grid.terrain(cell) else {
        return Err(WallError::OutOfBounds);
    };
    if previous == Terrain::Wall {
        return Err(WallError::AlreadyWall);
    }
    if cell == world.player.cell || world.agents.iter().any(|entry| entry.cell == cell) {
        return Err(WallError::Occupied);
    }

    // Commit tentatively, then revert if the region splits.
    if world.grid.set_terrain(cell, Terrain::Wall).is_none() {
        return Err(WallError::OutOfBounds);
    }
    let targets: Vec<Cell> = world.agents.iter().map(|entry| entry.cell).collect();
    if connectivity::region_connected(&world.grid, world.player.cell, &targets) {
        Ok(())
    } else {
        let _ = world.grid.set_terrain(cell, previous);
        Err(WallError::DisconnectsRegion)
    }
}

fn slow_caster(world: &mut World, index: usize, out: &mut Vec<Event>) {
    world.agents[index].slow_turns = SKILL_RECOVERY_TURNS;
    out.push(Event::AgentSlowed {
        agent: world.agents[index].id,
        turns: SKILL_RECOVERY_TURNS,
    });
}

fn end_turn(world: &mut World, out: &mut Vec<Event>) {
    let completed = world.turn_index;
    world.turn_index += 1;
    out.push(Event::TurnEnded { turn: completed });
}

/// Read-only accessors used by systems and the host loop.
pub mod query {
    use super::World;
    use grid_pursuit_core::{AgentSnapshot, AgentView, Cell, RoleAssignment, Tendency, TerrainGrid};

    /// Current terrain grid.
    #[must_use]
    pub fn terrain(world: &World) -> &TerrainGrid {
        &world.grid
    }

    /// Snapshot of every agent, sorted by id.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(
            world
                .agents
                .iter()
                .map(|entry| AgentSnapshot {
                    id: entry.id,
                    cell: entry.cell,
                    slow_turns: entry.slow_turns,
                })
                .collect(),
        )
    }

    /// Currently active role partition.
    #[must_use]
    pub fn roles(world: &World) -> &RoleAssignment {
        &world.roles
    }

    /// Cell currently occupied by the player.
    #[must_use]
    pub fn player_cell(world: &World) -> Cell {
        world.player.cell
    }

    /// Remaining turns the player must skip.
    #[must_use]
    pub fn player_slow_turns(world: &World) -> u32 {
        world.player.slow_turns
    }

    /// Smoothed displacement vector derived from the player's history.
    #[must_use]
    pub fn player_tendency(world: &World) -> Tendency {
        world.player.tendency()
    }

    /// Number of turns closed so far.
    #[must_use]
    pub fn turn_index(world: &World) -> u64 {
        world.turn_index
    }
}
