#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative step planner that resolves one move per agent per turn.
//!
//! Every agent routes toward its role target with the weighted A* search,
//! applies its role's move-selection policy, and then claims the resulting
//! cell against a shared reservation set. Reservations are seeded with all
//! current agent positions and vacated cells are never released within a
//! turn, so a later agent can never step into a cell freed earlier in the
//! same tick.

use std::collections::HashSet;

use grid_pursuit_core::{
    AgentId, AgentView, Cell, Command, MoveDecision, Role, RoleAssignment, Tendency, TerrainGrid,
};
use grid_pursuit_system_pathfinding::find_path;

/// Number of turns the intercept prediction extrapolates ahead.
pub const PREDICTION_TURNS: f32 = 7.0;

/// Path length below which a helper holds position at casting range.
const CASTING_RANGE_STEPS: usize = 3;

/// Pure system that turns the current snapshot into per-agent step commands.
#[derive(Debug, Default)]
pub struct Planner;

impl Planner {
    /// Creates a new planner system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans one move per agent and emits the matching step commands.
    pub fn handle(
        &self,
        grid: &TerrainGrid,
        agents: &AgentView,
        roles: &RoleAssignment,
        player: Cell,
        tendency: Tendency,
        out: &mut Vec<Command>,
    ) {
        let intercept = predict_intercept(player, tendency, grid.size());
        for (agent, decision) in plan_moves(grid, agents, roles, player, intercept) {
            out.push(Command::StepAgent { agent, decision });
        }
    }
}

/// Extrapolates the player's tendency to a clamped intercept cell.
///
/// The player's average per-turn displacement is projected
/// [`PREDICTION_TURNS`] steps ahead, rounded to the nearest cell, and
/// clamped to the grid bounds.
#[must_use]
pub fn predict_intercept(player: Cell, tendency: Tendency, grid_size: u32) -> Cell {
    let bound = f32::from(u16::try_from(grid_size.saturating_sub(1)).unwrap_or(u16::MAX));
    let column = (player.column() as f32 + PREDICTION_TURNS * tendency.dx()).round();
    let row = (player.row() as f32 + PREDICTION_TURNS * tendency.dy()).round();
    Cell::new(
        column.clamp(0.0, bound) as u32,
        row.clamp(0.0, bound) as u32,
    )
}

/// Resolves one committed decision per agent for the current turn.
///
/// Agents are processed in role order (chaser, helper, blocker) and in the
/// assignment's stored order within a role; this fixed order decides who
/// wins a contested cell. Chasers and helpers target the player's cell,
/// blockers the predicted intercept. The returned decisions never collide
/// with each other, with standing agents, or with wall cells.
#[must_use]
pub fn plan_moves(
    grid: &TerrainGrid,
    agents: &AgentView,
    roles: &RoleAssignment,
    player: Cell,
    intercept: Cell,
) -> Vec<(AgentId, MoveDecision)> {
    let mut reserved: HashSet<Cell> = agents.iter().map(|snapshot| snapshot.cell).collect();
    let mut decisions = Vec::with_capacity(agents.len());

    for (role, agent) in roles.iter() {
        let Some(snapshot) = agents.get(agent) else {
            continue;
        };
        let target = match role {
            Role::Chaser | Role::Helper => player,
            Role::Blocker => intercept,
        };

        if snapshot.cell == target {
            decisions.push((agent, MoveDecision::Stay));
            continue;
        }

        let path = find_path(grid, snapshot.cell, target);
        if path.is_empty() {
            decisions.push((agent, MoveDecision::Stay));
            continue;
        }

        let candidate = match role {
            Role::Helper if path.len() < CASTING_RANGE_STEPS => None,
            Role::Blocker if path.len() >= 2 => Some(path[1]),
            _ => Some(path[0]),
        };

        let decision = match candidate {
            Some(cell) if !reserved.contains(&cell) => {
                let _ = reserved.insert(cell);
                MoveDecision::MoveTo(cell)
            }
            _ => MoveDecision::Stay,
        };
        decisions.push((agent, decision));
    }

    decisions
}
