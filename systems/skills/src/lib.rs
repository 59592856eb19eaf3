#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Role-specific tactical actions that reshape the terrain.
//!
//! Helpers lay mud ahead of the player's motion or soften terrain behind
//! it; blockers propose wall cells near the predicted intercept. Skills only
//! select targets and emit commands; the world owns the mutations and guards
//! wall placement with the connectivity validator.

use grid_pursuit_core::{
    AgentView, Cell, Command, Role, RoleAssignment, Tendency, Terrain, TerrainGrid,
};

/// Manhattan radius of the diamond windows scanned by both skills.
pub const SKILL_RADIUS: u32 = 5;

/// Inner Manhattan radius of the helper's mud-casting ring.
pub const CAST_MIN_RADIUS: u32 = 4;

/// Terrain action selected by a helper for the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelperAction {
    /// Convert the empty cell into mud ahead of the player.
    CastMud(Cell),
    /// Soften the cell behind the player (water to mud, mud to empty).
    Downgrade(Cell),
}

/// Pure system that emits one tactical command per helper and blocker.
#[derive(Debug, Default)]
pub struct Skills;

impl Skills {
    /// Creates a new skills system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Selects tactical actions for every helper and blocker.
    ///
    /// All actions are chosen against the same pre-turn snapshot, so two
    /// casters may pick the same cell; the world commits the first command
    /// and drops the rest, and a dropped caster keeps its turn unslowed.
    pub fn handle(
        &self,
        grid: &TerrainGrid,
        agents: &AgentView,
        roles: &RoleAssignment,
        player: Cell,
        tendency: Tendency,
        intercept: Cell,
        out: &mut Vec<Command>,
    ) {
        let occupied: Vec<Cell> = agents.iter().map(|snapshot| snapshot.cell).collect();

        for agent in roles.members(Role::Helper).iter().copied() {
            let Some(snapshot) = agents.get(agent) else {
                continue;
            };
            match helper_action(grid, snapshot.cell, player, tendency, &occupied) {
                Some(HelperAction::CastMud(cell)) => out.push(Command::CastMud { agent, cell }),
                Some(HelperAction::Downgrade(cell)) => {
                    out.push(Command::DowngradeTerrain { agent, cell });
                }
                None => {}
            }
        }

        for agent in roles.members(Role::Blocker).iter().copied() {
            let Some(snapshot) = agents.get(agent) else {
                continue;
            };
            if let Some(cell) = blocker_wall(grid, snapshot.cell, intercept, player) {
                out.push(Command::RaiseWall { agent, cell });
            }
        }
    }
}

/// Selects at most one terrain action for a helper this turn.
///
/// The forward pass scans the Manhattan ring `4..=5` around the player,
/// restricted to offsets pointing ahead of the player's motion (non-negative
/// tendency dot product) and to cells the helper can reach with a cast
/// (within [`SKILL_RADIUS`] of the helper). The nearest empty, unoccupied
/// candidate receives mud. When the forward pass finds nothing, a fallback
/// pass behind the player looks for mud or water to soften instead.
#[must_use]
pub fn helper_action(
    grid: &TerrainGrid,
    helper: Cell,
    player: Cell,
    tendency: Tendency,
    occupied: &[Cell],
) -> Option<HelperAction> {
    let cast = scan_window(player, |offset, dx, dy, candidate| {
        if offset < CAST_MIN_RADIUS {
            return false;
        }
        tendency.dot(dx, dy) >= 0.0
            && candidate.manhattan_distance(helper) <= SKILL_RADIUS
            && grid.terrain(candidate) == Some(Terrain::Empty)
            && !occupied.contains(&candidate)
    });
    if let Some(cell) = cast {
        return Some(HelperAction::CastMud(cell));
    }

    let downgrade = scan_window(player, |_, dx, dy, candidate| {
        tendency.dot(dx, dy) < 0.0
            && candidate.manhattan_distance(helper) <= SKILL_RADIUS
            && matches!(
                grid.terrain(candidate),
                Some(Terrain::Mud) | Some(Terrain::Water)
            )
            && !occupied.contains(&candidate)
    });
    downgrade.map(HelperAction::Downgrade)
}

/// Selects the wall cell a blocker proposes near the intercept.
///
/// Candidates lie in the Manhattan-radius-5 diamond around the intercept,
/// must be in bounds, free of walls, and within [`SKILL_RADIUS`] of the
/// blocker itself. Each scores the negated offset from the intercept plus a
/// bonus of three when currently empty; the first maximum wins. The player's
/// cell is never proposed.
#[must_use]
pub fn blocker_wall(
    grid: &TerrainGrid,
    blocker: Cell,
    intercept: Cell,
    player: Cell,
) -> Option<Cell> {
    let mut best: Option<(Cell, i32)> = None;
    let radius = i64::from(SKILL_RADIUS);

    for dx in -radius..=radius {
        for dy in -radius..=radius {
            let offset = dx.unsigned_abs() + dy.unsigned_abs();
            if offset > u64::from(SKILL_RADIUS) {
                continue;
            }
            let Some(candidate) = intercept.offset_by(dx, dy) else {
                continue;
            };
            if !grid.in_bounds(candidate)
                || grid.terrain(candidate) == Some(Terrain::Wall)
                || candidate.manhattan_distance(blocker) > SKILL_RADIUS
            {
                continue;
            }

            let mut score = -(offset as i32);
            if grid.terrain(candidate) == Some(Terrain::Empty) {
                score += 3;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }
    }

    best.map(|(cell, _)| cell)
        .filter(|cell| *cell != player)
}

/// Scans the diamond window around `center`, keeping the accepted candidate
/// with the minimal Manhattan offset (first found wins ties).
fn scan_window<F>(center: Cell, mut accept: F) -> Option<Cell>
where
    F: FnMut(u32, i64, i64, Cell) -> bool,
{
    let radius = i64::from(SKILL_RADIUS);
    let mut best: Option<(Cell, u32)> = None;

    for dx in -radius..=radius {
        for dy in -radius..=radius {
            let offset = dx.unsigned_abs() + dy.unsigned_abs();
            if offset > u64::from(SKILL_RADIUS) {
                continue;
            }
            let offset = offset as u32;
            let Some(candidate) = center.offset_by(dx, dy) else {
                continue;
            };
            if !accept(offset, dx, dy, candidate) {
                continue;
            }
            if best.map_or(true, |(_, best_offset)| offset < best_offset) {
                best = Some((candidate, offset));
            }
        }
    }

    best.map(|(cell, _)| cell)
}
