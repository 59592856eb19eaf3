//! Random layout generation for fresh worlds.
//!
//! Terrain is sampled cell by cell from a fixed category distribution, spawn
//! cells are carved back to empty, and the whole layout is retried until the
//! connectivity validator accepts it.

use grid_pursuit_core::{Cell, Terrain, TerrainGrid};
use rand::Rng;
use thiserror::Error;

use crate::connectivity;

const EMPTY_SHARE: f32 = 0.70;
const MUD_SHARE: f32 = 0.15;
const WATER_SHARE: f32 = 0.10;

const GRID_ATTEMPTS: u32 = 1_000;
const POSITION_ATTEMPTS: u32 = 10_000;

/// Failures that can occur while generating a fresh world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The requested population cannot fit on the grid.
    #[error("a {size}x{size} grid cannot host {agents} agents and a player")]
    TooCrowded {
        /// Side length of the rejected grid.
        size: u32,
        /// Number of agents requested.
        agents: u32,
    },
    /// Every sampled layout left some spawn cell unreachable.
    #[error("no connected terrain layout found within {attempts} attempts")]
    AttemptsExhausted {
        /// Number of layouts sampled before giving up.
        attempts: u32,
    },
}

/// Picks the player spawn and distinct agent spawns on an empty board.
pub(crate) fn generate_positions<R: Rng>(
    rng: &mut R,
    size: u32,
    agent_count: u32,
) -> Result<(Cell, Vec<Cell>), GenerationError> {
    let capacity = u64::from(size) * u64::from(size);
    if u64::from(agent_count) + 1 > capacity {
        return Err(GenerationError::TooCrowded {
            size,
            agents: agent_count,
        });
    }

    let player = random_cell(rng, size);
    let mut agents: Vec<Cell> = Vec::with_capacity(agent_count as usize);
    let mut attempts = 0;
    while (agents.len() as u32) < agent_count && attempts < POSITION_ATTEMPTS {
        attempts += 1;
        let candidate = random_cell(rng, size);
        if candidate == player || agents.contains(&candidate) {
            continue;
        }
        agents.push(candidate);
    }

    // Rejection sampling stalls on dense boards; a row-major sweep always
    // finishes because the capacity check above guarantees room.
    if (agents.len() as u32) < agent_count {
        'sweep: for row in 0..size {
            for column in 0..size {
                let candidate = Cell::new(column, row);
                if candidate == player || agents.contains(&candidate) {
                    continue;
                }
                agents.push(candidate);
                if agents.len() as u32 == agent_count {
                    break 'sweep;
                }
            }
        }
    }

    Ok((player, agents))
}

/// Samples terrain layouts until every agent can reach the player.
///
/// Spawn cells are forced to empty in every candidate layout, so occupants
/// never start inside a wall or on slowing terrain.
pub(crate) fn generate_grid<R: Rng>(
    rng: &mut R,
    size: u32,
    player: Cell,
    agents: &[Cell],
) -> Result<TerrainGrid, GenerationError> {
    let cell_count = usize::try_from(u64::from(size) * u64::from(size)).unwrap_or(0);

    for _ in 0..GRID_ATTEMPTS {
        let cells: Vec<Terrain> = (0..cell_count).map(|_| sample_terrain(rng)).collect();
        let Some(mut grid) = TerrainGrid::from_cells(size, cells) else {
            break;
        };
        let _ = grid.set_terrain(player, Terrain::Empty);
        for cell in agents {
            let _ = grid.set_terrain(*cell, Terrain::Empty);
        }
        if connectivity::region_connected(&grid, player, agents) {
            return Ok(grid);
        }
    }

    Err(GenerationError::AttemptsExhausted {
        attempts: GRID_ATTEMPTS,
    })
}

fn sample_terrain<R: Rng>(rng: &mut R) -> Terrain {
    let roll: f32 = rng.gen();
    if roll < EMPTY_SHARE {
        Terrain::Empty
    } else if roll < EMPTY_SHARE + MUD_SHARE {
        Terrain::Mud
    } else if roll < EMPTY_SHARE + MUD_SHARE + WATER_SHARE {
        Terrain::Water
    } else {
        Terrain::Wall
    }
}

fn random_cell<R: Rng>(rng: &mut R, size: u32) -> Cell {
    Cell::new(rng.gen_range(0..size), rng.gen_range(0..size))
}
