#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted A* search over the terrain grid.
//!
//! The search runs over 4-directional unit steps where entering a cell costs
//! that cell's terrain weight. The Manhattan heuristic is admissible because
//! the minimum single-step cost is one, so returned paths are cost-optimal.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use grid_pursuit_core::{Cell, TerrainGrid};

const UNREACHED: u32 = u32::MAX;

/// Computes the cheapest path from `start` to `goal`, exclusive of `start`.
///
/// Returns an empty sequence when the goal is unreachable, when either
/// endpoint lies outside the grid, or when `start == goal`. Callers must
/// treat an empty result as "cannot advance", never as an error.
#[must_use]
pub fn find_path(grid: &TerrainGrid, start: Cell, goal: Cell) -> Vec<Cell> {
    if start == goal || !grid.in_bounds(start) || !grid.is_passable(goal) {
        return Vec::new();
    }

    let width = usize::try_from(grid.size()).unwrap_or(0);
    let cell_count = width.checked_mul(width).unwrap_or(0);
    if cell_count == 0 {
        return Vec::new();
    }

    let mut g_scores = vec![UNREACHED; cell_count];
    let mut came_from: Vec<Option<Cell>> = vec![None; cell_count];
    let mut frontier: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut discovery = 0_u64;

    let Some(start_index) = index(width, start) else {
        return Vec::new();
    };
    g_scores[start_index] = 0;
    frontier.push(Reverse(OpenNode {
        f: start.manhattan_distance(goal),
        discovery,
        g: 0,
        cell: start,
    }));

    while let Some(Reverse(node)) = frontier.pop() {
        let Some(node_index) = index(width, node.cell) else {
            continue;
        };

        // Stale queue entry superseded by a cheaper relaxation.
        if node.g > g_scores[node_index] {
            continue;
        }

        if node.cell == goal {
            return reconstruct(&came_from, width, start, goal);
        }

        for neighbor in passable_neighbors(grid, node.cell) {
            let Some(step_cost) = grid.cost(neighbor) else {
                continue;
            };
            let tentative = node.g.saturating_add(step_cost);

            let Some(neighbor_index) = index(width, neighbor) else {
                continue;
            };
            if tentative >= g_scores[neighbor_index] {
                continue;
            }

            g_scores[neighbor_index] = tentative;
            came_from[neighbor_index] = Some(node.cell);
            discovery += 1;
            frontier.push(Reverse(OpenNode {
                f: tentative.saturating_add(neighbor.manhattan_distance(goal)),
                discovery,
                g: tentative,
                cell: neighbor,
            }));
        }
    }

    Vec::new()
}

/// Accumulated terrain cost of traversing a path returned by [`find_path`].
#[must_use]
pub fn path_cost(grid: &TerrainGrid, path: &[Cell]) -> u32 {
    path.iter()
        .map(|cell| grid.cost(*cell).unwrap_or(0))
        .sum()
}

/// Frontier entry ordered by `f`, then by discovery order for FIFO-stable ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    discovery: u64,
    g: u32,
    cell: Cell,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.f, self.discovery).cmp(&(other.f, other.discovery))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct(came_from: &[Option<Cell>], width: usize, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = Vec::new();
    let mut current = goal;

    while current != start {
        path.push(current);
        let Some(current_index) = index(width, current) else {
            return Vec::new();
        };
        match came_from.get(current_index).copied().flatten() {
            Some(previous) => current = previous,
            None => return Vec::new(),
        }
    }

    path.reverse();
    path
}

fn passable_neighbors(grid: &TerrainGrid, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
    const STEPS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
    STEPS
        .into_iter()
        .filter_map(move |(dx, dy)| cell.offset_by(dx, dy))
        .filter(|candidate| grid.is_passable(*candidate))
}

fn index(width: usize, cell: Cell) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
