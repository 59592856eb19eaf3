//! Flood-fill reachability queries over the terrain grid.

use std::collections::VecDeque;

use grid_pursuit_core::{Cell, TerrainGrid};

/// Reports whether every target is reachable from `source`.
///
/// Reachability is computed with a breadth-first flood fill over passable,
/// in-bounds cells under 4-directional adjacency. The query is pure and runs
/// in O(size²) worst case. An impassable or out-of-bounds source reaches
/// nothing, so the check only succeeds for an empty target set.
#[must_use]
pub fn region_connected(grid: &TerrainGrid, source: Cell, targets: &[Cell]) -> bool {
    if targets.is_empty() {
        return true;
    }

    let visited = flood_fill(grid, source);
    let width = usize::try_from(grid.size()).unwrap_or(0);
    targets.iter().all(|target| {
        index(width, *target)
            .and_then(|offset| visited.get(offset).copied())
            .unwrap_or(false)
    })
}

/// Enumerates every cell reachable from `source`, in row-major order.
///
/// Used as the respawn fallback when random sampling keeps failing: any
/// member of this set is connected to the source by construction.
#[must_use]
pub fn reachable_cells(grid: &TerrainGrid, source: Cell) -> Vec<Cell> {
    let visited = flood_fill(grid, source);
    let size = grid.size();
    let mut cells = Vec::new();

    for row in 0..size {
        for column in 0..size {
            let cell = Cell::new(column, row);
            let width = usize::try_from(size).unwrap_or(0);
            if index(width, cell)
                .and_then(|offset| visited.get(offset).copied())
                .unwrap_or(false)
            {
                cells.push(cell);
            }
        }
    }

    cells
}

fn flood_fill(grid: &TerrainGrid, source: Cell) -> Vec<bool> {
    let width = usize::try_from(grid.size()).unwrap_or(0);
    let cell_count = width.checked_mul(width).unwrap_or(0);
    let mut visited = vec![false; cell_count];

    if !grid.is_passable(source) {
        return visited;
    }
    let Some(source_index) = index(width, source) else {
        return visited;
    };
    visited[source_index] = true;

    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(cell) = queue.pop_front() {
        const STEPS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        for (dx, dy) in STEPS {
            let Some(neighbor) = cell.offset_by(dx, dy) else {
                continue;
            };
            if !grid.is_passable(neighbor) {
                continue;
            }
            let Some(neighbor_index) = index(width, neighbor) else {
                continue;
            };
            if visited[neighbor_index] {
                continue;
            }
            visited[neighbor_index] = true;
            queue.push_back(neighbor);
        }
    }

    visited
}

fn index(width: usize, cell: Cell) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    if column >= width || row >= width {
        return None;
    }
    row.checked_mul(width)?.checked_add(column)
}
