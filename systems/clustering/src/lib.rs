#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Unsupervised role grouping for the pursuit swarm.
//!
//! Agents are partitioned into three spatial clusters with k-means, then the
//! clusters are relabeled into behavioral roles by ranking their centroids
//! by distance to the player: the nearest cluster chases, the middle one
//! assists, the farthest one blocks. Membership is therefore re-derived on
//! every run and never a stable identity.

use grid_pursuit_core::{AgentId, AgentView, Cell, Command, Event, RoleAssignment};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Number of closed turns between periodic regroups.
pub const REGROUP_INTERVAL: u64 = 10;

const CLUSTER_COUNT: usize = 3;
const MAX_ITERATIONS: usize = 100;

/// Configuration parameters required to construct the clustering system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided centroid seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// System that re-derives the role partition when the geometry goes stale.
///
/// A fresh assignment is emitted at simulation start, after every
/// [`REGROUP_INTERVAL`] closed turns, and immediately after any respawn.
#[derive(Debug)]
pub struct RoleClustering {
    rng: StdRng,
    turns_until_regroup: u64,
    pending: bool,
}

impl RoleClustering {
    /// Creates a new clustering system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.rng_seed),
            turns_until_regroup: REGROUP_INTERVAL,
            pending: true,
        }
    }

    /// Consumes events and immutable views to emit role assignments.
    pub fn handle(
        &mut self,
        events: &[Event],
        player: Cell,
        agents: &AgentView,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::AgentRespawned { .. } => self.pending = true,
                Event::TurnEnded { .. } => {
                    self.turns_until_regroup = self.turns_until_regroup.saturating_sub(1);
                    if self.turns_until_regroup == 0 {
                        self.pending = true;
                    }
                }
                _ => {}
            }
        }

        if !self.pending || agents.is_empty() {
            return;
        }

        let assignment = cluster_roles(player, agents, &mut self.rng);
        out.push(Command::AssignRoles { assignment });
        self.pending = false;
        self.turns_until_regroup = REGROUP_INTERVAL;
    }
}

/// Groups the agents into the three behavioral roles.
///
/// Fewer than three agents skips clustering entirely: each agent forms its
/// own singleton group and roles are handed out by distance rank alone.
#[must_use]
pub fn cluster_roles<R: Rng>(player: Cell, agents: &AgentView, rng: &mut R) -> RoleAssignment {
    let members: Vec<(AgentId, Cell)> = agents
        .iter()
        .map(|snapshot| (snapshot.id, snapshot.cell))
        .collect();

    if members.len() < CLUSTER_COUNT {
        return singleton_fallback(player, &members);
    }

    let positions: Vec<Cell> = members.iter().map(|(_, cell)| *cell).collect();
    let (labels, centroids) = kmeans(&positions, rng);
    let ranking = rank_by_player_distance(player, &centroids);

    let mut roles: [Vec<AgentId>; CLUSTER_COUNT] = [Vec::new(), Vec::new(), Vec::new()];
    for ((agent, _), label) in members.iter().zip(labels) {
        let rank = ranking
            .iter()
            .position(|cluster| *cluster == label)
            .unwrap_or(CLUSTER_COUNT - 1);
        roles[rank].push(*agent);
    }

    let [chasers, helpers, blockers] = roles;
    RoleAssignment::new(chasers, helpers, blockers)
}

fn singleton_fallback(player: Cell, members: &[(AgentId, Cell)]) -> RoleAssignment {
    let mut ranked: Vec<(AgentId, u32)> = members
        .iter()
        .map(|(agent, cell)| (*agent, cell.manhattan_distance(player)))
        .collect();
    ranked.sort_by_key(|(agent, distance)| (*distance, *agent));

    let mut roles: [Vec<AgentId>; CLUSTER_COUNT] = [Vec::new(), Vec::new(), Vec::new()];
    for (rank, (agent, _)) in ranked.into_iter().enumerate() {
        roles[rank.min(CLUSTER_COUNT - 1)].push(agent);
    }

    let [chasers, helpers, blockers] = roles;
    RoleAssignment::new(chasers, helpers, blockers)
}

/// Lloyd's algorithm over agent cells in 2D Euclidean space.
///
/// Initial centroids are a random sample of distinct agent positions. Empty
/// clusters retain their previous centroid rather than reseeding. Iteration
/// stops once the label assignment stabilizes.
fn kmeans<R: Rng>(positions: &[Cell], rng: &mut R) -> (Vec<usize>, [Centroid; CLUSTER_COUNT]) {
    let mut centroids = [Centroid::default(); CLUSTER_COUNT];
    for (slot, seed) in centroids
        .iter_mut()
        .zip(positions.choose_multiple(rng, CLUSTER_COUNT))
    {
        *slot = Centroid::from_cell(*seed);
    }

    let mut labels = vec![0_usize; positions.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (slot, position) in labels.iter_mut().zip(positions) {
            let nearest = nearest_centroid(&centroids, *position);
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }

        let mut sums = [(0.0_f64, 0.0_f64, 0_usize); CLUSTER_COUNT];
        for (label, position) in labels.iter().zip(positions) {
            let entry = &mut sums[*label];
            entry.0 += f64::from(position.column());
            entry.1 += f64::from(position.row());
            entry.2 += 1;
        }
        for (centroid, (column_sum, row_sum, count)) in centroids.iter_mut().zip(sums) {
            if count > 0 {
                *centroid = Centroid {
                    column: column_sum / count as f64,
                    row: row_sum / count as f64,
                };
            }
        }

        if !changed {
            break;
        }
    }

    (labels, centroids)
}

fn nearest_centroid(centroids: &[Centroid; CLUSTER_COUNT], position: Cell) -> usize {
    let mut nearest = 0;
    let mut nearest_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = centroid.distance_sq(position);
        if distance < nearest_distance {
            nearest = index;
            nearest_distance = distance;
        }
    }
    nearest
}

fn rank_by_player_distance(
    player: Cell,
    centroids: &[Centroid; CLUSTER_COUNT],
) -> [usize; CLUSTER_COUNT] {
    let mut ranking = [0_usize, 1, 2];
    ranking.sort_by(|left, right| {
        let left_distance = centroids[*left].distance_sq(player);
        let right_distance = centroids[*right].distance_sq(player);
        left_distance
            .partial_cmp(&right_distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranking
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Centroid {
    column: f64,
    row: f64,
}

impl Centroid {
    fn from_cell(cell: Cell) -> Self {
        Self {
            column: f64::from(cell.column()),
            row: f64::from(cell.row()),
        }
    }

    fn distance_sq(&self, cell: Cell) -> f64 {
        let dc = self.column - f64::from(cell.column());
        let dr = self.row - f64::from(cell.row());
        dc * dc + dr * dr
    }
}

#[cfg(test)]
mod tests {
    use super::{cluster_roles, Centroid, rank_by_player_distance};
    use grid_pursuit_core::{AgentId, AgentSnapshot, AgentView, Cell, Role};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn view(cells: &[(u32, u32)]) -> AgentView {
        AgentView::from_snapshots(
            cells
                .iter()
                .enumerate()
                .map(|(index, (column, row))| AgentSnapshot {
                    id: AgentId::new(index as u32),
                    cell: Cell::new(*column, *row),
                    slow_turns: 0,
                })
                .collect(),
        )
    }

    #[test]
    fn singleton_fallback_ranks_by_distance() {
        let agents = view(&[(9, 9), (2, 2)]);
        let mut rng = StdRng::seed_from_u64(7);

        let assignment = cluster_roles(Cell::new(0, 0), &agents, &mut rng);

        assert_eq!(assignment.members(Role::Chaser), &[AgentId::new(1)]);
        assert_eq!(assignment.members(Role::Helper), &[AgentId::new(0)]);
        assert!(assignment.members(Role::Blocker).is_empty());
    }

    #[test]
    fn clustered_roles_partition_the_agent_set() {
        let agents = view(&[
            (1, 1),
            (1, 2),
            (2, 1),
            (10, 10),
            (10, 11),
            (11, 10),
            (25, 25),
            (25, 26),
            (26, 25),
        ]);
        let ids: Vec<AgentId> = agents.iter().map(|snapshot| snapshot.id).collect();

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = cluster_roles(Cell::new(0, 0), &agents, &mut rng);
            assert!(
                assignment.partitions(&ids),
                "seed {seed} produced a non-partition"
            );
        }
    }

    #[test]
    fn role_labels_follow_centroid_distance_rank() {
        let agents = view(&[
            (1, 1),
            (1, 2),
            (2, 1),
            (10, 10),
            (10, 11),
            (11, 10),
            (25, 25),
            (25, 26),
            (26, 25),
        ]);
        let player = Cell::new(0, 0);

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = cluster_roles(player, &agents, &mut rng);

            // Converged clusters report their member mean as centroid, so the
            // mean positions must be ordered by distance to the player.
            let mut previous = f64::NEG_INFINITY;
            for role in Role::PROCESSING_ORDER {
                let members = assignment.members(role);
                if members.is_empty() {
                    continue;
                }
                let mean = mean_distance_sq(&agents, members, player);
                assert!(
                    mean >= previous,
                    "seed {seed}: {role:?} centroid out of order"
                );
                previous = mean;
            }
        }
    }

    fn mean_distance_sq(agents: &AgentView, members: &[AgentId], player: Cell) -> f64 {
        let (mut column_sum, mut row_sum) = (0.0_f64, 0.0_f64);
        for member in members {
            let cell = agents.get(*member).expect("member snapshot").cell;
            column_sum += f64::from(cell.column());
            row_sum += f64::from(cell.row());
        }
        let count = members.len() as f64;
        let dc = column_sum / count - f64::from(player.column());
        let dr = row_sum / count - f64::from(player.row());
        dc * dc + dr * dr
    }

    #[test]
    fn ranking_orders_centroids_nearest_first() {
        let centroids = [
            Centroid { column: 20.0, row: 20.0 },
            Centroid { column: 1.0, row: 1.0 },
            Centroid { column: 10.0, row: 10.0 },
        ];
        assert_eq!(rank_by_player_distance(Cell::new(0, 0), &centroids), [1, 2, 0]);
    }
}
