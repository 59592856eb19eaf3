use grid_pursuit_core::{
    AgentId, Cell, Command, Direction, Event, RoleAssignment, Terrain, TerrainGrid,
};
use grid_pursuit_system_skills::{Skills, CAST_MIN_RADIUS, SKILL_RADIUS};
use grid_pursuit_world::{self as world, connectivity, query, World};

fn assign(world: &mut World, assignment: RoleAssignment) {
    let mut events = Vec::new();
    world::apply(world, Command::AssignRoles { assignment }, &mut events);
    assert_eq!(events, vec![Event::RolesAssigned]);
}

#[test]
fn blocker_walls_never_split_the_world() {
    let grid = TerrainGrid::filled(11, Terrain::Empty);
    let agents = [Cell::new(9, 3), Cell::new(9, 7), Cell::new(7, 5)];
    let mut world = World::from_parts(grid, Cell::new(5, 5), &agents, 0xb10c).expect("layout");
    assign(
        &mut world,
        RoleAssignment::new(
            Vec::new(),
            Vec::new(),
            vec![AgentId::new(0), AgentId::new(1), AgentId::new(2)],
        ),
    );

    let skills = Skills::new();
    // A static player keeps the default eastward tendency, so the intercept
    // sits at the clamped projection seven steps east.
    let intercept = Cell::new(10, 5);

    for _ in 0..8 {
        let mut commands = Vec::new();
        skills.handle(
            query::terrain(&world),
            &query::agent_view(&world),
            query::roles(&world),
            query::player_cell(&world),
            query::player_tendency(&world),
            intercept,
            &mut commands,
        );

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        world::apply(&mut world, Command::EndTurn, &mut events);

        let cells: Vec<Cell> = query::agent_view(&world)
            .iter()
            .map(|snapshot| snapshot.cell)
            .collect();
        assert!(
            connectivity::region_connected(
                query::terrain(&world),
                query::player_cell(&world),
                &cells,
            ),
            "a committed wall cut an agent off from the player"
        );
    }

    // The guard rejects splits but still lets walls accumulate.
    let mut walls = 0;
    for row in 0..11 {
        for column in 0..11 {
            if query::terrain(&world).terrain(Cell::new(column, row)) == Some(Terrain::Wall) {
                walls += 1;
            }
        }
    }
    assert!(walls > 0, "expected at least one committed wall");
}

#[test]
fn helper_mud_lands_ahead_of_a_moving_player() {
    let grid = TerrainGrid::filled(12, Terrain::Empty);
    let mut world =
        World::from_parts(grid, Cell::new(2, 6), &[Cell::new(6, 6)], 5).expect("layout");
    assign(
        &mut world,
        RoleAssignment::new(Vec::new(), vec![AgentId::new(0)], Vec::new()),
    );

    let mut events = Vec::new();
    for _ in 0..3 {
        world::apply(
            &mut world,
            Command::MovePlayer {
                direction: Direction::East,
            },
            &mut events,
        );
    }
    let tendency = query::player_tendency(&world);
    assert!(tendency.dx() > 0.0);

    let skills = Skills::new();
    let mut commands = Vec::new();
    skills.handle(
        query::terrain(&world),
        &query::agent_view(&world),
        query::roles(&world),
        query::player_cell(&world),
        tendency,
        Cell::new(11, 6),
        &mut commands,
    );

    let target = commands
        .iter()
        .find_map(|command| match command {
            Command::CastMud { cell, .. } => Some(*cell),
            _ => None,
        })
        .expect("helper should cast mud");
    let player = query::player_cell(&world);
    let offset = target.manhattan_distance(player);
    assert!((CAST_MIN_RADIUS..=SKILL_RADIUS).contains(&offset));
    assert!(
        target.column() >= player.column(),
        "mud must land ahead of the eastward motion"
    );

    events.clear();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }
    assert_eq!(query::terrain(&world).terrain(target), Some(Terrain::Mud));
}
