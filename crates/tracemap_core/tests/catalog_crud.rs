use rusqlite::{params, Connection};
use serde_json::json;
use tracemap_core::db::migrations::latest_version;
use tracemap_core::{
    open_db_in_memory, Coverage, CoverageRepository, DeletePolicy, Relationship, RepoError,
    SpatialThing, SqliteCoverageRepository, SqliteThingRepository, SqliteUniverseRepository,
    ThingRepository, TimeUnit, Universe, UniverseId, UniverseRepository,
};
use uuid::Uuid;

#[test]
fn time_unit_create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();

    let mut unit = TimeUnit::new("seconds");
    unit.description = "SI seconds since the universe epoch".to_string();
    unit.links = vec!["https://en.wikipedia.org/wiki/Second".to_string()];
    repo.create_time_unit(&unit).unwrap();

    let loaded = repo.get_time_unit("seconds").unwrap().unwrap();
    assert_eq!(loaded, unit);
    assert!(repo.get_time_unit("frames").unwrap().is_none());
}

#[test]
fn time_units_list_sorted_by_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();

    repo.create_time_unit(&TimeUnit::new("seconds")).unwrap();
    repo.create_time_unit(&TimeUnit::new("frames")).unwrap();

    let names: Vec<String> = repo
        .list_time_units()
        .unwrap()
        .into_iter()
        .map(|unit| unit.name)
        .collect();
    assert_eq!(names, vec!["frames".to_string(), "seconds".to_string()]);
}

#[test]
fn delete_unreferenced_time_unit_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();

    repo.create_time_unit(&TimeUnit::new("frames")).unwrap();
    repo.delete_time_unit("frames").unwrap();
    assert!(repo.get_time_unit("frames").unwrap().is_none());

    let err = repo.delete_time_unit("frames").unwrap_err();
    assert!(matches!(err, RepoError::TimeUnitNotFound(name) if name == "frames"));
}

#[test]
fn delete_time_unit_in_use_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();

    repo.create_time_unit(&TimeUnit::new("ticks")).unwrap();
    repo.create_universe(&Universe::new("ticks")).unwrap();

    let err = repo.delete_time_unit("ticks").unwrap_err();
    assert!(matches!(
        err,
        RepoError::TimeUnitInUse { name, universes: 1 } if name == "ticks"
    ));
    assert!(repo.get_time_unit("ticks").unwrap().is_some());
}

#[test]
fn create_universe_requires_registered_time_unit() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();

    let err = repo.create_universe(&Universe::new("unregistered")).unwrap_err();
    assert!(matches!(err, RepoError::TimeUnitNotFound(name) if name == "unregistered"));
}

#[test]
fn universe_roundtrip_preserves_optional_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();
    repo.create_time_unit(&TimeUnit::new("seconds")).unwrap();

    let mut universe = Universe::new("seconds");
    universe.epoch_ms = Some(1_700_000_000_000);
    universe.srid = Some(4326);
    universe.name = "harbor".to_string();
    universe.description = "container port monitoring".to_string();
    universe.links = vec!["https://example.org/harbor".to_string()];
    universe.properties.insert("operator".to_string(), json!("port authority"));

    let id = repo.create_universe(&universe).unwrap();
    let loaded = repo.get_universe(id).unwrap().unwrap();
    assert_eq!(loaded, universe);
}

#[test]
fn update_universe_replaces_descriptive_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();
    repo.create_time_unit(&TimeUnit::new("seconds")).unwrap();
    repo.create_time_unit(&TimeUnit::new("frames")).unwrap();

    let mut universe = Universe::new("seconds");
    repo.create_universe(&universe).unwrap();

    universe.time_unit = "frames".to_string();
    universe.srid = Some(3857);
    universe.name = "renamed".to_string();
    repo.update_universe(&universe).unwrap();

    let loaded = repo.get_universe(universe.uuid).unwrap().unwrap();
    assert_eq!(loaded.time_unit, "frames");
    assert_eq!(loaded.srid, Some(3857));
    assert_eq!(loaded.name, "renamed");

    universe.time_unit = "unregistered".to_string();
    let err = repo.update_universe(&universe).unwrap_err();
    assert!(matches!(err, RepoError::TimeUnitNotFound(_)));
}

#[test]
fn update_missing_universe_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();
    repo.create_time_unit(&TimeUnit::new("seconds")).unwrap();

    let ghost = Universe::new("seconds");
    let err = repo.update_universe(&ghost).unwrap_err();
    assert!(matches!(err, RepoError::UniverseNotFound(id) if id == ghost.uuid));
}

#[test]
fn list_universes_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUniverseRepository::try_new(&conn).unwrap();
    repo.create_time_unit(&TimeUnit::new("seconds")).unwrap();

    let first = universe_with_fixed_id("00000000-0000-4000-8000-000000000002");
    let second = universe_with_fixed_id("00000000-0000-4000-8000-000000000001");
    repo.create_universe(&first).unwrap();
    repo.create_universe(&second).unwrap();

    conn.execute("UPDATE universes SET created_at = 1234567890000;", [])
        .unwrap();

    let ids: Vec<UniverseId> = repo
        .list_universes()
        .unwrap()
        .into_iter()
        .map(|universe| universe.uuid)
        .collect();
    assert_eq!(ids, vec![second.uuid, first.uuid]);
}

#[test]
fn thing_crud_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteThingRepository::try_new(&conn).unwrap();

    let mut thing = SpatialThing::new(universe);
    thing.name = "tug boat".to_string();
    thing.properties.insert("mmsi".to_string(), json!("211234560"));
    let id = repo.create_thing(&thing).unwrap();

    let loaded = repo.get_thing(id).unwrap().unwrap();
    assert_eq!(loaded, thing);
    assert!(loaded.trajectory.is_none());

    thing.description = "harbor tug".to_string();
    repo.update_thing(&thing).unwrap();
    let updated = repo.get_thing(id).unwrap().unwrap();
    assert_eq!(updated.description, "harbor tug");

    repo.delete_thing(id).unwrap();
    assert!(repo.get_thing(id).unwrap().is_none());
    let err = repo.delete_thing(id).unwrap_err();
    assert!(matches!(err, RepoError::ThingNotFound(missing) if missing == id));
}

#[test]
fn create_thing_requires_existing_universe() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteThingRepository::try_new(&conn).unwrap();

    let orphan = SpatialThing::new(Uuid::new_v4());
    let err = repo.create_thing(&orphan).unwrap_err();
    assert!(matches!(err, RepoError::UniverseNotFound(id) if id == orphan.universe));
}

#[test]
fn list_things_is_scoped_to_one_universe() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteThingRepository::try_new(&conn).unwrap();
    let universe_a = seed_universe(&conn);
    let universe_b = {
        let universes = SqliteUniverseRepository::try_new(&conn).unwrap();
        universes.create_universe(&Universe::new("ticks")).unwrap()
    };

    let thing_a = SpatialThing::new(universe_a);
    let thing_b = SpatialThing::new(universe_b);
    repo.create_thing(&thing_a).unwrap();
    repo.create_thing(&thing_b).unwrap();

    let listed = repo.list_things(universe_a).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, thing_a.uuid);
}

#[test]
fn catalog_update_leaves_derived_trajectory_alone() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteThingRepository::try_new(&conn).unwrap();

    let mut thing = SpatialThing::new(universe);
    repo.create_thing(&thing).unwrap();
    conn.execute(
        r#"UPDATE spatial_things
           SET trajectory = '{"points":[{"x":1.0,"y":2.0,"z":3.0,"t":4}]}'
           WHERE uuid = ?1;"#,
        [thing.uuid.to_string()],
    )
    .unwrap();

    thing.name = "renamed".to_string();
    repo.update_thing(&thing).unwrap();

    let loaded = repo.get_thing(thing.uuid).unwrap().unwrap();
    assert_eq!(loaded.name, "renamed");
    let trajectory = loaded.trajectory.unwrap();
    assert_eq!(trajectory.len(), 1);
    assert_eq!(trajectory.points[0].t, 4);
}

#[test]
fn coverage_crud_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteCoverageRepository::try_new(&conn).unwrap();

    let mut coverage = Coverage::new(universe);
    coverage.name = "ais feed".to_string();
    coverage.metadata.insert("sensor".to_string(), json!("ais-receiver-2"));
    let id = repo.create_coverage(&coverage).unwrap();

    let loaded = repo.get_coverage(id).unwrap().unwrap();
    assert_eq!(loaded, coverage);
    assert!(loaded.trajectory.is_none());

    coverage.description = "position reports".to_string();
    repo.update_coverage(&coverage).unwrap();
    assert_eq!(
        repo.get_coverage(id).unwrap().unwrap().description,
        "position reports"
    );

    repo.delete_coverage(id).unwrap();
    assert!(repo.get_coverage(id).unwrap().is_none());

    let err = repo.update_coverage(&coverage).unwrap_err();
    assert!(matches!(err, RepoError::CoverageNotFound(missing) if missing == id));
}

#[test]
fn relationship_requires_both_endpoints() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteCoverageRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();

    let coverage = Coverage::new(universe);
    repo.create_coverage(&coverage).unwrap();
    let thing = SpatialThing::new(universe);
    things.create_thing(&thing).unwrap();

    let missing_thing = Relationship::new(coverage.uuid, Uuid::new_v4());
    let err = repo.create_relationship(&missing_thing).unwrap_err();
    assert!(matches!(err, RepoError::ThingNotFound(_)));

    let missing_coverage = Relationship::new(Uuid::new_v4(), thing.uuid);
    let err = repo.create_relationship(&missing_coverage).unwrap_err();
    assert!(matches!(err, RepoError::CoverageNotFound(_)));
}

#[test]
fn relationships_list_by_either_endpoint() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteCoverageRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();

    let coverage = Coverage::new(universe);
    repo.create_coverage(&coverage).unwrap();
    let thing_a = SpatialThing::new(universe);
    let thing_b = SpatialThing::new(universe);
    things.create_thing(&thing_a).unwrap();
    things.create_thing(&thing_b).unwrap();

    let mut first = Relationship::new(coverage.uuid, thing_a.uuid);
    first.properties.insert("confidence".to_string(), json!(0.9));
    let second = Relationship::new(coverage.uuid, thing_b.uuid);
    repo.create_relationship(&first).unwrap();
    repo.create_relationship(&second).unwrap();

    let by_coverage = repo.list_relationships_for_coverage(coverage.uuid).unwrap();
    assert_eq!(by_coverage.len(), 2);

    let by_thing = repo.list_relationships_for_thing(thing_a.uuid).unwrap();
    assert_eq!(by_thing.len(), 1);
    assert_eq!(by_thing[0], first);
}

#[test]
fn update_relationship_replaces_properties() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteCoverageRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();

    let coverage = Coverage::new(universe);
    repo.create_coverage(&coverage).unwrap();
    let thing = SpatialThing::new(universe);
    things.create_thing(&thing).unwrap();

    let mut relationship = Relationship::new(coverage.uuid, thing.uuid);
    repo.create_relationship(&relationship).unwrap();

    relationship.properties.insert("confidence".to_string(), json!(0.9));
    repo.update_relationship(&relationship).unwrap();

    let loaded = repo.get_relationship(relationship.uuid).unwrap().unwrap();
    assert_eq!(loaded, relationship);

    let ghost = Relationship::new(coverage.uuid, thing.uuid);
    let err = repo.update_relationship(&ghost).unwrap_err();
    assert!(matches!(err, RepoError::RelationshipNotFound(id) if id == ghost.uuid));
}

#[test]
fn delete_relationship_keeps_both_endpoints() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteCoverageRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();

    let coverage = Coverage::new(universe);
    repo.create_coverage(&coverage).unwrap();
    let thing = SpatialThing::new(universe);
    things.create_thing(&thing).unwrap();

    let relationship = Relationship::new(coverage.uuid, thing.uuid);
    repo.create_relationship(&relationship).unwrap();
    repo.delete_relationship(relationship.uuid).unwrap();

    assert!(repo.get_relationship(relationship.uuid).unwrap().is_none());
    assert!(repo.get_coverage(coverage.uuid).unwrap().is_some());
    assert!(things.get_thing(thing.uuid).unwrap().is_some());
}

#[test]
fn deleting_a_coverage_cascades_to_attached_rows() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let repo = SqliteCoverageRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();

    let coverage = Coverage::new(universe);
    repo.create_coverage(&coverage).unwrap();
    let thing = SpatialThing::new(universe);
    things.create_thing(&thing).unwrap();
    repo.create_relationship(&Relationship::new(coverage.uuid, thing.uuid))
        .unwrap();
    insert_raw_sample(&conn, coverage.uuid);

    repo.delete_coverage(coverage.uuid).unwrap();

    assert_eq!(count_rows(&conn, "relationships"), 0);
    assert_eq!(count_rows(&conn, "samples"), 0);
    assert!(things.get_thing(thing.uuid).unwrap().is_some());
}

#[test]
fn restrict_policy_blocks_universe_delete_while_dependents_exist() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let universes = SqliteUniverseRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();
    let coverages = SqliteCoverageRepository::try_new(&conn).unwrap();

    things.create_thing(&SpatialThing::new(universe)).unwrap();
    coverages.create_coverage(&Coverage::new(universe)).unwrap();

    let err = universes
        .delete_universe(universe, DeletePolicy::Restrict)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniverseHasDependents {
            universe: id,
            things: 1,
            coverages: 1,
        } if id == universe
    ));
    assert!(universes.get_universe(universe).unwrap().is_some());
}

#[test]
fn cascade_policy_removes_universe_and_dependents() {
    let conn = open_db_in_memory().unwrap();
    let universe = seed_universe(&conn);
    let universes = SqliteUniverseRepository::try_new(&conn).unwrap();
    let things = SqliteThingRepository::try_new(&conn).unwrap();
    let coverages = SqliteCoverageRepository::try_new(&conn).unwrap();

    let thing = SpatialThing::new(universe);
    things.create_thing(&thing).unwrap();
    let coverage = Coverage::new(universe);
    coverages.create_coverage(&coverage).unwrap();
    coverages
        .create_relationship(&Relationship::new(coverage.uuid, thing.uuid))
        .unwrap();
    insert_raw_sample(&conn, coverage.uuid);

    universes.delete_universe(universe, DeletePolicy::Cascade).unwrap();

    assert!(universes.get_universe(universe).unwrap().is_none());
    assert_eq!(count_rows(&conn, "spatial_things"), 0);
    assert_eq!(count_rows(&conn, "coverages"), 0);
    assert_eq!(count_rows(&conn, "relationships"), 0);
    assert_eq!(count_rows(&conn, "samples"), 0);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteUniverseRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteUniverseRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("time_units"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE time_units (
            name TEXT PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            links TEXT NOT NULL DEFAULT '[]'
        );
        CREATE TABLE universes (
            uuid TEXT PRIMARY KEY,
            time_unit TEXT NOT NULL,
            epoch_ms INTEGER
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteUniverseRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "universes",
            column: "srid"
        })
    ));
}

fn seed_universe(conn: &Connection) -> UniverseId {
    let repo = SqliteUniverseRepository::try_new(conn).unwrap();
    if repo.get_time_unit("ticks").unwrap().is_none() {
        repo.create_time_unit(&TimeUnit::new("ticks")).unwrap();
    }
    repo.create_universe(&Universe::new("ticks")).unwrap()
}

fn universe_with_fixed_id(id: &str) -> Universe {
    Universe::with_id(Uuid::parse_str(id).unwrap(), "seconds")
}

fn insert_raw_sample(conn: &Connection, coverage: Uuid) {
    conn.execute(
        r#"INSERT INTO samples (uuid, coverage_uuid, timestamp, geometry, properties)
           VALUES (?1, ?2, 1,
                   '{"type":"point","coordinates":{"x":0.0,"y":0.0,"z":0.0}}',
                   '{"speed":1.0}');"#,
        params![Uuid::new_v4().to_string(), coverage.to_string()],
    )
    .unwrap();
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}
