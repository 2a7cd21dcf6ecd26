use serde_json::json;
use tracemap_core::{
    build_trajectory, Geometry, GeometryError, MaterializeError, ParentRef, Point3, PropertyMap,
    RasterBand, RasterTile, Sample, TrajectoryPoint,
};
use uuid::Uuid;

fn parent() -> ParentRef {
    ParentRef::Thing(Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap())
}

fn speed_props() -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert("speed".to_string(), json!(1.0));
    map
}

fn point_sample(timestamp: i64, x: f64, y: f64, z: f64) -> Sample {
    Sample::vector(parent(), timestamp, Geometry::point(x, y, z), speed_props())
}

#[test]
fn empty_sample_set_yields_no_trajectory() {
    assert_eq!(build_trajectory(&[]), Ok(None));
}

#[test]
fn single_point_sample_yields_its_own_center() {
    let trajectory = build_trajectory(&[point_sample(7, 1.0, 2.0, 3.0)]).unwrap().unwrap();
    assert_eq!(trajectory.points, vec![TrajectoryPoint { x: 1.0, y: 2.0, z: 3.0, t: 7 }]);
}

#[test]
fn points_are_ordered_by_tick_not_by_input_order() {
    let samples = vec![
        point_sample(30, 3.0, 0.0, 0.0),
        point_sample(10, 1.0, 0.0, 0.0),
        point_sample(20, 2.0, 0.0, 0.0),
    ];
    let trajectory = build_trajectory(&samples).unwrap().unwrap();
    let ticks: Vec<i64> = trajectory.points.iter().map(|p| p.t).collect();
    assert_eq!(ticks, vec![10, 20, 30]);
    let xs: Vec<f64> = trajectory.points.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0]);
}

#[test]
fn polygon_sample_contributes_its_bounding_box_center() {
    let ring = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(4.0, 2.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(0.0, 0.0, 0.0),
    ];
    let sample = Sample::vector(parent(), 5, Geometry::Polygon(ring), speed_props());
    let trajectory = build_trajectory(&[sample]).unwrap().unwrap();
    assert_eq!(trajectory.points, vec![TrajectoryPoint { x: 2.0, y: 1.0, z: 0.0, t: 5 }]);
}

#[test]
fn raster_sample_contributes_its_footprint_center() {
    let tile = RasterTile::new(
        Point3::new(100.0, 200.0, 5.0),
        0.5,
        -0.5,
        10,
        20,
        vec![RasterBand::mask()],
    );
    let sample = Sample::extent(parent(), 12, tile);
    let trajectory = build_trajectory(&[sample]).unwrap().unwrap();
    assert_eq!(trajectory.points, vec![TrajectoryPoint { x: 102.5, y: 195.0, z: 5.0, t: 12 }]);
}

#[test]
fn empty_geometry_fails_with_the_offending_sample() {
    let sample = Sample::vector(parent(), 1, Geometry::LineString(Vec::new()), speed_props());
    let uuid = sample.uuid;
    assert_eq!(
        build_trajectory(&[sample]),
        Err(MaterializeError::Envelope { sample: uuid, source: GeometryError::Empty })
    );
}

#[test]
fn non_finite_ordinate_fails_the_whole_build() {
    let good = point_sample(1, 0.0, 0.0, 0.0);
    let bad = point_sample(2, f64::NAN, 0.0, 0.0);
    let uuid = bad.uuid;
    assert_eq!(
        build_trajectory(&[good, bad]),
        Err(MaterializeError::Envelope { sample: uuid, source: GeometryError::NonFinite })
    );
}

#[test]
fn payloadless_row_is_reported_as_such() {
    let sample = Sample::new(parent(), 1);
    let uuid = sample.uuid;
    assert_eq!(
        build_trajectory(&[sample]),
        Err(MaterializeError::PayloadMissing { sample: uuid })
    );
}

#[test]
fn same_sample_set_always_yields_the_same_trajectory() {
    let samples = vec![
        point_sample(20, 2.0, 2.0, 2.0),
        point_sample(10, 1.0, 1.0, 1.0),
    ];
    let mut reversed = samples.clone();
    reversed.reverse();
    assert_eq!(build_trajectory(&samples), build_trajectory(&reversed));
}
