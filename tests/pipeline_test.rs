//! Full conversion with injected collaborators

mod common;

use common::{at, flat_assembly, init_tracing, mate_at, unit_mass};
use nalgebra::Isometry3;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use urdfsynth::fetch::BoxError;
use urdfsynth::{
    AssemblyDescription, BuildOptions, ErrorKind, GeometryRef, MassProperties, MateType,
    PartDefinition, convert,
};

/// A chassis with three wheels, all the same block; no mass data attached
///
/// Each wheel mate's chassis-side connector sits at the wheel origin.
fn description() -> AssemblyDescription {
    let wheel = |id: &str, x: f64, y: f64| {
        let target = format!("wheel {}", &id[1..]);
        mate_at(
            id,
            MateType::Revolute,
            &["chassis"],
            at(x, y, 0.0),
            &[target.as_str()],
            Isometry3::identity(),
        )
    };
    let mut description = flat_assembly(
        "cart",
        &[
            ("Chassis", [0.0, 0.0, 0.0]),
            ("Wheel 1", [1.0, 1.0, 0.0]),
            ("Wheel 2", [1.0, -1.0, 0.0]),
            ("Wheel 3", [-1.0, 1.0, 0.0]),
        ],
        vec![wheel("w1", 1.0, 1.0), wheel("w2", 1.0, -1.0), wheel("w3", -1.0, 1.0)],
    );
    description.parts.insert(
        "block".to_string(),
        PartDefinition::new("block").with_geometry("geom/block"),
    );
    description
}

fn assemblies(document: &str) -> Result<AssemblyDescription, BoxError> {
    match document {
        "doc/cart" => Ok(description()),
        other => Err(format!("unknown document {}", other).into()),
    }
}

#[test]
fn test_convert_fetches_each_geometry_once() {
    init_tracing();
    let mass_requests = AtomicUsize::new(0);
    let masses = |geometry: &GeometryRef| -> Result<MassProperties, BoxError> {
        assert_eq!(geometry.as_str(), "geom/block");
        mass_requests.fetch_add(1, Ordering::SeqCst);
        Ok(unit_mass())
    };
    let exports: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let meshes = |geometry: &GeometryRef, frame: &Isometry3<f64>| -> Result<String, BoxError> {
        let mut exports = exports.lock().unwrap();
        exports.push(format!("{} {:?}", geometry, frame.translation.vector.as_slice()));
        Ok(format!("meshes/part_{}.stl", exports.len()))
    };

    let (tree, report) = convert(
        "doc/cart",
        &assemblies,
        &masses,
        &meshes,
        &BuildOptions::new(),
    )
    .unwrap();

    assert!(report.is_empty());
    assert_eq!(mass_requests.load(Ordering::SeqCst), 1);
    assert_eq!(tree.root().unwrap().name, "Chassis");
    assert_eq!(tree.robot.links.len(), 4);

    // Every body sits at its link origin, so all links share one export
    let exports = exports.into_inner().unwrap();
    assert_eq!(exports.len(), 1);

    let files: HashMap<&str, &str> = tree
        .robot
        .links
        .iter()
        .map(|l| (l.name.as_str(), l.visuals[0].filename()))
        .collect();
    assert_eq!(files.len(), 4);
    assert!(files.values().all(|f| *f == "meshes/part_1.stl"));
    assert!(
        tree.robot
            .links
            .iter()
            .flat_map(|l| &l.visuals)
            .all(|v| v.origin == Isometry3::identity())
    );

    let xml = urdfsynth::serialize_tree(&tree).unwrap();
    assert!(xml.contains("<mesh filename=\"meshes/part_1.stl\"/>"));
}

#[test]
fn test_fetch_failures_abort_the_run() {
    let masses = |geometry: &GeometryRef| -> Result<MassProperties, BoxError> {
        Err(format!("service unavailable for {}", geometry).into())
    };
    let meshes = |_: &GeometryRef, _: &Isometry3<f64>| -> Result<String, BoxError> {
        panic!("meshes are exported only after a successful build")
    };

    let err = convert("doc/cart", &assemblies, &masses, &meshes, &BuildOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("geom/block"));
    assert!(err.to_string().contains("service unavailable"));

    let err = convert("doc/missing", &assemblies, &masses, &meshes, &BuildOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("doc/missing"));
}

#[test]
fn test_invalid_fetched_mass_is_rejected() {
    let masses = |_: &GeometryRef| -> Result<MassProperties, BoxError> {
        let mut props = unit_mass();
        props.mass = -1.0;
        Ok(props)
    };
    let meshes = |_: &GeometryRef, _: &Isometry3<f64>| -> Result<String, BoxError> {
        Ok("unused.stl".to_string())
    };
    let err = convert("doc/cart", &assemblies, &masses, &meshes, &BuildOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MassProperty);
    assert!(err.to_string().contains("Chassis"));
}
