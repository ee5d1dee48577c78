//! Shared fixtures for integration tests
//!
//! Builders for small assemblies of unit blocks. Every part uses the `block`
//! definition: 1 kg, center of mass at the part origin, isotropic inertia.

#![allow(dead_code)]

use nalgebra::{Isometry3, Matrix3, Point3, Translation3};
use urdfsynth::{
    AssemblyDefinition, AssemblyDescription, InstanceRecord, MassProperties, MateRecord, MateType,
    MatedEntity, PartDefinition,
};

/// Mass properties of the `block` part
pub fn unit_mass() -> MassProperties {
    MassProperties::new(1.0, Point3::origin(), Matrix3::identity() * 0.01)
}

/// The shared `block` part definition
pub fn block() -> PartDefinition {
    PartDefinition::new("block")
        .with_geometry("geom/block")
        .with_mass_properties(unit_mass())
}

/// Pure translation
pub fn at(x: f64, y: f64, z: f64) -> Isometry3<f64> {
    Translation3::new(x, y, z).into()
}

/// A block part instance at a position; the id is the lowercase name
pub fn part(name: &str, position: [f64; 3]) -> InstanceRecord {
    InstanceRecord::part(name.to_lowercase(), name, "block")
        .with_transform(at(position[0], position[1], position[2]))
}

/// A mate with identity connectors
pub fn mate(id: &str, kind: MateType, a: &[&str], b: &[&str]) -> MateRecord {
    mate_at(id, kind, a, Isometry3::identity(), b, Isometry3::identity())
}

/// A mate with explicit connectors
pub fn mate_at(
    id: &str,
    kind: MateType,
    a: &[&str],
    connector_a: Isometry3<f64>,
    b: &[&str],
    connector_b: Isometry3<f64>,
) -> MateRecord {
    MateRecord::new(
        id,
        kind,
        MatedEntity::new(a.iter().copied(), connector_a),
        MatedEntity::new(b.iter().copied(), connector_b),
    )
}

/// A single-level assembly of blocks
pub fn flat_assembly(
    name: &str,
    parts: &[(&str, [f64; 3])],
    mates: Vec<MateRecord>,
) -> AssemblyDescription {
    let mut root = AssemblyDefinition::new("root");
    for (part_name, position) in parts {
        root = root.with_instance(part(part_name, *position));
    }
    for m in mates {
        root = root.with_mate(m);
    }
    AssemblyDescription::new(name, root).with_part(block())
}

/// Install a test subscriber so `RUST_LOG` shows pipeline logs
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
