//! Serialization round trips and frame consistency

mod common;

use approx::assert_relative_eq;
use common::{at, flat_assembly, mate, mate_at};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use std::collections::BTreeSet;
use std::f64::consts::FRAC_PI_2;
use urdfsynth::transform::frames_close;
use urdfsynth::{
    BuildOptions, KinematicTree, MateType, RobotDescription, build_kinematic_tree, parse_urdf_str,
    serialize_tree,
};

/// A rotated chain ending in a cylindrical mate
fn mechanism() -> urdfsynth::AssemblyDescription {
    let turned = Isometry3::from_parts(
        Translation3::new(0.0, 0.0, 0.3),
        UnitQuaternion::from_euler_angles(FRAC_PI_2, 0.0, 0.0),
    );
    flat_assembly(
        "mechanism",
        &[
            ("Base", [0.0, 0.0, 0.0]),
            ("Turret", [0.0, 0.0, 0.5]),
            ("Boom", [0.0, 0.2, 0.8]),
            ("Tool", [0.0, 0.6, 0.8]),
            ("Sensor", [0.0, 0.6, 1.1]),
        ],
        vec![
            mate_at(
                "yaw",
                MateType::Revolute,
                &["base"],
                at(0.0, 0.0, 0.5),
                &["turret"],
                Isometry3::identity(),
            ),
            mate_at("pitch", MateType::Revolute, &["turret"], turned, &["boom"], Isometry3::identity())
                .with_limits(-0.5, 1.2),
            mate("extend", MateType::Slider, &["boom"], &["tool"]).with_limits(0.0, 0.4),
            mate("spin", MateType::Cylindrical, &["tool"], &["sensor"]),
        ],
    )
}

fn edges(robot: &RobotDescription) -> BTreeSet<(String, String, String)> {
    robot
        .joints
        .iter()
        .map(|j| (j.parent.clone(), j.child.clone(), j.kind.to_string()))
        .collect()
}

fn build() -> KinematicTree {
    let options = BuildOptions::new().with_root("Base");
    build_kinematic_tree(&mechanism(), &options).unwrap().0
}

#[test]
fn test_serialize_then_parse_is_isomorphic() {
    let tree = build();
    let xml = serialize_tree(&tree).unwrap();
    let parsed = parse_urdf_str(&xml).unwrap();

    assert_eq!(parsed.name, tree.robot.name);
    let names = |r: &RobotDescription| r.links.iter().map(|l| l.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&parsed), names(&tree.robot));
    assert_eq!(edges(&parsed), edges(&tree.robot));

    for (original, reread) in tree.robot.joints.iter().zip(&parsed.joints) {
        assert_eq!(original.name, reread.name);
        assert_eq!(original.limits, reread.limits);
        assert!(frames_close(&original.origin, &reread.origin, 1e-12));
        if original.kind.is_movable() {
            assert_relative_eq!(original.axis, reread.axis);
        }
    }
    for (original, reread) in tree.robot.links.iter().zip(&parsed.links) {
        match (&original.inertial, &reread.inertial) {
            (Some(a), Some(b)) => {
                assert_relative_eq!(a.mass, b.mass);
                assert_relative_eq!(a.center_of_mass, b.center_of_mass, epsilon = 1e-12);
                assert_relative_eq!(a.inertia, b.inertia, epsilon = 1e-12);
            }
            (a, b) => assert_eq!(a.is_some(), b.is_some()),
        }
        assert_eq!(original.visuals.len(), reread.visuals.len());
    }
}

#[test]
fn test_frames_reproduce_world_poses() {
    let description = mechanism();
    let anchor = Isometry3::from_parts(
        Translation3::new(1.0, -2.0, 0.25),
        UnitQuaternion::from_euler_angles(0.0, 0.0, 0.7),
    );
    let options = BuildOptions::new().with_root("Base").with_world_anchor(anchor);
    let (tree, _) = build_kinematic_tree(&description, &options).unwrap();

    for part in &description.root.instances {
        let link = tree
            .robot
            .links
            .iter()
            .find(|l| l.visuals.iter().any(|v| v.name == part.name))
            .unwrap();
        let visual = link.visuals.iter().find(|v| v.name == part.name).unwrap();
        let pose = anchor * tree.robot.link_pose(&link.name).unwrap() * visual.origin;
        assert!(
            frames_close(&pose, &part.transform, 1e-9),
            "{} placed at {:?}, expected {:?}",
            part.name,
            pose.translation,
            part.transform.translation
        );
    }
}

#[test]
fn test_chain_structure() {
    let tree = build();
    let robot = &tree.robot;
    assert_eq!(robot.links.len(), 6);
    assert_eq!(robot.links.last().unwrap().name, "mate_spin_intermediate");
    let kinds: Vec<String> = robot.joints.iter().map(|j| j.kind.to_string()).collect();
    assert_eq!(
        kinds,
        vec!["continuous", "revolute", "prismatic", "continuous", "prismatic"]
    );

    let pitch = robot.joint("pitch").unwrap();
    assert_relative_eq!(pitch.axis, Vector3::z());
    assert_relative_eq!(pitch.origin.rotation.angle(), FRAC_PI_2, epsilon = 1e-12);
    assert_relative_eq!(
        pitch.origin.translation.vector,
        Vector3::new(0.0, 0.0, 0.3),
        epsilon = 1e-12
    );
}

#[test]
fn test_write_to_file() {
    let tree = build();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mechanism.urdf");
    tree.robot.write_to_file(&path).unwrap();

    let xml = std::fs::read_to_string(&path).unwrap();
    assert_eq!(xml, tree.robot.to_urdf_string().unwrap());
    let parsed = RobotDescription::from_urdf_str(&xml).unwrap();
    assert_eq!(edges(&parsed), edges(&tree.robot));
}
