//! End-to-end scenarios for kinematic tree synthesis

mod common;

use approx::assert_relative_eq;
use common::{at, flat_assembly, init_tracing, mate, mate_at};
use nalgebra::Vector3;
use std::collections::HashSet;
use urdfsynth::{
    BuildOptions, Error, ErrorKind, JointKind, MateType, Warning, build_kinematic_tree,
    parse_urdf_str, serialize_tree,
};

/// A at the origin, B at +x, C at +y; B-C closes a loop
fn triangle() -> urdfsynth::AssemblyDescription {
    flat_assembly(
        "triangle",
        &[("A", [0.0, 0.0, 0.0]), ("B", [1.0, 0.0, 0.0]), ("C", [0.0, 1.0, 0.0])],
        vec![
            mate_at(
                "m1",
                MateType::Revolute,
                &["a"],
                at(0.5, 0.0, 0.0),
                &["b"],
                at(-0.5, 0.0, 0.0),
            )
            .with_limits(-1.0, 1.0),
            mate("m2", MateType::Fixed, &["a"], &["c"]),
            mate("m3", MateType::Revolute, &["b"], &["c"]),
        ],
    )
}

#[test]
fn test_redundant_loop_is_reported_not_exported() {
    init_tracing();
    let (tree, report) = build_kinematic_tree(&triangle(), &BuildOptions::new()).unwrap();

    assert_eq!(tree.root().unwrap().name, "A");
    assert_eq!(tree.nodes.len(), 3);
    assert_eq!(tree.governing_edge_count(), 2);

    let robot = &tree.robot;
    assert_eq!(robot.joints.len(), 2);
    let m1 = robot.joint("m1").unwrap();
    assert_eq!((m1.parent.as_str(), m1.child.as_str()), ("A", "B"));
    assert_eq!(m1.kind, JointKind::Revolute);
    let m2 = robot.joint("m2").unwrap();
    assert_eq!((m2.parent.as_str(), m2.child.as_str()), ("A", "C"));
    assert_eq!(m2.kind, JointKind::Fixed);
    assert!(robot.joint("m3").is_none());

    assert_eq!(report.redundant_edges.len(), 1);
    let edge = &report.redundant_edges[0];
    assert_eq!(edge.mate_id, "m3");
    assert_eq!(edge.discovery_index, 2);
    assert_eq!(edge.nodes, ["B".to_string(), "C".to_string()]);
    assert!(report.is_redundant("m3"));
}

#[test]
fn test_joint_origin_is_parent_connector() {
    let (tree, _) = build_kinematic_tree(&triangle(), &BuildOptions::new()).unwrap();
    let m1 = tree.robot.joint("m1").unwrap();
    assert_relative_eq!(m1.origin.translation.vector, Vector3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
    assert_eq!(m1.axis, Vector3::z());

    // B's link frame sits on the mate connector, so its geometry is offset back to B
    let b = tree.robot.link("B").unwrap();
    assert_relative_eq!(
        b.visuals[0].origin.translation.vector,
        Vector3::new(0.5, 0.0, 0.0),
        epsilon = 1e-12
    );
    assert_relative_eq!(
        b.inertial.as_ref().unwrap().center_of_mass.coords,
        Vector3::new(0.5, 0.0, 0.0),
        epsilon = 1e-12
    );
}

#[test]
fn test_output_is_deterministic() {
    let first = build_kinematic_tree(&triangle(), &BuildOptions::new()).unwrap();
    let second = build_kinematic_tree(&triangle(), &BuildOptions::new()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cylindrical_mate_gets_synthetic_link() {
    let description = flat_assembly(
        "piston",
        &[("A", [0.0, 0.0, 0.0]), ("B", [0.0, 0.0, 1.0])],
        vec![
            mate("m1", MateType::Cylindrical, &["a"], &["b"])
                .with_name("Bore")
                .with_limits(-3.0, 3.0)
                .with_secondary_limits(0.0, 0.1),
        ],
    );
    let (tree, report) = build_kinematic_tree(&description, &BuildOptions::new()).unwrap();
    assert!(report.is_empty());

    let robot = &tree.robot;
    assert_eq!(robot.links.len(), 3);
    assert_eq!(robot.joints.len(), 2);
    assert_eq!(tree.nodes.len(), 2);

    let synthetic: Vec<_> = robot.links.iter().filter(|l| l.synthetic).collect();
    assert_eq!(synthetic.len(), 1);
    assert_eq!(synthetic[0].name, "mate_m1_intermediate");
    assert!(synthetic[0].inertial.as_ref().unwrap().is_zero());

    let rotation = &robot.joints[0];
    let translation = &robot.joints[1];
    assert_eq!(rotation.name, "Bore_revolute");
    assert_eq!(rotation.kind, JointKind::Revolute);
    assert_eq!(rotation.child, "mate_m1_intermediate");
    assert_eq!(translation.name, "Bore_prismatic");
    assert_eq!(translation.kind, JointKind::Prismatic);
    assert_eq!(translation.parent, "mate_m1_intermediate");
    assert_eq!(translation.child, "B");
    assert_eq!(translation.limits.unwrap().upper, 0.1);

    let edge = tree.node("B").unwrap().parent.as_ref().unwrap();
    assert_eq!(edge.joints, vec!["Bore_revolute", "Bore_prismatic"]);
    assert_eq!(edge.synthetic_links, vec!["mate_m1_intermediate"]);
}

#[test]
fn test_synthetic_links_stay_unique_for_similar_mate_ids() {
    // "m.1" and "m1" sanitize to the same synthetic link name
    let description = flat_assembly(
        "telescope",
        &[("A", [0.0, 0.0, 0.0]), ("B", [0.0, 0.0, 1.0]), ("C", [0.0, 0.0, 2.0])],
        vec![
            mate("m.1", MateType::Cylindrical, &["a"], &["b"]),
            mate("m1", MateType::Cylindrical, &["b"], &["c"]),
        ],
    );
    let options = BuildOptions::new().with_root("A");
    let (tree, _) = build_kinematic_tree(&description, &options).unwrap();

    let synthetic: Vec<&str> = tree
        .robot
        .links
        .iter()
        .filter(|l| l.synthetic)
        .map(|l| l.name.as_str())
        .collect();
    assert_eq!(synthetic, vec!["mate_m1_intermediate", "mate_m1_intermediate_2"]);
    let joint_names: HashSet<&str> = tree.robot.joints.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(joint_names.len(), 4);

    let reparsed = parse_urdf_str(&serialize_tree(&tree).unwrap()).unwrap();
    assert_eq!(reparsed.links.len(), 5);
}

#[test]
fn test_synthetic_link_yields_to_part_name() {
    let description = flat_assembly(
        "clash",
        &[("A", [0.0, 0.0, 0.0]), ("mate_m1_intermediate", [0.0, 0.0, 1.0])],
        vec![
            mate("m1", MateType::Cylindrical, &["a"], &["mate_m1_intermediate"])
                .with_secondary_limits(0.0, 0.5),
        ],
    );
    let options = BuildOptions::new().with_root("A");
    let (tree, _) = build_kinematic_tree(&description, &options).unwrap();
    let edge = tree.node("mate_m1_intermediate").unwrap().parent.as_ref().unwrap();
    assert_eq!(edge.synthetic_links, vec!["mate_m1_intermediate_2"]);
}

#[test]
fn test_unbounded_translation_gets_default_travel() {
    let description = flat_assembly(
        "rail",
        &[("A", [0.0, 0.0, 0.0]), ("B", [1.0, 0.0, 0.0]), ("C", [0.0, 1.0, 0.0])],
        vec![
            mate("m1", MateType::Slider, &["a"], &["b"]),
            mate("m2", MateType::Planar, &["a"], &["c"]),
        ],
    );
    let options = BuildOptions::new().with_root("A").with_default_travel(-0.2, 0.3);
    let (tree, report) = build_kinematic_tree(&description, &options).unwrap();

    let prismatic: Vec<_> = tree
        .robot
        .joints
        .iter()
        .filter(|j| j.kind == JointKind::Prismatic)
        .collect();
    assert_eq!(prismatic.len(), 3);
    for joint in &prismatic {
        let limits = joint.limits.unwrap();
        assert_eq!((limits.lower, limits.upper), (-0.2, 0.3));
    }
    assert_eq!(
        report.warnings[0],
        Warning::DefaultTravel {
            mate_id: "m1".to_string(),
            joint: "m1".to_string()
        }
    );
    assert_eq!(report.warnings.len(), 3);

    let xml = serialize_tree(&tree).unwrap();
    assert_eq!(xml.matches("type=\"prismatic\"").count(), 3);
    assert_eq!(xml.matches("<limit lower=\"-0.2\" upper=\"0.3\"").count(), 3);
}

#[test]
fn test_planar_mate_decomposes_into_two_translations() {
    let description = flat_assembly(
        "table",
        &[("A", [0.0, 0.0, 0.0]), ("B", [0.0, 0.0, 1.0])],
        vec![mate("m1", MateType::Planar, &["a"], &["b"])],
    );
    let (tree, _) = build_kinematic_tree(&description, &BuildOptions::new()).unwrap();
    let axes: Vec<_> = tree.robot.joints.iter().map(|j| j.axis).collect();
    assert_eq!(axes, vec![Vector3::x(), Vector3::y()]);
    assert!(tree.robot.joints.iter().all(|j| j.kind == JointKind::Prismatic));
    assert_eq!(tree.robot.links.len(), 3);
}

#[test]
fn test_ball_mate_requires_opt_in() {
    let description = flat_assembly(
        "shoulder",
        &[("A", [0.0, 0.0, 0.0]), ("B", [1.0, 0.0, 0.0])],
        vec![mate("m1", MateType::Ball, &["a"], &["b"])],
    );

    let err = build_kinematic_tree(&description, &BuildOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedJoint);
    assert!(matches!(err, Error::UnsupportedJoint { ref mate_id, .. } if mate_id == "m1"));

    let options = BuildOptions::new().with_ball_as_fixed(true);
    let (tree, report) = build_kinematic_tree(&description, &options).unwrap();
    assert_eq!(tree.robot.joints.len(), 1);
    assert_eq!(tree.robot.joints[0].kind, JointKind::Fixed);
    assert_eq!(
        report.warnings,
        vec![Warning::BallApproximatedAsFixed {
            mate_id: "m1".to_string()
        }]
    );
}

#[test]
fn test_redundant_ball_mate_is_not_an_error() {
    let description = flat_assembly(
        "loop",
        &[("A", [0.0, 0.0, 0.0]), ("B", [1.0, 0.0, 0.0]), ("C", [0.0, 1.0, 0.0])],
        vec![
            mate("m1", MateType::Revolute, &["a"], &["b"]),
            mate("m2", MateType::Revolute, &["a"], &["c"]),
            mate("m3", MateType::Ball, &["b"], &["c"]),
        ],
    );
    let (_, report) = build_kinematic_tree(&description, &BuildOptions::new()).unwrap();
    assert!(report.is_redundant("m3"));
    assert!(report.warnings.is_empty());
}

#[test]
fn test_disconnected_clusters_fail() {
    let description = flat_assembly(
        "split",
        &[
            ("A", [0.0, 0.0, 0.0]),
            ("B", [1.0, 0.0, 0.0]),
            ("C", [5.0, 0.0, 0.0]),
            ("D", [6.0, 0.0, 0.0]),
        ],
        vec![
            mate("m1", MateType::Revolute, &["a"], &["b"]),
            mate("m2", MateType::Fixed, &["c"], &["d"]),
        ],
    );
    let err = build_kinematic_tree(&description, &BuildOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    match err {
        Error::DisconnectedGraph { root, unreachable } => {
            assert_eq!(root, "A");
            assert_eq!(unreachable, vec!["C", "D"]);
        }
        other => panic!("expected a disconnected graph error, got {other}"),
    }
}

#[test]
fn test_root_override_and_reversed_limits() {
    let description = flat_assembly(
        "arm",
        &[("A", [0.0, 0.0, 0.0]), ("B", [1.0, 0.0, 0.0])],
        vec![mate("m1", MateType::Revolute, &["a"], &["b"]).with_limits(0.0, 1.0)],
    );
    let options = BuildOptions::new().with_root("B");
    let (tree, _) = build_kinematic_tree(&description, &options).unwrap();

    assert_eq!(tree.root().unwrap().name, "B");
    let joint = &tree.robot.joints[0];
    assert_eq!((joint.parent.as_str(), joint.child.as_str()), ("B", "A"));
    let limits = joint.limits.unwrap();
    assert_eq!((limits.lower, limits.upper), (-1.0, 0.0));
    assert!(tree.node("A").unwrap().parent.as_ref().unwrap().reversed);

    let err = build_kinematic_tree(&description, &BuildOptions::new().with_root("Z")).unwrap_err();
    assert!(matches!(err, Error::MissingRoot(ref name) if name == "Z"));
}

#[test]
fn test_unbounded_revolute_is_continuous() {
    let description = flat_assembly(
        "wheel",
        &[("Chassis", [0.0, 0.0, 0.0]), ("Wheel", [1.0, 0.0, 0.0])],
        vec![mate("axle", MateType::Revolute, &["chassis"], &["wheel"])],
    );
    let (tree, _) = build_kinematic_tree(&description, &BuildOptions::new()).unwrap();
    assert_eq!(tree.robot.joints[0].kind, JointKind::Continuous);
    assert!(tree.robot.joints[0].limits.is_none());
}

#[test]
fn test_missing_mass_is_fatal() {
    let mut description = triangle();
    description.parts.get_mut("block").unwrap().mass_properties = None;
    let err = build_kinematic_tree(&description, &BuildOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MassProperty);
    assert!(err.to_string().contains("[E3001]"));
}
