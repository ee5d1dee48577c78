//! Rigid subassembly merging across nesting levels

mod common;

use approx::assert_relative_eq;
use common::{at, block, mate, part};
use nalgebra::{Point3, Vector3};
use urdfsynth::flatten::flatten;
use urdfsynth::rigid::detect_rigid_groups;
use urdfsynth::{
    AssemblyDefinition, AssemblyDescription, BuildOptions, InstanceRecord, MateType, Warning,
    build_kinematic_tree,
};

/// Base, plus a movable leg holding a rigid foot
///
/// ```text
/// root:  Base, Leg(at z=1)             Base -rev- Leg/Hip
/// leg:   Hip, Foot(at z=0.5)           Hip -rev- Foot/Toe
/// foot:  Toe, Heel(at x=0.2)           Toe -fixed- Heel
/// ```
fn walker() -> AssemblyDescription {
    let foot = AssemblyDefinition::new("foot")
        .with_instance(part("Toe", [0.0, 0.0, 0.0]))
        .with_instance(part("Heel", [0.2, 0.0, 0.0]))
        .with_mate(mate("f1", MateType::Fixed, &["toe"], &["heel"]));
    let leg = AssemblyDefinition::new("leg")
        .with_instance(part("Hip", [0.0, 0.0, 0.0]))
        .with_instance(InstanceRecord::assembly("foot", "Foot", "foot").with_transform(at(0.0, 0.0, 0.5)))
        .with_mate(mate("knee", MateType::Revolute, &["hip"], &["foot", "toe"]));
    let root = AssemblyDefinition::new("root")
        .with_instance(part("Base", [0.0, 0.0, 0.0]))
        .with_instance(InstanceRecord::assembly("leg", "Leg", "leg").with_transform(at(0.0, 0.0, 1.0)))
        .with_mate(mate("hip", MateType::Revolute, &["base"], &["leg", "hip"]));
    AssemblyDescription::new("walker", root)
        .with_subassembly(leg)
        .with_subassembly(foot)
        .with_part(block())
}

#[test]
fn test_rigid_pocket_inside_movable_subassembly() {
    let description = walker();
    let flat = flatten(&description, usize::MAX).unwrap();
    let groups = detect_rigid_groups(&description, &flat).unwrap();

    let names: Vec<&str> = groups.groups().iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Base", "Hip", "Foot"]);

    let foot = groups.group(groups.find("Foot").unwrap());
    assert_eq!(foot.members.len(), 2);
    assert_relative_eq!(foot.mass_properties.mass, 2.0);
    assert_relative_eq!(
        foot.mass_properties.center_of_mass,
        Point3::new(0.1, 0.0, 0.0),
        epsilon = 1e-12
    );
    // Leg is a container, not a body
    let leg = flat.find_by_name("Leg").unwrap();
    assert_eq!(groups.group_of(leg), None);
}

#[test]
fn test_merged_link_keeps_world_center_of_mass() {
    let (tree, report) = build_kinematic_tree(&walker(), &BuildOptions::new()).unwrap();
    assert!(report.is_empty());

    // Hip carries both movable mates, so it is the most connected body
    assert_eq!(tree.root().unwrap().name, "Hip");
    let robot = &tree.robot;
    let link_names: Vec<&str> = robot.links.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(link_names, vec!["Hip", "Base", "Foot"]);
    assert_eq!(robot.joints.len(), 2);

    let foot = robot.link("Foot").unwrap();
    assert_eq!(foot.visuals.len(), 2);
    let inertial = foot.inertial.as_ref().unwrap();
    assert_relative_eq!(inertial.mass, 2.0);

    let pose = robot.link_pose("Foot").unwrap();
    let world_com = pose.transform_point(&inertial.center_of_mass);
    assert_relative_eq!(world_com.coords, Vector3::new(0.1, 0.0, 1.5), epsilon = 1e-12);

    // Parallel-axis term from the 0.1 m offsets along x
    let expected_iyy = 2.0 * 0.01 + 2.0 * 0.1 * 0.1;
    assert_relative_eq!(inertial.inertia[(1, 1)], expected_iyy, epsilon = 1e-12);
    assert_relative_eq!(inertial.inertia[(0, 0)], 0.02, epsilon = 1e-12);
}

#[test]
fn test_rigid_inside_rigid_merges_at_outermost() {
    let inner = AssemblyDefinition::new("inner")
        .with_instance(part("Pin", [0.0, 0.0, 0.0]))
        .with_instance(part("Cap", [0.0, 0.0, 0.1]))
        .with_mate(mate("i1", MateType::Fixed, &["pin"], &["cap"]));
    let outer = AssemblyDefinition::new("outer")
        .with_instance(part("Plate", [0.0, 0.0, 0.0]))
        .with_instance(InstanceRecord::assembly("inner", "Inner", "inner"))
        .with_mate(mate("o1", MateType::Fixed, &["plate"], &["inner", "pin"]));
    let root = AssemblyDefinition::new("root")
        .with_instance(part("Frame", [0.0, 0.0, 0.0]))
        .with_instance(InstanceRecord::assembly("outer", "Outer", "outer"))
        .with_mate(mate("r1", MateType::Revolute, &["frame"], &["outer", "inner", "cap"]))
        // Both ends land in the merged Outer body
        .with_mate(mate("r2", MateType::Slider, &["outer", "plate"], &["outer", "inner", "cap"]));
    let description = AssemblyDescription::new("nested", root)
        .with_subassembly(outer)
        .with_subassembly(inner)
        .with_part(block());

    let flat = flatten(&description, usize::MAX).unwrap();
    let groups = detect_rigid_groups(&description, &flat).unwrap();
    assert_eq!(groups.len(), 2);
    let outer = groups.group(groups.find("Outer").unwrap());
    assert_eq!(outer.members.len(), 3);
    assert_eq!(groups.find_by_member_name(&flat, "Cap"), Some(outer.id));

    let (tree, report) = build_kinematic_tree(&description, &BuildOptions::new()).unwrap();
    assert_eq!(tree.robot.links.len(), 2);
    assert_eq!(tree.robot.joints[0].child, "Outer");
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        Warning::InternalMate { mate_id, mate_type: MateType::Slider, .. } if mate_id == "r2"
    )));
}

#[test]
fn test_depth_bound_makes_subassembly_opaque() {
    let mut description = walker();
    let leg_mass = urdfsynth::MassProperties::new(
        3.0,
        Point3::new(0.0, 0.0, 0.2),
        nalgebra::Matrix3::identity() * 0.05,
    );
    description
        .subassemblies
        .get_mut("leg")
        .unwrap()
        .mass_properties = Some(leg_mass);

    let options = BuildOptions::new().with_max_depth(0);
    let (tree, _) = build_kinematic_tree(&description, &options).unwrap();

    // Leg's inner structure (Hip, Foot) is not expanded
    let link_names: Vec<&str> = tree.robot.links.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(link_names, vec!["Base", "Leg"]);
    assert_relative_eq!(tree.robot.link("Leg").unwrap().inertial.as_ref().unwrap().mass, 3.0);
}
