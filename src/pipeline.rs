//! Pipeline entry points
//!
//! [`build_kinematic_tree`] runs the order-sensitive synthesis stages on a
//! snapshot that already carries its mass data. [`convert`] wraps it with the
//! injected collaborators: fetch the assembly, hydrate mass properties in
//! parallel, build, then export meshes.

use tracing::info;

use crate::compose::compose;
use crate::error::Result;
use crate::fetch::{
    AssemblySource, MassPropertySource, MeshExporter, attach_meshes, hydrate_mass_properties,
};
use crate::flatten::{FlatAssembly, flatten, sanitize_name};
use crate::graph::{AssemblyGraph, extract_spanning_tree, select_root};
use crate::mates::extract_mates;
use crate::model::{AssemblyDescription, BuildOptions};
use crate::report::DiscardReport;
use crate::rigid::detect_rigid_groups;
use crate::tree::KinematicTree;
use crate::validator::validate_tree;
use crate::writer::robot_to_string;

/// Synthesize a kinematic tree from an assembly description
///
/// Every body must already carry mass properties; use [`convert`] to fetch
/// them from a [`MassPropertySource`].
///
/// # Example
///
/// ```
/// use nalgebra::{Matrix3, Point3};
/// use urdfsynth::{
///     AssemblyDefinition, AssemblyDescription, BuildOptions, InstanceRecord, MassProperties,
///     MateRecord, MateType, MatedEntity, PartDefinition, build_kinematic_tree,
/// };
///
/// # fn main() -> urdfsynth::Result<()> {
/// let mass = MassProperties::new(1.0, Point3::origin(), Matrix3::identity() * 0.01);
/// let root = AssemblyDefinition::new("root")
///     .with_instance(InstanceRecord::part("a", "Base", "p"))
///     .with_instance(InstanceRecord::part("b", "Arm", "p"))
///     .with_mate(
///         MateRecord::new(
///             "m1",
///             MateType::Revolute,
///             MatedEntity::new(["a"], nalgebra::Isometry3::identity()),
///             MatedEntity::new(["b"], nalgebra::Isometry3::identity()),
///         )
///         .with_name("Shoulder")
///         .with_limits(-1.0, 1.0),
///     );
/// let description = AssemblyDescription::new("arm", root)
///     .with_part(PartDefinition::new("p").with_mass_properties(mass));
///
/// let (tree, report) = build_kinematic_tree(&description, &BuildOptions::new())?;
/// assert_eq!(tree.robot.links.len(), 2);
/// assert_eq!(tree.robot.joints[0].name, "Shoulder");
/// assert!(report.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn build_kinematic_tree(
    description: &AssemblyDescription,
    options: &BuildOptions,
) -> Result<(KinematicTree, DiscardReport)> {
    let flat = flatten(description, options.max_depth())?;
    build_from_flattened(description, &flat, options)
}

/// Run the synthesis stages on an already flattened (and hydrated) assembly
#[tracing::instrument(skip_all, fields(assembly = %description.name))]
pub fn build_from_flattened(
    description: &AssemblyDescription,
    flat: &FlatAssembly,
    options: &BuildOptions,
) -> Result<(KinematicTree, DiscardReport)> {
    let mut report = DiscardReport::new();

    let groups = detect_rigid_groups(description, flat)?;
    let extracted = extract_mates(description, flat, &groups, &mut report)?;
    let graph = AssemblyGraph::build(groups.len(), &extracted.mates);
    let root = select_root(&graph, flat, &groups, options.root_override())?;
    info!(
        groups = groups.len(),
        mates = extracted.mates.len(),
        root = %groups.group(root).name,
        "built assembly graph"
    );
    let spanning = extract_spanning_tree(&graph, &groups, &extracted.mates, root, &mut report)?;

    let robot_name = options
        .robot_name()
        .map(str::to_string)
        .unwrap_or_else(|| sanitize_name(&description.name));
    let tree = compose(
        flat,
        &groups,
        &extracted,
        &spanning,
        &robot_name,
        options,
        &mut report,
    )?;
    validate_tree(&tree)?;

    Ok((tree, report))
}

/// Serialize a kinematic tree into a URDF document
pub fn serialize_tree(tree: &KinematicTree) -> Result<String> {
    robot_to_string(&tree.robot)
}

/// Full conversion: fetch, hydrate, build, export meshes
///
/// Returns the tree with mesh references filled in, and the discard report.
#[tracing::instrument(skip_all, fields(document = %document))]
pub fn convert<A, M, E>(
    document: &str,
    assemblies: &A,
    mass_properties: &M,
    meshes: &E,
    options: &BuildOptions,
) -> Result<(KinematicTree, DiscardReport)>
where
    A: AssemblySource,
    M: MassPropertySource,
    E: MeshExporter,
{
    let description = assemblies
        .fetch_assembly(document)
        .map_err(|e| crate::error::Error::fetch(format!("assembly '{}'", document), e))?;

    let mut flat = flatten(&description, options.max_depth())?;
    hydrate_mass_properties(&mut flat, mass_properties)?;

    let (mut tree, report) = build_from_flattened(&description, &flat, options)?;
    let exported = attach_meshes(&mut tree.robot, meshes)?;
    info!(exported, "exported meshes");

    Ok((tree, report))
}
