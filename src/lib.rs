//! # urdfsynth
//!
//! Synthesizes a robot description (URDF) from a CAD assembly.
//!
//! A CAD assembly is a nested hierarchy of parts and subassemblies tied
//! together by mates. Its constraint graph can contain closed loops, rigid
//! clusters and mate types that have no single-joint equivalent. This crate
//! turns it into a rooted kinematic tree of links and joints.
//!
//! ## Pipeline
//!
//! 1. [`flatten`](flatten::flatten) resolves the occurrence hierarchy into a
//!    flat arena with world transforms and unique names
//! 2. [`detect_rigid_groups`](rigid::detect_rigid_groups) merges rigid
//!    subassemblies and aggregates their mass properties
//! 3. [`extract_mates`](mates::extract_mates) re-targets mates and relations
//!    onto rigid groups
//! 4. [`extract_spanning_tree`](graph::extract_spanning_tree) picks a root
//!    and keeps one governing mate per group, reporting the rest
//! 5. [`compose`](compose::compose) resolves link frames, joint origins and
//!    inertials, decomposing compound mates via [`joints`]
//!
//! External services (assembly fetch, mass properties, mesh export) are
//! injected through the traits in [`fetch`].
//!
//! Assembly sources decode raw CAD frames with
//! [`from_row_major`](transform::from_row_major) (occurrence matrices) and
//! [`from_axes`](transform::from_axes) (mate connectors), which reject scaled,
//! sheared and mirrored transforms. Frames built any other way are checked
//! again during flattening and mate extraction.
//!
//! ## Example
//!
//! ```no_run
//! use urdfsynth::{BuildOptions, build_kinematic_tree, serialize_tree};
//! # use urdfsynth::{AssemblyDefinition, AssemblyDescription};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let description = AssemblyDescription::new("robot", AssemblyDefinition::new("root"));
//! let options = BuildOptions::new().with_root("Chassis").with_ball_as_fixed(true);
//! let (tree, report) = build_kinematic_tree(&description, &options)?;
//!
//! for edge in &report.redundant_edges {
//!     println!("loop closed by mate {}", edge.mate_id);
//! }
//! std::fs::write("robot.urdf", serialize_tree(&tree)?)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compose;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod graph;
pub mod joints;
pub mod mates;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod rigid;
pub mod transform;
pub mod tree;
pub mod validator;
pub mod writer;

pub use error::{Error, ErrorKind, Result};
pub use fetch::{AssemblySource, MassPropertySource, MeshExporter};
pub use model::{
    AssemblyDefinition, AssemblyDescription, BuildOptions, GeometryRef, InstanceKind,
    InstanceRecord, Joint, JointKind, JointLimits, JointMimic, Link, MassProperties, MateLimits,
    MateRecord, MateType, MatedEntity, PartDefinition, RelationKind, RelationRecord,
    RobotDescription, Visual,
};
pub use parser::parse_urdf_str;
pub use pipeline::{build_from_flattened, build_kinematic_tree, convert, serialize_tree};
pub use report::{DiscardReport, RedundantEdge, Warning};
pub use tree::{GoverningEdge, KinematicTree, TreeNode};

use std::io::Write;
use std::path::Path;

impl RobotDescription {
    /// Parse a URDF document
    ///
    /// The result is validated: one root link, no cycles, every joint
    /// referencing existing links.
    pub fn from_urdf_str(xml: &str) -> Result<Self> {
        parse_urdf_str(xml)
    }

    /// Serialize to a URDF string
    pub fn to_urdf_string(&self) -> Result<String> {
        writer::robot_to_string(self)
    }

    /// Write URDF to a writer
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        writer::write_robot_xml(self, writer)
    }

    /// Write URDF to a file, creating or truncating it
    ///
    /// # Example
    ///
    /// ```no_run
    /// use urdfsynth::RobotDescription;
    ///
    /// # fn main() -> urdfsynth::Result<()> {
    /// let xml = std::fs::read_to_string("robot.urdf")?;
    /// let robot = RobotDescription::from_urdf_str(&xml)?;
    /// robot.write_to_file("copy.urdf")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut buffered = std::io::BufWriter::new(file);
        self.to_writer(&mut buffered)?;
        buffered.flush()?;
        Ok(())
    }
}
