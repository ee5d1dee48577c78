//! Data structures for assemblies, mass properties and robot descriptions

// Declare all submodules
mod assembly;
mod config;
mod mass;
mod mate;
mod robot;

// Re-export all public types from the input snapshot
pub use assembly::{
    AssemblyDefinition, AssemblyDescription, GeometryRef, InstanceKind, InstanceRecord,
    PartDefinition,
};

// Re-export caller options
pub use config::BuildOptions;

// Re-export mass properties
pub use mass::MassProperties;

// Re-export constraint types
pub use mate::{MateLimits, MateRecord, MateType, MatedEntity, RelationKind, RelationRecord};

// Re-export the export model
pub use robot::{Joint, JointKind, JointLimits, JointMimic, Link, RobotDescription, Visual};
