//! Snapshot of a nested CAD assembly
//!
//! These types are a read-only description of the source assembly for one
//! conversion run. Definitions are shared: an [`AssemblyDefinition`] or
//! [`PartDefinition`] may be instantiated any number of times, and each
//! [`InstanceRecord`] places one occurrence of a definition inside its parent.

use nalgebra::Isometry3;
use std::collections::HashMap;
use std::fmt;

use super::mass::MassProperties;
use super::mate::{MateRecord, RelationRecord};

/// Opaque geometry reference, owned by the mesh exporter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryRef(pub String);

impl GeometryRef {
    /// Wrap a reference string
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The underlying reference string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeometryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether an instance places a part or a subassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    /// Leaf body
    Part,
    /// Nested assembly
    Assembly,
}

/// One occurrence of a definition inside an assembly
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    /// Instance id, unique within the owning assembly
    pub id: String,
    /// Display name
    pub name: String,
    /// Part or subassembly
    pub kind: InstanceKind,
    /// Uid of the referenced part or assembly definition
    pub definition: String,
    /// Occurrence transform: maps instance coordinates into the owning assembly
    pub transform: Isometry3<f64>,
    /// Suppressed instances are left out of the conversion
    pub suppressed: bool,
}

impl InstanceRecord {
    fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: InstanceKind,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            definition: definition.into(),
            transform: Isometry3::identity(),
            suppressed: false,
        }
    }

    /// Create a part instance at the identity transform
    pub fn part(
        id: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::new(id, name, InstanceKind::Part, definition)
    }

    /// Create a subassembly instance at the identity transform
    pub fn assembly(
        id: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self::new(id, name, InstanceKind::Assembly, definition)
    }

    /// Set the occurrence transform
    pub fn with_transform(mut self, transform: Isometry3<f64>) -> Self {
        self.transform = transform;
        self
    }

    /// Mark the instance as suppressed
    pub fn suppressed(mut self) -> Self {
        self.suppressed = true;
        self
    }
}

/// Definition of a part
#[derive(Debug, Clone, PartialEq)]
pub struct PartDefinition {
    /// Unique id of the definition
    pub uid: String,
    /// Geometry handed to the mesh exporter
    pub geometry: GeometryRef,
    /// Mass properties in the part frame, if already known
    pub mass_properties: Option<MassProperties>,
}

impl PartDefinition {
    /// Create a part definition whose geometry reference is its uid
    pub fn new(uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            geometry: GeometryRef::new(uid.clone()),
            uid,
            mass_properties: None,
        }
    }

    /// Set the geometry reference
    pub fn with_geometry(mut self, geometry: impl Into<String>) -> Self {
        self.geometry = GeometryRef::new(geometry);
        self
    }

    /// Set the mass properties
    pub fn with_mass_properties(mut self, mass_properties: MassProperties) -> Self {
        self.mass_properties = Some(mass_properties);
        self
    }
}

/// Definition of an assembly: its instances, mates and mate relations
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyDefinition {
    /// Unique id of the definition
    pub uid: String,
    /// Instances in source order
    pub instances: Vec<InstanceRecord>,
    /// Mates in discovery order
    pub mates: Vec<MateRecord>,
    /// Mate relations in source order
    pub relations: Vec<RelationRecord>,
    /// Geometry used when the assembly is exported as a single opaque body
    pub geometry: GeometryRef,
    /// Mass properties used when the assembly is exported as a single opaque body
    pub mass_properties: Option<MassProperties>,
}

impl AssemblyDefinition {
    /// Create an empty assembly definition
    pub fn new(uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            geometry: GeometryRef::new(uid.clone()),
            uid,
            instances: Vec::new(),
            mates: Vec::new(),
            relations: Vec::new(),
            mass_properties: None,
        }
    }

    /// Append an instance
    pub fn with_instance(mut self, instance: InstanceRecord) -> Self {
        self.instances.push(instance);
        self
    }

    /// Append a mate
    pub fn with_mate(mut self, mate: MateRecord) -> Self {
        self.mates.push(mate);
        self
    }

    /// Append a mate relation
    pub fn with_relation(mut self, relation: RelationRecord) -> Self {
        self.relations.push(relation);
        self
    }

    /// Set the opaque-body mass properties
    pub fn with_mass_properties(mut self, mass_properties: MassProperties) -> Self {
        self.mass_properties = Some(mass_properties);
        self
    }

    /// Find a direct instance by id
    pub fn instance(&self, id: &str) -> Option<&InstanceRecord> {
        self.instances.iter().find(|i| i.id == id)
    }
}

/// A complete nested assembly: the root definition plus every definition it references
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyDescription {
    /// Assembly name, used as the robot name
    pub name: String,
    /// Top-level assembly
    pub root: AssemblyDefinition,
    /// Subassembly definitions by uid
    pub subassemblies: HashMap<String, AssemblyDefinition>,
    /// Part definitions by uid
    pub parts: HashMap<String, PartDefinition>,
}

impl AssemblyDescription {
    /// Create a description with no referenced definitions
    pub fn new(name: impl Into<String>, root: AssemblyDefinition) -> Self {
        Self {
            name: name.into(),
            root,
            subassemblies: HashMap::new(),
            parts: HashMap::new(),
        }
    }

    /// Register a subassembly definition
    pub fn with_subassembly(mut self, definition: AssemblyDefinition) -> Self {
        self.subassemblies.insert(definition.uid.clone(), definition);
        self
    }

    /// Register a part definition
    pub fn with_part(mut self, definition: PartDefinition) -> Self {
        self.parts.insert(definition.uid.clone(), definition);
        self
    }

    /// Look up a subassembly definition
    pub fn subassembly(&self, uid: &str) -> Option<&AssemblyDefinition> {
        self.subassemblies.get(uid)
    }

    /// Look up a part definition
    pub fn part(&self, uid: &str) -> Option<&PartDefinition> {
        self.parts.get(uid)
    }
}
