//! Instance flattening
//!
//! Expands the nested assembly description into a flat arena of
//! [`Instance`]s. Each instance keeps its occurrence path (instance ids from
//! the top-level assembly down), a back-reference to its parent and its world
//! transform, the composition of occurrence transforms along the path.
//! Subassemblies at or beyond the depth bound are not expanded and become
//! opaque bodies.

use nalgebra::Isometry3;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{AssemblyDefinition, AssemblyDescription, GeometryRef, InstanceKind, MassProperties};
use crate::transform::check_rigid;

/// Index of an instance in a [`FlatAssembly`]
pub type InstanceId = usize;

/// Role of a flattened instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlatKind {
    /// Leaf part
    Part,
    /// Expanded subassembly; its children are separate instances
    Subassembly,
    /// Subassembly beyond the depth bound, treated as a single body
    OpaqueSubassembly,
}

/// A flattened occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Arena index
    pub id: InstanceId,
    /// Instance ids from the top-level assembly down to this instance
    pub path: Vec<String>,
    /// Sanitized, disambiguated display name
    pub name: String,
    /// Part, expanded subassembly or opaque subassembly
    pub kind: FlatKind,
    /// Uid of the part or assembly definition
    pub definition: String,
    /// Occurrence transform relative to the parent
    pub local_transform: Isometry3<f64>,
    /// Occurrence transform relative to the top-level assembly
    pub world_transform: Isometry3<f64>,
    /// Owning subassembly instance, `None` at top level
    pub parent: Option<InstanceId>,
    /// Direct children of an expanded subassembly
    pub children: Vec<InstanceId>,
    /// Nesting depth, 0 at top level
    pub depth: usize,
    /// Geometry of a body
    pub geometry: GeometryRef,
    /// Mass properties of a body in its own frame
    pub mass_properties: Option<MassProperties>,
}

impl Instance {
    /// Parts and opaque subassemblies are bodies; expanded subassemblies are containers
    pub fn is_body(&self) -> bool {
        !matches!(self.kind, FlatKind::Subassembly)
    }

    /// Occurrence path joined with `/`
    pub fn path_key(&self) -> String {
        self.path.join("/")
    }
}

/// Where a mate endpoint path lands
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// A flattened instance, plus the transform from that instance's frame to
    /// the named occurrence (identity unless the path continues into an
    /// opaque subassembly)
    Instance {
        /// Resolved instance
        id: InstanceId,
        /// Frame of the named occurrence in the instance frame
        offset: Isometry3<f64>,
    },
    /// The path passes through a suppressed instance
    Suppressed,
}

/// Flat arena of every instance of an assembly
#[derive(Debug, Clone)]
pub struct FlatAssembly {
    name: String,
    instances: Vec<Instance>,
    by_path: HashMap<Vec<String>, InstanceId>,
    suppressed: HashSet<Vec<String>>,
}

impl FlatAssembly {
    /// Assembly name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All instances in depth-first source order; parents precede children
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Instance by arena index
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id]
    }

    pub(crate) fn instances_mut(&mut self) -> impl Iterator<Item = &mut Instance> {
        self.instances.iter_mut()
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the arena holds no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instance with the given occurrence path
    pub fn lookup(&self, path: &[String]) -> Option<InstanceId> {
        self.by_path.get(path).copied()
    }

    /// Instance with the given display name
    pub fn find_by_name(&self, name: &str) -> Option<InstanceId> {
        self.instances.iter().position(|i| i.name == name)
    }

    /// Parts and opaque subassemblies
    pub fn bodies(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(|i| i.is_body())
    }

    /// Walk up from `id` to the instance directly under `scope`
    ///
    /// `scope` of `None` means the top-level assembly.
    pub fn child_of_scope(&self, id: InstanceId, scope: Option<InstanceId>) -> Option<InstanceId> {
        let mut current = id;
        loop {
            let parent = self.instances[current].parent;
            if parent == scope {
                return Some(current);
            }
            current = parent?;
        }
    }

    /// Resolve a mate endpoint
    ///
    /// # Arguments
    /// * `description` - Source description, used to descend into opaque subassemblies
    /// * `scope` - Occurrence path of the assembly that owns the mate
    /// * `occurrence` - Endpoint path relative to `scope`
    pub fn resolve(
        &self,
        description: &AssemblyDescription,
        scope: &[String],
        occurrence: &[String],
    ) -> Result<Endpoint> {
        let full: Vec<String> = scope.iter().chain(occurrence).cloned().collect();
        if occurrence.is_empty() {
            // Endpoints name an occurrence inside the owning assembly, never the assembly itself
            return Err(Error::InvalidAssembly(format!(
                "Mate endpoint in '{}' has an empty occurrence path",
                scope.join("/")
            )));
        }

        for depth in 1..=full.len() {
            let prefix = &full[..depth];
            if self.suppressed.contains(prefix) {
                return Ok(Endpoint::Suppressed);
            }
            let Some(id) = self.lookup(prefix) else {
                return Err(Error::InvalidAssembly(format!(
                    "Mate endpoint '{}' does not resolve to an instance",
                    full.join("/")
                )));
            };
            if depth == full.len() {
                return Ok(Endpoint::Instance {
                    id,
                    offset: Isometry3::identity(),
                });
            }
            match self.instances[id].kind {
                FlatKind::Subassembly => continue,
                FlatKind::Part => {
                    return Err(Error::InvalidAssembly(format!(
                        "Mate endpoint '{}' descends into part '{}'",
                        full.join("/"),
                        self.instances[id].name
                    )));
                }
                FlatKind::OpaqueSubassembly => {
                    return descend_opaque(description, &self.instances[id], &full[depth..])
                        .map(|offset| match offset {
                            Some(offset) => Endpoint::Instance { id, offset },
                            None => Endpoint::Suppressed,
                        });
                }
            }
        }
        Err(Error::InvalidAssembly(format!(
            "Mate endpoint '{}' does not resolve to an instance",
            full.join("/")
        )))
    }
}

/// Compose occurrence transforms through the definitions inside an opaque subassembly
///
/// Returns `None` if a suppressed instance is on the path.
fn descend_opaque(
    description: &AssemblyDescription,
    opaque: &Instance,
    rest: &[String],
) -> Result<Option<Isometry3<f64>>> {
    let unresolved = || {
        Error::InvalidAssembly(format!(
            "Mate endpoint '{}/{}' does not resolve inside '{}'",
            opaque.path_key(),
            rest.join("/"),
            opaque.name
        ))
    };

    let mut definition = description.subassembly(&opaque.definition).ok_or_else(unresolved)?;
    let mut offset = Isometry3::identity();
    for (i, id) in rest.iter().enumerate() {
        let record = definition.instance(id).ok_or_else(unresolved)?;
        if record.suppressed {
            return Ok(None);
        }
        offset *= record.transform;
        if i + 1 < rest.len() {
            definition = description.subassembly(&record.definition).ok_or_else(unresolved)?;
        }
    }
    Ok(Some(offset))
}

/// Sanitize a display name
///
/// Keeps ASCII alphanumerics, `-` and `_`, turns spaces into `-` and
/// collapses runs of `-`. An empty result becomes `unnamed`.
///
/// ```
/// use urdfsynth::flatten::sanitize_name;
///
/// assert_eq!(sanitize_name("wheel1 <3>"), "wheel1-3");
/// assert_eq!(sanitize_name("my--robot!!"), "my-robot");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == ' ' { '-' } else { c };
        if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    if out.is_empty() {
        out.push_str("unnamed");
    }
    out
}

struct Flattener<'a> {
    description: &'a AssemblyDescription,
    max_depth: usize,
    visiting: Vec<&'a str>,
    flat: FlatAssembly,
}

impl<'a> Flattener<'a> {
    fn expand(
        &mut self,
        definition: &'a AssemblyDefinition,
        parent: Option<InstanceId>,
        parent_world: Isometry3<f64>,
        depth: usize,
    ) -> Result<()> {
        let parent_path: Vec<String> = match parent {
            Some(p) => self.flat.instances[p].path.clone(),
            None => Vec::new(),
        };

        for record in &definition.instances {
            let mut path = parent_path.clone();
            path.push(record.id.clone());

            if record.suppressed {
                debug!(path = %path.join("/"), "skipping suppressed instance");
                self.flat.suppressed.insert(path);
                continue;
            }
            if self.flat.by_path.contains_key(&path) {
                return Err(Error::InvalidAssembly(format!(
                    "Duplicate instance id '{}' in assembly '{}'",
                    record.id, definition.uid
                )));
            }

            check_rigid(&format!("Instance '{}'", path.join("/")), &record.transform)?;
            let world = parent_world * record.transform;
            let id = self.flat.instances.len();
            let (kind, geometry, mass_properties, child_definition) = match record.kind {
                InstanceKind::Part => {
                    let part = self.description.part(&record.definition).ok_or_else(|| {
                        Error::InvalidAssembly(format!(
                            "Instance '{}' references unknown part definition '{}'",
                            path.join("/"),
                            record.definition
                        ))
                    })?;
                    (
                        FlatKind::Part,
                        part.geometry.clone(),
                        part.mass_properties.clone(),
                        None,
                    )
                }
                InstanceKind::Assembly => {
                    let sub = self.description.subassembly(&record.definition).ok_or_else(|| {
                        Error::InvalidAssembly(format!(
                            "Instance '{}' references unknown assembly definition '{}'",
                            path.join("/"),
                            record.definition
                        ))
                    })?;
                    if depth >= self.max_depth {
                        debug!(path = %path.join("/"), depth, "treating subassembly as opaque");
                        (
                            FlatKind::OpaqueSubassembly,
                            sub.geometry.clone(),
                            sub.mass_properties.clone(),
                            None,
                        )
                    } else {
                        (
                            FlatKind::Subassembly,
                            sub.geometry.clone(),
                            None,
                            Some(sub),
                        )
                    }
                }
            };

            self.flat.by_path.insert(path.clone(), id);
            self.flat.instances.push(Instance {
                id,
                path,
                name: record.name.clone(),
                kind,
                definition: record.definition.clone(),
                local_transform: record.transform,
                world_transform: world,
                parent,
                children: Vec::new(),
                depth,
                geometry,
                mass_properties,
            });
            if let Some(p) = parent {
                self.flat.instances[p].children.push(id);
            }

            if let Some(sub) = child_definition {
                if self.visiting.contains(&sub.uid.as_str()) {
                    return Err(Error::InvalidAssembly(format!(
                        "Circular subassembly reference: '{}' contains itself (via {})",
                        sub.uid,
                        self.visiting.join(" -> ")
                    )));
                }
                self.visiting.push(&sub.uid);
                self.expand(sub, Some(id), world, depth + 1)?;
                self.visiting.pop();
            }
        }
        Ok(())
    }
}

/// Flatten a nested assembly description
///
/// # Arguments
/// * `description` - The nested assembly
/// * `max_depth` - Subassemblies at this depth or deeper stay opaque; top-level instances are at depth 0
#[tracing::instrument(skip_all, fields(assembly = %description.name))]
pub fn flatten(description: &AssemblyDescription, max_depth: usize) -> Result<FlatAssembly> {
    let mut flattener = Flattener {
        description,
        max_depth,
        visiting: vec![description.root.uid.as_str()],
        flat: FlatAssembly {
            name: description.name.clone(),
            instances: Vec::new(),
            by_path: HashMap::new(),
            suppressed: HashSet::new(),
        },
    };
    flattener.expand(&description.root, None, Isometry3::identity(), 0)?;
    let mut flat = flattener.flat;

    if flat.bodies().next().is_none() {
        return Err(Error::InvalidAssembly(format!(
            "Assembly '{}' contains no parts",
            description.name
        )));
    }

    assign_names(&mut flat)?;
    info!(
        instances = flat.len(),
        bodies = flat.bodies().count(),
        "flattened assembly"
    );
    Ok(flat)
}

/// Replace raw names with sanitized, unique display names
///
/// Names that occur once are kept. Colliding names get the names of their
/// ancestors appended, nearest first, until unique; if the ancestry is
/// exhausted the instance id is appended, and only then a positional index. Parents are renamed
/// before their children, so ancestor suffixes are already unique.
fn assign_names(flat: &mut FlatAssembly) -> Result<()> {
    let bases: Vec<String> = flat.instances.iter().map(|i| sanitize_name(&i.name)).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *counts.entry(base.as_str()).or_default() += 1;
    }

    let mut taken: HashSet<String> = bases.iter().cloned().collect();
    let mut names: Vec<String> = Vec::with_capacity(bases.len());
    for (idx, base) in bases.iter().enumerate() {
        if counts[base.as_str()] == 1 {
            names.push(base.clone());
            continue;
        }

        let mut candidate = base.clone();
        let mut chosen = None;
        let mut ancestor = flat.instances[idx].parent;
        while let Some(a) = ancestor {
            candidate.push('_');
            candidate.push_str(&names[a]);
            if !taken.contains(&candidate) {
                chosen = Some(candidate.clone());
                break;
            }
            ancestor = flat.instances[a].parent;
        }
        if chosen.is_none() {
            let id = flat.instances[idx].path.last().map(|id| sanitize_name(id));
            if let Some(id) = id {
                let candidate = format!("{}_{}", base, id);
                if !taken.contains(&candidate) {
                    chosen = Some(candidate);
                }
            }
        }
        let chosen = match chosen {
            Some(name) => name,
            None => {
                let mut n = 1;
                loop {
                    let name = format!("{}_{}", base, n);
                    if !taken.contains(&name) {
                        break name;
                    }
                    n += 1;
                }
            }
        };
        taken.insert(chosen.clone());
        names.push(chosen);
    }

    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(Error::NameCollision(name.clone()));
        }
    }
    for (instance, name) in flat.instances.iter_mut().zip(names) {
        instance.name = name;
    }
    Ok(())
}
