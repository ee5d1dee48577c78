//! Rigid-group detection
//!
//! A subassembly is rigid when its direct children are connected by its own
//! mates, every one of those mates is fixed, and every child subassembly is
//! itself rigid (opaque subassemblies count as rigid). The outermost rigid
//! subassembly on any branch becomes one [`RigidGroup`] holding all of its
//! bodies. Rigid subassemblies nested inside non-rigid ones become separate
//! groups at whatever depth they occur. Every other body is its own group.
//!
//! Expanded subassemblies that are not rigid are pure containers and belong
//! to no group.

use nalgebra::Isometry3;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flatten::{Endpoint, FlatAssembly, FlatKind, InstanceId};
use crate::model::{AssemblyDescription, MassProperties, MateType};

/// Index of a group in [`RigidGroups`]
pub type GroupId = usize;

/// Instances merged into one structural body
#[derive(Debug, Clone, PartialEq)]
pub struct RigidGroup {
    /// Group index
    pub id: GroupId,
    /// Display name of the representative instance
    pub name: String,
    /// Instance that identifies the group: the merged subassembly, or the body itself
    pub representative: InstanceId,
    /// Bodies of the group, in arena order
    pub members: Vec<InstanceId>,
    /// World frame of the representative
    pub frame: Isometry3<f64>,
    /// Composite mass properties expressed in `frame`
    pub mass_properties: MassProperties,
}

impl RigidGroup {
    /// Whether the group came from a rigid subassembly
    pub fn is_merged(&self, flat: &FlatAssembly) -> bool {
        flat.instance(self.representative).kind == FlatKind::Subassembly
    }
}

/// Result of rigid-group detection
#[derive(Debug, Clone)]
pub struct RigidGroups {
    groups: Vec<RigidGroup>,
    group_of: Vec<Option<GroupId>>,
}

impl RigidGroups {
    /// Groups in arena order of their representatives
    pub fn groups(&self) -> &[RigidGroup] {
        &self.groups
    }

    /// Group by index
    pub fn group(&self, id: GroupId) -> &RigidGroup {
        &self.groups[id]
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group owning an instance; `None` for non-rigid containers
    pub fn group_of(&self, instance: InstanceId) -> Option<GroupId> {
        self.group_of[instance]
    }

    /// Group with the given name
    pub fn find(&self, name: &str) -> Option<GroupId> {
        self.groups.iter().position(|g| g.name == name)
    }

    /// Group by its own name, or by the display name of any instance inside it
    pub fn find_by_member_name(&self, flat: &FlatAssembly, name: &str) -> Option<GroupId> {
        self.find(name)
            .or_else(|| flat.find_by_name(name).and_then(|id| self.group_of(id)))
    }
}

/// Classify every expanded subassembly; `rigid[i]` is meaningful for subassembly instances only
fn classify(description: &AssemblyDescription, flat: &FlatAssembly) -> Result<Vec<bool>> {
    let mut rigid = vec![true; flat.len()];

    // Children follow their parents in the arena, so a reverse sweep is bottom-up
    for instance in flat.instances().iter().rev() {
        if instance.kind != FlatKind::Subassembly {
            continue;
        }
        let children = &instance.children;
        if children.is_empty() || children.iter().any(|&c| !rigid[c]) {
            rigid[instance.id] = false;
            continue;
        }

        let Some(definition) = description.subassembly(&instance.definition) else {
            return Err(Error::InvalidAssembly(format!(
                "Unknown assembly definition '{}'",
                instance.definition
            )));
        };

        let mut graph = UnGraph::<(), ()>::with_capacity(children.len(), definition.mates.len());
        for _ in children {
            graph.add_node(());
        }
        let mut all_fixed = true;
        for mate in definition.mates.iter().filter(|m| !m.suppressed) {
            let mut ends = [0usize; 2];
            let mut skipped = false;
            for (k, entity) in mate.entities.iter().enumerate() {
                match flat.resolve(description, &instance.path, &entity.occurrence)? {
                    Endpoint::Instance { id, .. } => {
                        let child = flat
                            .child_of_scope(id, Some(instance.id))
                            .and_then(|c| children.iter().position(|&x| x == c));
                        match child {
                            Some(c) => ends[k] = c,
                            None => skipped = true,
                        }
                    }
                    Endpoint::Suppressed => skipped = true,
                }
            }
            if skipped {
                continue;
            }
            if mate.mate_type != MateType::Fixed {
                all_fixed = false;
            }
            graph.add_edge(NodeIndex::new(ends[0]), NodeIndex::new(ends[1]), ());
        }

        rigid[instance.id] = all_fixed && connected_components(&graph) == 1;
        debug!(
            subassembly = %instance.name,
            rigid = rigid[instance.id],
            "classified subassembly"
        );
    }
    Ok(rigid)
}

/// Merge rigid subassemblies and compute composite mass properties
///
/// Every body must carry valid mass properties by now; missing or invalid
/// data is a [`Error::MassProperty`].
#[tracing::instrument(skip_all)]
pub fn detect_rigid_groups(
    description: &AssemblyDescription,
    flat: &FlatAssembly,
) -> Result<RigidGroups> {
    let rigid = classify(description, flat)?;

    let mut group_of: Vec<Option<GroupId>> = vec![None; flat.len()];
    let mut representatives: Vec<InstanceId> = Vec::new();
    for instance in flat.instances() {
        let inherited = instance.parent.and_then(|p| group_of[p]);
        group_of[instance.id] = match inherited {
            Some(g) => Some(g),
            None if instance.is_body() || rigid[instance.id] => {
                representatives.push(instance.id);
                Some(representatives.len() - 1)
            }
            None => None,
        };
    }

    let mut groups = Vec::with_capacity(representatives.len());
    for (id, &representative) in representatives.iter().enumerate() {
        let rep = flat.instance(representative);
        let frame = rep.world_transform;
        let frame_inv = frame.inverse();

        let members: Vec<InstanceId> = flat
            .bodies()
            .filter(|b| group_of[b.id] == Some(id))
            .map(|b| b.id)
            .collect();

        let mut bodies = Vec::with_capacity(members.len());
        for &m in &members {
            let body = flat.instance(m);
            let props = body
                .mass_properties
                .as_ref()
                .ok_or_else(|| Error::invalid_mass(&body.name, "no mass properties available"))?;
            props.validate(&body.name)?;
            bodies.push(props.transformed(&(frame_inv * body.world_transform)));
        }
        let mass_properties = MassProperties::combine(&bodies).ok_or_else(|| {
            Error::invalid_mass(&rep.name, "rigid group has no mass")
        })?;

        groups.push(RigidGroup {
            id,
            name: rep.name.clone(),
            representative,
            members,
            frame,
            mass_properties,
        });
    }

    info!(
        groups = groups.len(),
        merged = groups.iter().filter(|g| g.members.len() > 1).count(),
        "detected rigid groups"
    );
    Ok(RigidGroups { groups, group_of })
}
