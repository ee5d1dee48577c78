//! Mate extraction
//!
//! Walks the mates and mate relations of the top-level assembly and of every
//! expanded subassembly, in flatten order, and re-targets each mate onto the
//! rigid groups owning its endpoints. Connectors are re-expressed in the
//! group frames. Mates internal to a group are dropped. The position of a
//! mate in the output is its discovery index, the sole tie-break used when
//! cycles are broken later.
//!
//! Mate and relation ids are qualified with the occurrence path of the
//! assembly that owns them, so a definition instantiated twice yields
//! distinct mates.

use nalgebra::Isometry3;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flatten::{Endpoint, FlatAssembly};
use crate::model::{
    AssemblyDefinition, AssemblyDescription, MateLimits, MateType, RelationKind,
};
use crate::report::{DiscardReport, Warning};
use crate::rigid::{GroupId, RigidGroups};
use crate::transform::check_rigid;

/// A mate between two rigid groups
#[derive(Debug, Clone, PartialEq)]
pub struct Mate {
    /// Discovery index
    pub index: usize,
    /// Qualified id
    pub id: String,
    /// Display name
    pub name: String,
    /// Constraint type
    pub mate_type: MateType,
    /// Endpoint groups: A (parent candidate), B (child candidate)
    pub nodes: [GroupId; 2],
    /// Connectors expressed in the frames of `nodes`
    pub connectors: [Isometry3<f64>; 2],
    /// Primary limits
    pub limits: Option<MateLimits>,
    /// Secondary limits
    pub secondary_limits: Option<MateLimits>,
}

impl Mate {
    /// The endpoint opposite to `node`
    pub fn other(&self, node: GroupId) -> GroupId {
        if self.nodes[0] == node {
            self.nodes[1]
        } else {
            self.nodes[0]
        }
    }
}

/// A validated mate relation
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Qualified id
    pub id: String,
    /// Relation kind
    pub kind: RelationKind,
    /// Qualified id of the master mate
    pub master: String,
    /// Qualified id of the slave mate
    pub slave: String,
    /// Coupling ratio
    pub ratio: f64,
    /// `1.0` or `-1.0`
    pub sign: f64,
}

/// Mates and relations between rigid groups
#[derive(Debug, Clone, Default)]
pub struct ExtractedMates {
    /// Cross-group mates in discovery order
    pub mates: Vec<Mate>,
    /// Relations whose mates both survived extraction
    pub relations: Vec<Relation>,
}

impl ExtractedMates {
    /// Mate by qualified id
    pub fn find(&self, id: &str) -> Option<&Mate> {
        self.mates.iter().find(|m| m.id == id)
    }
}

fn qualify(scope: &[String], id: &str) -> String {
    if scope.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", scope.join("/"), id)
    }
}

/// Collect cross-group mates and relations from every expanded assembly level
#[tracing::instrument(skip_all)]
pub fn extract_mates(
    description: &AssemblyDescription,
    flat: &FlatAssembly,
    groups: &RigidGroups,
    report: &mut DiscardReport,
) -> Result<ExtractedMates> {
    let mut scopes: Vec<(Vec<String>, &AssemblyDefinition)> = vec![(Vec::new(), &description.root)];
    for instance in flat.instances() {
        if instance.kind != crate::flatten::FlatKind::Subassembly {
            continue;
        }
        let definition = description.subassembly(&instance.definition).ok_or_else(|| {
            Error::InvalidAssembly(format!(
                "Unknown assembly definition '{}'",
                instance.definition
            ))
        })?;
        scopes.push((instance.path.clone(), definition));
    }

    let mut extracted = ExtractedMates::default();
    let mut dropped: HashSet<String> = HashSet::new();

    for (scope, definition) in &scopes {
        for record in &definition.mates {
            let id = qualify(scope, &record.id);
            if record.suppressed {
                debug!(mate = %id, "skipping suppressed mate");
                dropped.insert(id);
                continue;
            }

            let mut nodes = [0; 2];
            let mut connectors = [Isometry3::identity(); 2];
            let mut suppressed_end = false;
            for (k, entity) in record.entities.iter().enumerate() {
                check_rigid(&format!("Connector of mate '{}'", id), &entity.connector)?;
                match flat.resolve(description, scope, &entity.occurrence)? {
                    Endpoint::Suppressed => suppressed_end = true,
                    Endpoint::Instance { id: instance, offset } => {
                        let group = groups.group_of(instance).ok_or_else(|| {
                            Error::InvalidAssembly(format!(
                                "Mate '{}' attaches to non-rigid subassembly '{}'",
                                id,
                                flat.instance(instance).name
                            ))
                        })?;
                        let world = flat.instance(instance).world_transform * offset * entity.connector;
                        nodes[k] = group;
                        connectors[k] = groups.group(group).frame.inverse() * world;
                    }
                }
            }

            if suppressed_end {
                report.warn(Warning::MateSkipped {
                    mate_id: id.clone(),
                    reason: "an endpoint is suppressed".to_string(),
                });
                dropped.insert(id);
                continue;
            }

            if nodes[0] == nodes[1] {
                let group = &groups.group(nodes[0]).name;
                if record.mate_type == MateType::Fixed {
                    debug!(mate = %id, group = %group, "dropping internal fixed mate");
                } else {
                    report.warn(Warning::InternalMate {
                        mate_id: id.clone(),
                        mate_type: record.mate_type,
                        group: group.clone(),
                    });
                }
                dropped.insert(id);
                continue;
            }

            extracted.mates.push(Mate {
                index: extracted.mates.len(),
                id,
                name: record.name.clone(),
                mate_type: record.mate_type,
                nodes,
                connectors,
                limits: record.limits,
                secondary_limits: record.secondary_limits,
            });
        }
    }

    let emitted: HashSet<&str> = extracted.mates.iter().map(|m| m.id.as_str()).collect();
    let mut relations = Vec::new();
    for (scope, definition) in &scopes {
        for record in &definition.relations {
            let id = qualify(scope, &record.id);
            let master = qualify(scope, &record.master);
            let slave = qualify(scope, &record.slave);
            for mate in [&master, &slave] {
                if !emitted.contains(mate.as_str()) {
                    debug!(
                        relation = %id,
                        mate = %mate,
                        was_dropped = dropped.contains(mate.as_str()),
                        "relation references a missing mate"
                    );
                    return Err(Error::dangling_relation(&id, mate));
                }
            }
            relations.push(Relation {
                id,
                kind: record.kind,
                master,
                slave,
                ratio: record.ratio,
                sign: record.sign(),
            });
        }
    }
    extracted.relations = relations;

    info!(
        mates = extracted.mates.len(),
        relations = extracted.relations.len(),
        "extracted mates"
    );
    Ok(extracted)
}
