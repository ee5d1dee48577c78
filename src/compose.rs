//! Frame and mass composition
//!
//! Walks the spanning tree root to leaf and turns it into links and joints.
//! The root link frame is the world anchor. A joint's origin is the parent
//! side mate connector expressed in the parent link frame, and the child link
//! frame is the parent link frame composed with that origin; in the assembled
//! pose this coincides with the child side connector. Geometry, center of
//! mass and inertia are re-expressed from assembly coordinates into the link
//! frame with the inverse of the link pose.

use nalgebra::Isometry3;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flatten::{FlatAssembly, sanitize_name};
use crate::graph::SpanningTree;
use crate::joints::{map_mate, synthetic_link_name};
use crate::mates::ExtractedMates;
use crate::model::{
    BuildOptions, Joint, JointKind, JointLimits, JointMimic, Link, MateLimits, RelationKind,
    RobotDescription, Visual,
};
use crate::report::{DiscardReport, Warning};
use crate::rigid::RigidGroups;
use crate::transform::frames_close;
use crate::tree::{GoverningEdge, KinematicTree, TreeNode};

/// Tolerance on connector coincidence, only used for diagnostics
const CONNECTOR_TOLERANCE: f64 = 1e-6;

struct Names {
    links: HashSet<String>,
    joints: HashSet<String>,
}

/// First of `candidates` not yet in `taken`, then `<last>_2`, `<last>_3`, ...
fn claim_unique(taken: &mut HashSet<String>, candidates: &[String]) -> String {
    for candidate in candidates {
        if taken.insert(candidate.clone()) {
            return candidate.clone();
        }
    }
    let base = candidates.last().map(String::as_str).unwrap_or("unnamed");
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

impl Names {
    /// Group names are already unique; a clash here is a disambiguation bug
    fn claim_link(&mut self, name: &str) -> Result<()> {
        if !self.links.insert(name.to_string()) {
            return Err(Error::NameCollision(name.to_string()));
        }
        Ok(())
    }

    /// Synthetic links never displace a group name
    fn claim_synthetic_link(&mut self, preferred: String) -> String {
        claim_unique(&mut self.links, &[preferred])
    }

    /// `preferred`, or `preferred_<mate id>` if taken
    fn claim_joint(&mut self, preferred: String, mate_id: &str) -> String {
        let fallback = format!("{}_{}", preferred, sanitize_name(&mate_id.replace('/', "_")));
        claim_unique(&mut self.joints, &[preferred, fallback])
    }
}

fn joint_limits(limits: Option<MateLimits>, options: &BuildOptions) -> Option<JointLimits> {
    limits.map(|l| JointLimits {
        lower: l.min,
        upper: l.max,
        effort: options.default_effort(),
        velocity: options.default_velocity(),
    })
}

/// Build links and joints along the spanning tree
#[tracing::instrument(skip_all, fields(robot = %robot_name))]
pub fn compose(
    flat: &FlatAssembly,
    groups: &RigidGroups,
    extracted: &ExtractedMates,
    spanning: &SpanningTree,
    robot_name: &str,
    options: &BuildOptions,
    report: &mut DiscardReport,
) -> Result<KinematicTree> {
    let mut robot = RobotDescription::new(robot_name);
    let mut nodes: Vec<TreeNode> = Vec::with_capacity(spanning.order.len());
    let mut node_of: Vec<Option<usize>> = vec![None; groups.len()];
    let mut link_frames: Vec<Option<Isometry3<f64>>> = vec![None; groups.len()];
    let mut mate_joints: HashMap<&str, (Vec<usize>, bool)> = HashMap::new();
    let mut names = Names {
        links: HashSet::new(),
        joints: HashSet::new(),
    };
    for &g in &spanning.order {
        names.claim_link(&groups.group(g).name)?;
    }

    for &g in &spanning.order {
        let group = groups.group(g);

        let (frame, governing) = match spanning.parent[g] {
            None => (*options.world_anchor(), None),
            Some(edge) => {
                let mate = &extracted.mates[edge.mate];
                let parent_frame = link_frames[edge.parent].ok_or_else(|| {
                    Error::InvalidTree(format!(
                        "Link '{}' visited before its parent '{}'",
                        group.name,
                        groups.group(edge.parent).name
                    ))
                })?;
                let (parent_side, child_side) = if edge.reversed { (1, 0) } else { (0, 1) };
                let parent_connector = groups.group(edge.parent).frame * mate.connectors[parent_side];
                let child_connector = group.frame * mate.connectors[child_side];
                if !frames_close(&parent_connector, &child_connector, CONNECTOR_TOLERANCE) {
                    debug!(
                        mate = %mate.id,
                        "mate connectors do not coincide in the assembled pose; using the parent side"
                    );
                }
                let origin = parent_frame.inverse() * parent_connector;
                (parent_frame * origin, Some((edge, mate, origin)))
            }
        };
        link_frames[g] = Some(frame);

        let frame_inv = frame.inverse();
        let mut link = Link::new(group.name.clone());
        link.inertial = Some(group.mass_properties.transformed(&(frame_inv * group.frame)));
        link.visuals = group
            .members
            .iter()
            .map(|&m| {
                let body = flat.instance(m);
                Visual {
                    name: body.name.clone(),
                    geometry: body.geometry.clone(),
                    origin: frame_inv * body.world_transform,
                    mesh_file: None,
                }
            })
            .collect();
        robot.links.push(link);

        let parent = match governing {
            None => None,
            Some((edge, mate, origin)) => {
                let (limits, secondary) = if edge.reversed {
                    (
                        mate.limits.map(|l| l.reversed()),
                        mate.secondary_limits.map(|l| l.reversed()),
                    )
                } else {
                    (mate.limits, mate.secondary_limits)
                };
                let plan = map_mate(
                    &mate.id,
                    mate.mate_type,
                    limits,
                    secondary,
                    options.allow_ball_as_fixed(),
                )?;
                if plan.approximated {
                    report.warn(Warning::BallApproximatedAsFixed {
                        mate_id: mate.id.clone(),
                    });
                }

                let base = sanitize_name(&mate.name);
                let mut joint_names = Vec::with_capacity(plan.primitives.len());
                let mut synthetic_links = Vec::new();
                let mut previous = groups.group(edge.parent).name.clone();
                let mut joint_indices = Vec::with_capacity(plan.primitives.len());
                let count = plan.primitives.len();
                for (k, primitive) in plan.primitives.iter().enumerate() {
                    let child = if k + 1 == count {
                        group.name.clone()
                    } else {
                        let name = names.claim_synthetic_link(synthetic_link_name(&mate.id, k));
                        robot.links.push(Link::synthetic(name.clone()));
                        synthetic_links.push(name.clone());
                        name
                    };
                    let name = names.claim_joint(format!("{}{}", base, primitive.suffix), &mate.id);
                    let limits = match (primitive.kind, primitive.limits) {
                        (JointKind::Prismatic, None) => {
                            report.warn(Warning::DefaultTravel {
                                mate_id: mate.id.clone(),
                                joint: name.clone(),
                            });
                            Some(options.default_travel())
                        }
                        (_, limits) => limits,
                    };
                    joint_indices.push(robot.joints.len());
                    robot.joints.push(Joint {
                        name: name.clone(),
                        kind: primitive.kind,
                        parent: previous,
                        child: child.clone(),
                        origin: if k == 0 { origin } else { Isometry3::identity() },
                        axis: primitive.axis,
                        limits: joint_limits(limits, options),
                        mimic: None,
                        mate_id: Some(mate.id.clone()),
                    });
                    joint_names.push(name);
                    previous = child;
                }
                mate_joints.insert(mate.id.as_str(), (joint_indices, edge.reversed));

                let parent_node = node_of[edge.parent].ok_or_else(|| {
                    Error::InvalidTree(format!("Parent of '{}' is not placed", group.name))
                })?;
                Some(GoverningEdge {
                    mate_id: mate.id.clone(),
                    discovery_index: mate.index,
                    parent: parent_node,
                    reversed: edge.reversed,
                    joints: joint_names,
                    synthetic_links,
                })
            }
        };

        node_of[g] = Some(nodes.len());
        nodes.push(TreeNode {
            group: g,
            name: group.name.clone(),
            link_frame: frame,
            members: group
                .members
                .iter()
                .map(|&m| flat.instance(m).name.clone())
                .collect(),
            parent,
        });
    }

    apply_relations(&mut robot, extracted, &mate_joints, options, report);

    info!(
        links = robot.links.len(),
        joints = robot.joints.len(),
        "composed kinematic tree"
    );
    Ok(KinematicTree { nodes, robot })
}

/// Whether a relation drives translation on its (master, slave) side
fn coupled_motion(kind: RelationKind) -> (bool, bool) {
    match kind {
        RelationKind::Gear => (false, false),
        RelationKind::Screw | RelationKind::RackAndPinion => (false, true),
        RelationKind::Linear => (true, true),
    }
}

/// The joint of a mate a relation acts on
///
/// Compound mates produce several joints; the first one moving the requested
/// way wins, otherwise the first movable one.
fn coupled_joint(robot: &RobotDescription, joints: &[usize], translation: bool) -> Option<usize> {
    let movable: Vec<usize> = joints
        .iter()
        .copied()
        .filter(|&j| robot.joints[j].kind.is_movable())
        .collect();
    movable
        .iter()
        .copied()
        .find(|&j| (robot.joints[j].kind == JointKind::Prismatic) == translation)
        .or_else(|| movable.first().copied())
}

/// Couple relation slave joints to their masters
///
/// The joint-space multiplier is `ratio * sign`, negated once for each of
/// master and slave whose mate was reversed to fit the tree. Slave limits are
/// the master limits scaled by that multiplier, unless overridden.
fn apply_relations(
    robot: &mut RobotDescription,
    extracted: &ExtractedMates,
    mate_joints: &HashMap<&str, (Vec<usize>, bool)>,
    options: &BuildOptions,
    report: &mut DiscardReport,
) {
    for relation in &extracted.relations {
        let (Some((master_joints, master_reversed)), Some((slave_joints, slave_reversed))) = (
            mate_joints.get(relation.master.as_str()),
            mate_joints.get(relation.slave.as_str()),
        ) else {
            report.warn(Warning::RelationSkipped {
                relation_id: relation.id.clone(),
                reason: "master or slave mate closes a loop and has no joint".to_string(),
            });
            continue;
        };
        let (master_translation, slave_translation) = coupled_motion(relation.kind);
        let (Some(master), Some(slave)) = (
            coupled_joint(robot, master_joints, master_translation),
            coupled_joint(robot, slave_joints, slave_translation),
        ) else {
            report.warn(Warning::RelationSkipped {
                relation_id: relation.id.clone(),
                reason: "master or slave mate has no movable joint".to_string(),
            });
            continue;
        };
        if master == slave {
            report.warn(Warning::RelationSkipped {
                relation_id: relation.id.clone(),
                reason: "slave joint cannot follow the master".to_string(),
            });
            continue;
        }

        let mut multiplier = relation.ratio * relation.sign;
        if *master_reversed {
            multiplier = -multiplier;
        }
        if *slave_reversed {
            multiplier = -multiplier;
        }

        let master_name = robot.joints[master].name.clone();
        let inherited = options.relation_limits(&relation.slave).or_else(|| {
            robot.joints[master]
                .limits
                .map(|l| MateLimits::new(l.lower, l.upper).scaled(multiplier))
        });

        let joint = &mut robot.joints[slave];
        if let Some(limits) = inherited {
            joint.limits = joint_limits(Some(limits), options);
            if joint.kind == JointKind::Continuous {
                joint.kind = JointKind::Revolute;
            }
        }
        debug!(relation = %relation.id, slave = %joint.name, master = %master_name, multiplier, "coupled joints");
        joint.mimic = Some(JointMimic {
            joint: master_name,
            multiplier,
            offset: 0.0,
        });
    }
}
