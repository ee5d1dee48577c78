//! Structural validation of robot descriptions and kinematic trees
//!
//! Validation ensures that:
//! - Link and joint names are unique
//! - Joints reference existing links
//! - Every link has at most one parent joint
//! - Exactly one link has no parent, and every link is reachable from it
//! - Joint values are finite and limits are ordered

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::model::RobotDescription;
use crate::tree::KinematicTree;

/// Helper function to convert a set of names to a sorted Vec for error messages
fn sorted_names(names: &HashSet<&str>) -> Vec<String> {
    let mut sorted: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    sorted.sort();
    sorted
}

/// Validate a robot description
pub fn validate_robot(robot: &RobotDescription) -> Result<()> {
    if robot.links.is_empty() {
        return Err(Error::InvalidTree(format!(
            "Robot '{}' has no links",
            robot.name
        )));
    }
    validate_unique_names(robot)?;
    validate_joint_references(robot)?;
    let root = validate_single_root(robot)?;
    if let Some(cycle) = detect_joint_cycle(robot) {
        return Err(Error::InvalidTree(format!(
            "Joints form a cycle: {}",
            cycle.join(" -> ")
        )));
    }
    validate_reachability(robot, root)?;
    validate_joint_values(robot)?;
    Ok(())
}

/// Validate a kinematic tree: its description plus the node/edge bookkeeping
pub fn validate_tree(tree: &KinematicTree) -> Result<()> {
    validate_robot(&tree.robot)?;

    if tree.root_count() != 1 {
        return Err(Error::InvalidTree(format!(
            "Expected exactly one root node, found {}",
            tree.root_count()
        )));
    }
    if tree.governing_edge_count() + 1 != tree.nodes.len() {
        return Err(Error::InvalidTree(format!(
            "{} nodes but {} governing edges",
            tree.nodes.len(),
            tree.governing_edge_count()
        )));
    }
    for (index, node) in tree.nodes.iter().enumerate() {
        if tree.robot.link(&node.name).is_none() {
            return Err(Error::InvalidTree(format!(
                "Node '{}' has no link",
                node.name
            )));
        }
        if let Some(edge) = &node.parent {
            if edge.parent >= index {
                return Err(Error::InvalidTree(format!(
                    "Node '{}' precedes its parent",
                    node.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_unique_names(robot: &RobotDescription) -> Result<()> {
    let mut links = HashSet::new();
    for link in &robot.links {
        if !links.insert(link.name.as_str()) {
            return Err(Error::NameCollision(link.name.clone()));
        }
    }
    let mut joints = HashSet::new();
    for joint in &robot.joints {
        if !joints.insert(joint.name.as_str()) {
            return Err(Error::NameCollision(joint.name.clone()));
        }
    }
    Ok(())
}

fn validate_joint_references(robot: &RobotDescription) -> Result<()> {
    let links: HashSet<&str> = robot.links.iter().map(|l| l.name.as_str()).collect();
    let mut parents: HashMap<&str, &str> = HashMap::new();

    for joint in &robot.joints {
        for (role, link) in [("parent", &joint.parent), ("child", &joint.child)] {
            if !links.contains(link.as_str()) {
                return Err(Error::InvalidTree(format!(
                    "Joint '{}' references undefined {} link '{}'",
                    joint.name, role, link
                )));
            }
        }
        if joint.parent == joint.child {
            return Err(Error::InvalidTree(format!(
                "Joint '{}' connects link '{}' to itself",
                joint.name, joint.parent
            )));
        }
        if let Some(previous) = parents.insert(joint.child.as_str(), joint.name.as_str()) {
            return Err(Error::InvalidTree(format!(
                "Link '{}' has two parent joints: '{}' and '{}'",
                joint.child, previous, joint.name
            )));
        }
    }

    if let Some(mimic_target) = robot
        .joints
        .iter()
        .filter_map(|j| j.mimic.as_ref())
        .find(|m| robot.joint(&m.joint).is_none())
    {
        return Err(Error::InvalidTree(format!(
            "Mimic references undefined joint '{}'",
            mimic_target.joint
        )));
    }
    Ok(())
}

fn validate_single_root(robot: &RobotDescription) -> Result<&str> {
    let children: HashSet<&str> = robot.joints.iter().map(|j| j.child.as_str()).collect();
    let roots: HashSet<&str> = robot
        .links
        .iter()
        .map(|l| l.name.as_str())
        .filter(|name| !children.contains(name))
        .collect();

    match roots.len() {
        1 => roots
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidTree("No root link".to_string())),
        0 => Err(Error::InvalidTree(
            "Every link has a parent joint; no root link".to_string(),
        )),
        _ => Err(Error::InvalidTree(format!(
            "Multiple root links: {}",
            sorted_names(&roots).join(", ")
        ))),
    }
}

/// Follow parent joints from every link; returns the first cycle found
///
/// Assumes each link has at most one parent joint.
fn detect_joint_cycle(robot: &RobotDescription) -> Option<Vec<String>> {
    let parent_of: HashMap<&str, &str> = robot
        .joints
        .iter()
        .map(|j| (j.child.as_str(), j.parent.as_str()))
        .collect();
    let mut cleared: HashSet<&str> = HashSet::new();

    for link in &robot.links {
        let mut path: Vec<&str> = Vec::new();
        let mut current = link.name.as_str();
        loop {
            if cleared.contains(current) {
                break;
            }
            if let Some(start) = path.iter().position(|&l| l == current) {
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(current.to_string());
                return Some(cycle);
            }
            path.push(current);
            match parent_of.get(current) {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        cleared.extend(path);
    }
    None
}

fn validate_reachability(robot: &RobotDescription, root: &str) -> Result<()> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for joint in &robot.joints {
        children
            .entry(joint.parent.as_str())
            .or_default()
            .push(joint.child.as_str());
    }

    let mut reached: HashSet<&str> = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(link) = stack.pop() {
        for &child in children.get(link).map(Vec::as_slice).unwrap_or(&[]) {
            if reached.insert(child) {
                stack.push(child);
            }
        }
    }

    let unreachable: HashSet<&str> = robot
        .links
        .iter()
        .map(|l| l.name.as_str())
        .filter(|name| !reached.contains(name))
        .collect();
    if !unreachable.is_empty() {
        return Err(Error::InvalidTree(format!(
            "Links unreachable from root '{}': {}",
            root,
            sorted_names(&unreachable).join(", ")
        )));
    }
    Ok(())
}

fn validate_joint_values(robot: &RobotDescription) -> Result<()> {
    for joint in &robot.joints {
        let origin_finite = joint.origin.translation.vector.iter().all(|v| v.is_finite())
            && joint.origin.rotation.coords.iter().all(|v| v.is_finite());
        if !origin_finite || !joint.axis.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidTree(format!(
                "Joint '{}' has a non-finite origin or axis",
                joint.name
            )));
        }
        if joint.kind.is_movable() && joint.axis.norm() < 1e-9 {
            return Err(Error::InvalidTree(format!(
                "Joint '{}' has a zero axis",
                joint.name
            )));
        }
        if let Some(limits) = &joint.limits {
            if !(limits.lower.is_finite() && limits.upper.is_finite()) || limits.lower > limits.upper {
                return Err(Error::InvalidTree(format!(
                    "Joint '{}' has invalid limits [{}, {}]",
                    joint.name, limits.lower, limits.upper
                )));
            }
        }
    }
    Ok(())
}
