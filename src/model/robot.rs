//! Exportable robot description: links and joints

use nalgebra::{Isometry3, Vector3};
use std::fmt;
use std::str::FromStr;

use super::assembly::GeometryRef;
use super::mass::MassProperties;
use crate::error::Error;

/// Joint primitive supported by the robot description format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// No relative motion
    Fixed,
    /// Bounded rotation about the joint axis
    Revolute,
    /// Unbounded rotation about the joint axis
    Continuous,
    /// Translation along the joint axis
    Prismatic,
}

impl JointKind {
    /// Name used in the `type` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            JointKind::Fixed => "fixed",
            JointKind::Revolute => "revolute",
            JointKind::Continuous => "continuous",
            JointKind::Prismatic => "prismatic",
        }
    }

    /// Whether the joint has a degree of freedom
    pub fn is_movable(&self) -> bool {
        !matches!(self, JointKind::Fixed)
    }
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(JointKind::Fixed),
            "revolute" => Ok(JointKind::Revolute),
            "continuous" => Ok(JointKind::Continuous),
            "prismatic" => Ok(JointKind::Prismatic),
            other => Err(Error::InvalidXml(format!(
                "Unsupported joint type '{}'",
                other
            ))),
        }
    }
}

/// Position, effort and velocity limits of a joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    /// Lower position limit
    pub lower: f64,
    /// Upper position limit
    pub upper: f64,
    /// Maximum effort
    pub effort: f64,
    /// Maximum velocity
    pub velocity: f64,
}

/// Makes a joint follow another joint: `q = multiplier * q_master + offset`
#[derive(Debug, Clone, PartialEq)]
pub struct JointMimic {
    /// Name of the followed joint
    pub joint: String,
    /// Coupling factor
    pub multiplier: f64,
    /// Constant offset
    pub offset: f64,
}

/// Geometry attached to a link
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    /// Display name of the instance the geometry came from
    pub name: String,
    /// Geometry reference
    pub geometry: GeometryRef,
    /// Pose of the geometry in the link frame
    pub origin: Isometry3<f64>,
    /// Exported mesh file, once the geometry has been exported
    ///
    /// Exported meshes already have `origin` baked in, so the origin is reset
    /// to identity when this is set.
    pub mesh_file: Option<String>,
}

impl Visual {
    /// File name written to the description
    pub fn filename(&self) -> &str {
        self.mesh_file.as_deref().unwrap_or(self.geometry.as_str())
    }
}

/// A rigid body of the robot
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Unique link name
    pub name: String,
    /// Mass properties in the link frame
    pub inertial: Option<MassProperties>,
    /// Visual and collision geometry
    pub visuals: Vec<Visual>,
    /// Zero-mass intermediate link introduced by a compound joint
    pub synthetic: bool,
}

impl Link {
    /// Create a link without geometry or inertia
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inertial: None,
            visuals: Vec::new(),
            synthetic: false,
        }
    }

    /// Create a zero-mass intermediate link
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inertial: Some(MassProperties::zero()),
            visuals: Vec::new(),
            synthetic: true,
        }
    }
}

/// A joint connecting a parent link to a child link
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Unique joint name
    pub name: String,
    /// Joint primitive
    pub kind: JointKind,
    /// Parent link name
    pub parent: String,
    /// Child link name
    pub child: String,
    /// Pose of the child link frame in the parent link frame at zero position
    pub origin: Isometry3<f64>,
    /// Motion axis in the joint frame
    pub axis: Vector3<f64>,
    /// Limits, for bounded movable joints
    pub limits: Option<JointLimits>,
    /// Coupling to another joint
    pub mimic: Option<JointMimic>,
    /// Qualified id of the mate this joint was produced from
    pub mate_id: Option<String>,
}

/// A complete robot description
#[derive(Debug, Clone, PartialEq)]
pub struct RobotDescription {
    /// Robot name
    pub name: String,
    /// Links, root first, then in tree order
    pub links: Vec<Link>,
    /// Joints in tree order
    pub joints: Vec<Joint>,
}

impl RobotDescription {
    /// Create an empty description
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
            joints: Vec::new(),
        }
    }

    /// Find a link by name
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Find a joint by name
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// The joint whose child is `link`, if any
    pub fn parent_joint(&self, link: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.child == link)
    }

    /// Links that are not the child of any joint
    pub fn root_links(&self) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| self.parent_joint(&l.name).is_none())
            .collect()
    }

    /// Pose of a link frame in the root link frame, composed along its joint chain
    ///
    /// Returns `None` if the link does not exist or the chain is broken.
    pub fn link_pose(&self, link: &str) -> Option<Isometry3<f64>> {
        self.link(link)?;
        let mut pose = Isometry3::identity();
        let mut current = link;
        let mut steps = 0;
        while let Some(joint) = self.parent_joint(current) {
            pose = joint.origin * pose;
            current = &joint.parent;
            steps += 1;
            if steps > self.joints.len() {
                return None;
            }
        }
        Some(pose)
    }
}
