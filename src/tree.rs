//! The synthesized kinematic tree

use nalgebra::Isometry3;

use crate::model::RobotDescription;
use crate::rigid::GroupId;

/// The mate that attaches a node to its parent
#[derive(Debug, Clone, PartialEq)]
pub struct GoverningEdge {
    /// Qualified mate id
    pub mate_id: String,
    /// Discovery index of the mate
    pub discovery_index: usize,
    /// Index of the parent node in [`KinematicTree::nodes`]
    pub parent: usize,
    /// The mate's B endpoint is the parent
    pub reversed: bool,
    /// Names of the joints produced for the mate, parent to child
    pub joints: Vec<String>,
    /// Names of synthetic links between those joints
    pub synthetic_links: Vec<String>,
}

/// One rigid group placed in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Rigid group index
    pub group: GroupId,
    /// Link name (the group name)
    pub name: String,
    /// Pose of the link frame in assembly coordinates
    pub link_frame: Isometry3<f64>,
    /// Display names of the bodies merged into the link
    pub members: Vec<String>,
    /// Governing edge; `None` for the root
    pub parent: Option<GoverningEdge>,
}

/// Rooted tree of rigid groups, together with its exportable description
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicTree {
    /// Nodes in breadth-first order; the root is first
    pub nodes: Vec<TreeNode>,
    /// Links and joints ready for serialization
    pub robot: RobotDescription,
}

impl KinematicTree {
    /// The root node
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    /// Node by link name
    pub fn node(&self, name: &str) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Parent node of the node named `name`
    pub fn parent_of(&self, name: &str) -> Option<&TreeNode> {
        let edge = self.node(name)?.parent.as_ref()?;
        self.nodes.get(edge.parent)
    }

    /// Number of nodes with a governing edge
    pub fn governing_edge_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.parent.is_some()).count()
    }

    /// Number of nodes without a governing edge
    pub fn root_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.parent.is_none()).count()
    }
}
