//! Discard report: everything the synthesis dropped or approximated

use std::fmt;
use tracing::warn;

use crate::model::MateType;

/// A mate that closed a kinematic loop and was not turned into a joint
#[derive(Debug, Clone, PartialEq)]
pub struct RedundantEdge {
    /// Qualified mate id
    pub mate_id: String,
    /// Mate display name
    pub mate_name: String,
    /// Discovery index of the mate
    pub discovery_index: usize,
    /// Mate type
    pub mate_type: MateType,
    /// Group names of the two endpoints, A first
    pub nodes: [String; 2],
}

/// A non-fatal deviation from the source assembly
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A ball mate was exported as a fixed joint
    BallApproximatedAsFixed {
        /// Qualified mate id
        mate_id: String,
    },
    /// A translational joint without mate limits got the default travel range
    DefaultTravel {
        /// Qualified mate id
        mate_id: String,
        /// Exported joint name
        joint: String,
    },
    /// A movable mate connects two members of the same rigid group
    InternalMate {
        /// Qualified mate id
        mate_id: String,
        /// Mate type
        mate_type: MateType,
        /// Group both endpoints belong to
        group: String,
    },
    /// A mate with a suppressed endpoint
    MateSkipped {
        /// Qualified mate id
        mate_id: String,
        /// Why the mate was skipped
        reason: String,
    },
    /// A relation whose master or slave mate did not become a joint
    RelationSkipped {
        /// Qualified relation id
        relation_id: String,
        /// Why the relation was skipped
        reason: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::BallApproximatedAsFixed { mate_id } => {
                write!(f, "ball mate '{}' approximated by a fixed joint", mate_id)
            }
            Warning::DefaultTravel { mate_id, joint } => write!(
                f,
                "prismatic joint '{}' of mate '{}' has no limits; using the default travel",
                joint, mate_id
            ),
            Warning::InternalMate {
                mate_id,
                mate_type,
                group,
            } => write!(
                f,
                "{} mate '{}' is internal to rigid group '{}' and was dropped",
                mate_type, mate_id, group
            ),
            Warning::MateSkipped { mate_id, reason } => {
                write!(f, "mate '{}' skipped: {}", mate_id, reason)
            }
            Warning::RelationSkipped {
                relation_id,
                reason,
            } => write!(f, "relation '{}' skipped: {}", relation_id, reason),
        }
    }
}

/// Redundant edges and warnings collected during one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscardReport {
    /// Loop-closing mates, in discovery order
    pub redundant_edges: Vec<RedundantEdge>,
    /// Approximations and skipped constraints, in the order they occurred
    pub warnings: Vec<Warning>,
}

impl DiscardReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing was discarded or approximated
    pub fn is_empty(&self) -> bool {
        self.redundant_edges.is_empty() && self.warnings.is_empty()
    }

    /// Record a warning and log it
    pub fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Record a redundant edge and log it
    pub fn redundant(&mut self, edge: RedundantEdge) {
        warn!(
            mate = %edge.mate_id,
            index = edge.discovery_index,
            "{} mate between '{}' and '{}' closes a loop; not exported as a joint",
            edge.mate_type,
            edge.nodes[0],
            edge.nodes[1]
        );
        self.redundant_edges.push(edge);
    }

    /// Whether a redundant edge with this mate id was recorded
    pub fn is_redundant(&self, mate_id: &str) -> bool {
        self.redundant_edges.iter().any(|e| e.mate_id == mate_id)
    }
}
