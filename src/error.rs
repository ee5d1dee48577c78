//! Error types for kinematic tree synthesis
//!
//! Every error carries a stable code and enough identifying context (group,
//! instance or mate ids) to locate the problem in the source assembly.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: Structural errors (graph connectivity, roots, references)
//! - **E2xxx**: Unsupported joint types
//! - **E3xxx**: Mass property errors
//! - **E4xxx**: Name collisions
//! - **E5xxx**: Robot description document errors (I/O, XML)
//! - **E6xxx**: Failures reported by injected collaborators
//!
//! ## Common Error Codes
//!
//! - `E1001`: Constraint graph is not connected from the root
//! - `E1002`: Requested root does not exist
//! - `E1003`: Mate relation references a missing mate
//! - `E1004`: Invalid assembly description
//! - `E1005`: Invalid kinematic tree
//! - `E2001`: Mate type has no joint equivalent
//! - `E3001`: Missing or invalid mass properties
//! - `E4001`: Name collision after disambiguation
//! - `E5001`: I/O error
//! - `E6001`: Fetch failure

use std::io;
use thiserror::Error;

/// Result type for kinematic tree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Lets callers branch on the failure family without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Disconnected graph, missing root, dangling reference or malformed input
    Structural,
    /// A mate type that cannot be exported as a joint
    UnsupportedJoint,
    /// Missing or physically invalid mass data
    MassProperty,
    /// Two links or joints ended up with the same name
    NameCollision,
    /// Reading or writing the robot description document failed
    Document,
    /// An injected collaborator failed
    Fetch,
}

/// Errors that can occur while building or serializing a kinematic tree
#[derive(Error, Debug)]
pub enum Error {
    /// Constraint graph is not connected from the chosen root
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - A part or subassembly with no mates to the rest of the assembly
    /// - All mates of a cluster are suppressed
    ///
    /// **Suggestions**:
    /// - Add a mate (fixed if nothing else) between the listed nodes and the main body
    #[error("[E1001] Constraint graph is disconnected; unreachable from root '{root}': {}", .unreachable.join(", "))]
    DisconnectedGraph {
        /// Root group the traversal started from
        root: String,
        /// Sorted names of every group not reachable from the root
        unreachable: Vec<String>,
    },

    /// The requested root group does not exist
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Root override names an instance that was merged away or suppressed
    /// - Typo in the root override
    #[error("[E1002] Root '{0}' does not name a rigid group or one of its members")]
    MissingRoot(String),

    /// A mate relation points at a mate that no longer exists
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - The referenced mate was suppressed
    /// - The referenced mate became internal to a rigid group
    #[error("[E1003] Relation '{relation}' references missing mate '{mate}'")]
    DanglingRelation {
        /// Qualified id of the relation
        relation: String,
        /// Qualified id of the mate that could not be found
        mate: String,
    },

    /// Assembly description cannot be interpreted
    ///
    /// **Error Code**: E1004
    ///
    /// **Common Causes**:
    /// - Instance refers to an unknown part or assembly definition
    /// - Mate endpoint path does not resolve to an instance
    /// - Occurrence transform is not a rigid transform
    /// - Subassembly definitions that contain themselves
    #[error("[E1004] Invalid assembly: {0}")]
    InvalidAssembly(String),

    /// Produced or parsed kinematic tree is malformed
    ///
    /// **Error Code**: E1005
    ///
    /// **Common Causes**:
    /// - More than one link without a parent joint
    /// - Joint refers to an undefined link
    /// - A link with two parent joints
    #[error("[E1005] Invalid kinematic tree: {0}")]
    InvalidTree(String),

    /// Mate type has no exportable joint equivalent
    ///
    /// **Error Code**: E2001
    ///
    /// **Suggestions**:
    /// - Replace the mate in the CAD assembly
    /// - Enable the fixed-joint approximation for ball mates
    #[error("[E2001] Mate '{mate_id}' of type {mate_type} cannot be exported as a joint")]
    UnsupportedJoint {
        /// Qualified id of the offending mate
        mate_id: String,
        /// Human readable mate type
        mate_type: String,
    },

    /// Mass properties are missing or physically invalid
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - Part has no material assigned
    /// - Mass property source returned non-finite values
    /// - Inertia tensor is not symmetric
    #[error("[E3001] Invalid mass properties for '{part}': {reason}")]
    MassProperty {
        /// Name of the part or instance
        part: String,
        /// What is wrong with the data
        reason: String,
    },

    /// Two links or joints share a name after disambiguation
    ///
    /// **Error Code**: E4001
    ///
    /// This indicates a defect in name disambiguation rather than bad input.
    #[error("[E4001] Name collision: '{0}'")]
    NameCollision(String),

    /// IO error while writing or reading a robot description
    ///
    /// **Error Code**: E5001
    #[error("[E5001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// XML parsing error
    ///
    /// **Error Code**: E5002
    #[error("[E5002] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E5003
    #[error("[E5003] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E5004
    ///
    /// **Common Causes**:
    /// - Missing required elements or attributes
    /// - Unknown joint type
    #[error("[E5004] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E5005
    #[error("[E5005] Parse error: {0}")]
    ParseError(String),

    /// XML writing error
    ///
    /// **Error Code**: E5006
    #[error("[E5006] XML writing error: {0}")]
    XmlWrite(String),

    /// An injected collaborator failed
    ///
    /// **Error Code**: E6001
    ///
    /// Fetch failures are terminal for the run. Retries belong to the collaborator.
    #[error("[E6001] Failed to fetch {what}: {source}")]
    Fetch {
        /// Reference that was being fetched
        what: String,
        /// Error reported by the collaborator
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Failure family of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DisconnectedGraph { .. }
            | Error::MissingRoot(_)
            | Error::DanglingRelation { .. }
            | Error::InvalidAssembly(_)
            | Error::InvalidTree(_) => ErrorKind::Structural,
            Error::UnsupportedJoint { .. } => ErrorKind::UnsupportedJoint,
            Error::MassProperty { .. } => ErrorKind::MassProperty,
            Error::NameCollision(_) => ErrorKind::NameCollision,
            Error::Io(_)
            | Error::Xml(_)
            | Error::XmlAttr(_)
            | Error::InvalidXml(_)
            | Error::ParseError(_)
            | Error::XmlWrite(_) => ErrorKind::Document,
            Error::Fetch { .. } => ErrorKind::Fetch,
        }
    }

    /// Create a DisconnectedGraph error; the unreachable names are sorted
    pub fn disconnected(root: &str, mut unreachable: Vec<String>) -> Self {
        unreachable.sort();
        Error::DisconnectedGraph {
            root: root.to_string(),
            unreachable,
        }
    }

    /// Create a DanglingRelation error
    pub fn dangling_relation(relation: &str, mate: &str) -> Self {
        Error::DanglingRelation {
            relation: relation.to_string(),
            mate: mate.to_string(),
        }
    }

    /// Create a MassProperty error
    ///
    /// # Arguments
    /// * `part` - The part or instance name
    /// * `reason` - Description of the problem
    pub fn invalid_mass(part: &str, reason: impl Into<String>) -> Self {
        Error::MassProperty {
            part: part.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedJoint error
    pub fn unsupported_joint(mate_id: &str, mate_type: impl std::fmt::Display) -> Self {
        Error::UnsupportedJoint {
            mate_id: mate_id.to_string(),
            mate_type: mate_type.to_string(),
        }
    }

    /// Wrap a collaborator failure
    pub fn fetch(
        what: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Fetch {
            what: what.into(),
            source: source.into(),
        }
    }

    /// Create an InvalidXml error for a missing required attribute
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("joint", "type")
    /// ```
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::InvalidXml(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ))
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "origin xyz")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "three floating-point numbers")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'",
            field_name, expected_type, value
        ))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }
}
