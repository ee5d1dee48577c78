//! Mate constraints and mate relations

use nalgebra::Isometry3;
use std::fmt;

/// Type of a mate constraint
///
/// Adding a mate kind means extending this enum and the mapping in
/// the joint mapper; nothing else dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MateType {
    /// No relative motion
    Fixed,
    /// Rotation about the connector z axis
    Revolute,
    /// Translation along the connector z axis
    Slider,
    /// Rotation about and translation along the connector z axis
    Cylindrical,
    /// Translation in the connector xy plane
    Planar,
    /// Free rotation about the connector origin
    Ball,
}

impl MateType {
    /// Lowercase name of the mate type
    pub fn as_str(&self) -> &'static str {
        match self {
            MateType::Fixed => "fixed",
            MateType::Revolute => "revolute",
            MateType::Slider => "slider",
            MateType::Cylindrical => "cylindrical",
            MateType::Planar => "planar",
            MateType::Ball => "ball",
        }
    }
}

impl fmt::Display for MateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower and upper bound of a mate's degree of freedom
///
/// Radians for rotations, metres for translations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MateLimits {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl MateLimits {
    /// Create a limit pair
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Limits seen from the other endpoint of the mate
    pub fn reversed(&self) -> Self {
        Self::new(-self.max, -self.min)
    }

    /// Limits multiplied by `factor`, reordered so that `min <= max`
    pub fn scaled(&self, factor: f64) -> Self {
        let a = self.min * factor;
        let b = self.max * factor;
        Self::new(a.min(b), a.max(b))
    }
}

/// One side of a mate
#[derive(Debug, Clone, PartialEq)]
pub struct MatedEntity {
    /// Instance ids from the assembly that owns the mate down to the mated occurrence
    pub occurrence: Vec<String>,
    /// Mate connector expressed in the mated occurrence's frame
    ///
    /// The connector's z axis is the primary motion axis.
    pub connector: Isometry3<f64>,
}

impl MatedEntity {
    /// Create a mated entity from an occurrence path and connector
    pub fn new<I, S>(occurrence: I, connector: Isometry3<f64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            occurrence: occurrence.into_iter().map(Into::into).collect(),
            connector,
        }
    }
}

/// A pairwise constraint between two occurrences
#[derive(Debug, Clone, PartialEq)]
pub struct MateRecord {
    /// Feature id, unique within the owning assembly
    pub id: String,
    /// Display name
    pub name: String,
    /// Constraint type
    pub mate_type: MateType,
    /// Endpoints: `[A, B]`, A being the parent candidate
    pub entities: [MatedEntity; 2],
    /// Limits of the primary degree of freedom
    pub limits: Option<MateLimits>,
    /// Limits of the second degree of freedom (translation of a cylindrical
    /// mate, y translation of a planar mate)
    pub secondary_limits: Option<MateLimits>,
    /// Suppressed mates are ignored
    pub suppressed: bool,
}

impl MateRecord {
    /// Create an unlimited mate named after its id
    pub fn new(id: impl Into<String>, mate_type: MateType, a: MatedEntity, b: MatedEntity) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            mate_type,
            entities: [a, b],
            limits: None,
            secondary_limits: None,
            suppressed: false,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the primary limits
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.limits = Some(MateLimits::new(min, max));
        self
    }

    /// Set the secondary limits
    pub fn with_secondary_limits(mut self, min: f64, max: f64) -> Self {
        self.secondary_limits = Some(MateLimits::new(min, max));
        self
    }

    /// Mark the mate as suppressed
    pub fn suppressed(mut self) -> Self {
        self.suppressed = true;
        self
    }
}

/// Kind of a mate relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Rotation coupled to rotation
    Gear,
    /// Rotation coupled to translation along the same axis
    Screw,
    /// Rotation coupled to translation along a rack
    RackAndPinion,
    /// Translation coupled to translation
    Linear,
}

/// A coupling between two mates: `slave = master * ratio * sign`
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRecord {
    /// Feature id
    pub id: String,
    /// Display name
    pub name: String,
    /// Relation kind
    pub kind: RelationKind,
    /// Id of the driving mate
    pub master: String,
    /// Id of the driven mate
    pub slave: String,
    /// Coupling ratio (pitch for screws, relation length for rack and pinion)
    pub ratio: f64,
    /// Reverses the coupling direction
    pub reverse: bool,
}

impl RelationRecord {
    /// Create a relation
    pub fn new(
        id: impl Into<String>,
        kind: RelationKind,
        master: impl Into<String>,
        slave: impl Into<String>,
        ratio: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            master: master.into(),
            slave: slave.into(),
            ratio,
            reverse: false,
        }
    }

    /// Flip the coupling direction
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// `-1.0` for reversed relations, `1.0` otherwise
    pub fn sign(&self) -> f64 {
        if self.reverse { -1.0 } else { 1.0 }
    }
}
