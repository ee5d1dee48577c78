//! Caller options for a conversion run

use nalgebra::Isometry3;
use std::collections::HashMap;

use super::mate::MateLimits;

/// Options controlling kinematic tree synthesis
///
/// # Example
///
/// ```
/// use urdfsynth::BuildOptions;
///
/// let options = BuildOptions::new()
///     .with_root("chassis")
///     .with_max_depth(2)
///     .with_ball_as_fixed(true);
///
/// assert_eq!(options.root_override(), Some("chassis"));
/// assert_eq!(options.max_depth(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Group name or member instance name of the root
    root_override: Option<String>,
    /// Subassemblies at or beyond this depth are treated as opaque bodies
    max_depth: usize,
    /// Approximate ball mates by fixed joints instead of failing
    allow_ball_as_fixed: bool,
    /// Frame of the root link
    world_anchor: Isometry3<f64>,
    /// Explicit limits for relation slave joints, keyed by qualified slave mate id
    relation_limit_overrides: HashMap<String, MateLimits>,
    /// Effort written into joint limits
    default_effort: f64,
    /// Velocity written into joint limits
    default_velocity: f64,
    /// Range given to translational joints whose mate has no limits
    default_travel: MateLimits,
    /// Overrides the assembly name as the robot name
    robot_name: Option<String>,
}

impl BuildOptions {
    /// Default options: automatic root, unbounded depth, ball mates rejected
    pub fn new() -> Self {
        Self {
            root_override: None,
            max_depth: usize::MAX,
            allow_ball_as_fixed: false,
            world_anchor: Isometry3::identity(),
            relation_limit_overrides: HashMap::new(),
            default_effort: 1.0,
            default_velocity: 1.0,
            default_travel: MateLimits::new(-1.0, 1.0),
            robot_name: None,
        }
    }

    /// Name the root group explicitly
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root_override = Some(root.into());
        self
    }

    /// Bound the expansion depth; top-level instances are at depth 0
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Allow ball mates to be exported as fixed joints (with a warning)
    pub fn with_ball_as_fixed(mut self, allow: bool) -> Self {
        self.allow_ball_as_fixed = allow;
        self
    }

    /// Place the root link at `anchor`
    pub fn with_world_anchor(mut self, anchor: Isometry3<f64>) -> Self {
        self.world_anchor = anchor;
        self
    }

    /// Override the inherited limits of a relation's slave joint
    pub fn with_relation_limits(mut self, slave_mate: impl Into<String>, limits: MateLimits) -> Self {
        self.relation_limit_overrides.insert(slave_mate.into(), limits);
        self
    }

    /// Set the effort and velocity written into joint limits
    pub fn with_actuation(mut self, effort: f64, velocity: f64) -> Self {
        self.default_effort = effort;
        self.default_velocity = velocity;
        self
    }

    /// Set the range of translational joints that have no mate limits
    pub fn with_default_travel(mut self, lower: f64, upper: f64) -> Self {
        self.default_travel = MateLimits::new(lower, upper);
        self
    }

    /// Set the robot name
    pub fn with_robot_name(mut self, name: impl Into<String>) -> Self {
        self.robot_name = Some(name.into());
        self
    }

    /// Requested root, if any
    pub fn root_override(&self) -> Option<&str> {
        self.root_override.as_deref()
    }

    /// Expansion depth bound
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether ball mates may become fixed joints
    pub fn allow_ball_as_fixed(&self) -> bool {
        self.allow_ball_as_fixed
    }

    /// Frame of the root link
    pub fn world_anchor(&self) -> &Isometry3<f64> {
        &self.world_anchor
    }

    /// Explicit slave limits for `slave_mate`, if any
    pub fn relation_limits(&self, slave_mate: &str) -> Option<MateLimits> {
        self.relation_limit_overrides.get(slave_mate).copied()
    }

    /// Effort written into joint limits
    pub fn default_effort(&self) -> f64 {
        self.default_effort
    }

    /// Velocity written into joint limits
    pub fn default_velocity(&self) -> f64 {
        self.default_velocity
    }

    /// Range of translational joints without mate limits
    pub fn default_travel(&self) -> MateLimits {
        self.default_travel
    }

    /// Robot name override
    pub fn robot_name(&self) -> Option<&str> {
        self.robot_name.as_deref()
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new()
    }
}
