//! Mapping from mate types to exportable joint primitives
//!
//! This is the only place that dispatches on [`MateType`].
//!
//! | Mate        | Joints                         | Synthetic link |
//! |-------------|--------------------------------|----------------|
//! | fixed       | fixed                          | no             |
//! | revolute    | revolute (continuous if unbounded) | no         |
//! | slider      | prismatic                      | no             |
//! | cylindrical | revolute, then prismatic       | yes            |
//! | planar      | prismatic x, then prismatic y  | yes            |
//! | ball        | rejected, or fixed with a warning | no          |

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::flatten::sanitize_name;
use crate::model::{JointKind, MateLimits, MateType};

/// One joint of a mate's decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct JointPrimitive {
    /// Joint type
    pub kind: JointKind,
    /// Motion axis in the joint frame
    pub axis: Vector3<f64>,
    /// Position limits
    pub limits: Option<MateLimits>,
    /// Appended to the joint name when a mate produces several joints
    pub suffix: &'static str,
}

impl JointPrimitive {
    fn new(kind: JointKind, axis: Vector3<f64>, limits: Option<MateLimits>, suffix: &'static str) -> Self {
        Self {
            kind,
            axis,
            limits,
            suffix,
        }
    }

    fn rotation(limits: Option<MateLimits>, suffix: &'static str) -> Self {
        match limits {
            Some(_) => Self::new(JointKind::Revolute, Vector3::z(), limits, suffix),
            None => Self::new(JointKind::Continuous, Vector3::z(), None, suffix),
        }
    }
}

/// Joints produced for one governing mate
#[derive(Debug, Clone, PartialEq)]
pub struct JointPlan {
    /// Joints from parent to child; consecutive joints share a synthetic link
    pub primitives: Vec<JointPrimitive>,
    /// The mate was approximated (ball exported as fixed)
    pub approximated: bool,
}

impl JointPlan {
    fn exact(primitives: Vec<JointPrimitive>) -> Self {
        Self {
            primitives,
            approximated: false,
        }
    }

    /// Whether the plan needs intermediate links
    pub fn needs_synthetic_link(&self) -> bool {
        self.primitives.len() > 1
    }
}

/// Decompose a mate into joint primitives
///
/// `limits` and `secondary` must already be oriented parent to child.
pub fn map_mate(
    mate_id: &str,
    mate_type: MateType,
    limits: Option<MateLimits>,
    secondary: Option<MateLimits>,
    allow_ball_as_fixed: bool,
) -> Result<JointPlan> {
    let plan = match mate_type {
        MateType::Fixed => JointPlan::exact(vec![JointPrimitive::new(
            JointKind::Fixed,
            Vector3::z(),
            None,
            "",
        )]),
        MateType::Revolute => JointPlan::exact(vec![JointPrimitive::rotation(limits, "")]),
        MateType::Slider => JointPlan::exact(vec![JointPrimitive::new(
            JointKind::Prismatic,
            Vector3::z(),
            limits,
            "",
        )]),
        MateType::Cylindrical => JointPlan::exact(vec![
            JointPrimitive::rotation(limits, "_revolute"),
            JointPrimitive::new(JointKind::Prismatic, Vector3::z(), secondary, "_prismatic"),
        ]),
        MateType::Planar => JointPlan::exact(vec![
            JointPrimitive::new(JointKind::Prismatic, Vector3::x(), limits, "_x"),
            JointPrimitive::new(JointKind::Prismatic, Vector3::y(), secondary, "_y"),
        ]),
        MateType::Ball if allow_ball_as_fixed => JointPlan {
            primitives: vec![JointPrimitive::new(JointKind::Fixed, Vector3::z(), None, "")],
            approximated: true,
        },
        MateType::Ball => return Err(Error::unsupported_joint(mate_id, mate_type)),
    };
    Ok(plan)
}

/// Name of the synthetic link that sits between the joints of `mate_id`
///
/// Derived from the mate id alone, so it is stable across runs.
pub fn synthetic_link_name(mate_id: &str, position: usize) -> String {
    let base = sanitize_name(&mate_id.replace('/', "_"));
    if position == 0 {
        format!("mate_{}_intermediate", base)
    } else {
        format!("mate_{}_intermediate_{}", base, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_joint_mates() {
        let fixed = map_mate("m", MateType::Fixed, None, None, false).unwrap();
        assert_eq!(fixed.primitives.len(), 1);
        assert_eq!(fixed.primitives[0].kind, JointKind::Fixed);

        let limits = Some(MateLimits::new(-1.0, 1.0));
        let revolute = map_mate("m", MateType::Revolute, limits, None, false).unwrap();
        assert_eq!(revolute.primitives[0].kind, JointKind::Revolute);
        assert_eq!(revolute.primitives[0].limits, limits);

        let unbounded = map_mate("m", MateType::Revolute, None, None, false).unwrap();
        assert_eq!(unbounded.primitives[0].kind, JointKind::Continuous);

        let slider = map_mate("m", MateType::Slider, limits, None, false).unwrap();
        assert_eq!(slider.primitives[0].kind, JointKind::Prismatic);
        assert!(!slider.needs_synthetic_link());
    }

    #[test]
    fn test_compound_mates_decompose() {
        let cylindrical = map_mate(
            "m",
            MateType::Cylindrical,
            Some(MateLimits::new(-3.0, 3.0)),
            Some(MateLimits::new(0.0, 0.1)),
            false,
        )
        .unwrap();
        let kinds: Vec<JointKind> = cylindrical.primitives.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![JointKind::Revolute, JointKind::Prismatic]);
        assert_eq!(cylindrical.primitives[1].limits, Some(MateLimits::new(0.0, 0.1)));
        assert!(cylindrical.needs_synthetic_link());

        let planar = map_mate("m", MateType::Planar, None, None, false).unwrap();
        assert_eq!(planar.primitives[0].axis, Vector3::x());
        assert_eq!(planar.primitives[1].axis, Vector3::y());
        assert!(planar.primitives.iter().all(|p| p.kind == JointKind::Prismatic));
    }

    #[test]
    fn test_ball_requires_opt_in() {
        let err = map_mate("sub/m7", MateType::Ball, None, None, false).unwrap_err();
        assert!(err.to_string().contains("[E2001]"));
        assert!(err.to_string().contains("sub/m7"));
        assert!(err.to_string().contains("ball"));

        let plan = map_mate("sub/m7", MateType::Ball, None, None, true).unwrap();
        assert!(plan.approximated);
        assert_eq!(plan.primitives[0].kind, JointKind::Fixed);
    }

    #[test]
    fn test_synthetic_link_name_is_stable() {
        assert_eq!(synthetic_link_name("sub/m7", 0), "mate_sub_m7_intermediate");
        assert_eq!(synthetic_link_name("sub/m7", 0), synthetic_link_name("sub/m7", 0));
        assert_ne!(synthetic_link_name("m1", 0), synthetic_link_name("m2", 0));
    }
}
