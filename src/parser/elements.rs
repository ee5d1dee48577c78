//! Attribute-level parsing of robot description elements

use crate::error::{Error, Result};
use crate::model::{JointKind, JointLimits, JointMimic};
use crate::transform::from_xyz_rpy;
use nalgebra::{Isometry3, Matrix3, Vector3};
use std::collections::HashMap;

/// Parse a required attribute
pub(super) fn required<'a>(
    attrs: &'a HashMap<String, String>,
    element: &str,
    attribute: &str,
) -> Result<&'a str> {
    attrs
        .get(attribute)
        .map(String::as_str)
        .ok_or_else(|| Error::missing_attribute(element, attribute))
}

/// Parse a floating-point attribute, falling back to `default` when absent
pub(super) fn float_or(
    attrs: &HashMap<String, String>,
    field: &str,
    attribute: &str,
    default: f64,
) -> Result<f64> {
    match attrs.get(attribute) {
        Some(value) => parse_float(field, value),
        None => Ok(default),
    }
}

fn parse_float(field: &str, value: &str) -> Result<f64> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::parse_error_with_context(field, value, "a floating-point number"))?;
    if !parsed.is_finite() {
        return Err(Error::parse_error_with_context(
            field,
            value,
            "a finite floating-point number",
        ));
    }
    Ok(parsed)
}

/// Parse "x y z"
pub(super) fn parse_triple(field: &str, value: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::parse_error_with_context(
            field,
            value,
            "three floating-point numbers",
        ));
    }
    Ok([
        parse_float(field, parts[0])?,
        parse_float(field, parts[1])?,
        parse_float(field, parts[2])?,
    ])
}

/// Parse an `<origin>` element; missing attributes mean zero
pub(super) fn parse_origin(attrs: &HashMap<String, String>) -> Result<Isometry3<f64>> {
    let xyz = match attrs.get("xyz") {
        Some(v) => parse_triple("origin xyz", v)?,
        None => [0.0; 3],
    };
    let rpy = match attrs.get("rpy") {
        Some(v) => parse_triple("origin rpy", v)?,
        None => [0.0; 3],
    };
    Ok(from_xyz_rpy(xyz, rpy))
}

/// Parse a `<joint>` start tag into its name and type
pub(super) fn parse_joint_header(attrs: &HashMap<String, String>) -> Result<(String, JointKind)> {
    let name = required(attrs, "joint", "name")?.to_string();
    let kind = required(attrs, "joint", "type")?.parse::<JointKind>()?;
    Ok((name, kind))
}

/// Parse an `<axis>` element
pub(super) fn parse_axis(attrs: &HashMap<String, String>) -> Result<Vector3<f64>> {
    let [x, y, z] = parse_triple("axis xyz", required(attrs, "axis", "xyz")?)?;
    Ok(Vector3::new(x, y, z))
}

/// Parse a `<limit>` element
pub(super) fn parse_limit(attrs: &HashMap<String, String>) -> Result<JointLimits> {
    Ok(JointLimits {
        lower: float_or(attrs, "limit lower", "lower", 0.0)?,
        upper: float_or(attrs, "limit upper", "upper", 0.0)?,
        effort: parse_float("limit effort", required(attrs, "limit", "effort")?)?,
        velocity: parse_float("limit velocity", required(attrs, "limit", "velocity")?)?,
    })
}

/// Parse a `<mimic>` element
pub(super) fn parse_mimic(attrs: &HashMap<String, String>) -> Result<JointMimic> {
    Ok(JointMimic {
        joint: required(attrs, "mimic", "joint")?.to_string(),
        multiplier: float_or(attrs, "mimic multiplier", "multiplier", 1.0)?,
        offset: float_or(attrs, "mimic offset", "offset", 0.0)?,
    })
}

/// Parse an `<inertia>` element into a symmetric tensor
pub(super) fn parse_inertia(attrs: &HashMap<String, String>) -> Result<Matrix3<f64>> {
    let mut values = [0.0; 6];
    for (slot, attr) in values
        .iter_mut()
        .zip(["ixx", "ixy", "ixz", "iyy", "iyz", "izz"])
    {
        *slot = parse_float(attr, required(attrs, "inertia", attr)?)?;
    }
    let [ixx, ixy, ixz, iyy, iyz, izz] = values;
    Ok(Matrix3::new(
        ixx, ixy, ixz, //
        ixy, iyy, iyz, //
        ixz, iyz, izz,
    ))
}
