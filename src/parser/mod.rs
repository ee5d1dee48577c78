//! XML parsing for robot descriptions
//!
//! Reads back the subset of URDF produced by [`crate::writer`]: links with
//! inertial and visual mesh elements, and fixed, revolute, continuous and
//! prismatic joints with limits and mimic couplings. Collision elements are
//! skipped since they mirror the visuals. The parsed description is validated
//! before it is returned.

mod elements;

use crate::error::{Error, Result};
use crate::model::{GeometryRef, Joint, Link, MassProperties, RobotDescription, Visual};
use crate::validator::validate_robot;
use nalgebra::{Isometry3, Matrix3, Point3, Vector3};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

use elements::{
    parse_axis, parse_inertia, parse_joint_header, parse_limit, parse_mimic, parse_origin,
    required,
};

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Parse attributes from an XML element
fn parse_attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value =
            std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;

        attrs.insert(key.to_string(), value.to_string());
    }

    Ok(attrs)
}

/// Inertial element under construction
#[derive(Default)]
struct PendingInertial {
    origin: Option<Isometry3<f64>>,
    mass: Option<f64>,
    inertia: Option<Matrix3<f64>>,
}

impl PendingInertial {
    /// Mass properties in the link frame
    fn finish(self, link: &str) -> Result<MassProperties> {
        let mass = self.mass.ok_or_else(|| {
            Error::InvalidXml(format!("Inertial of link '{}' has no <mass>", link))
        })?;
        let inertia = self.inertia.unwrap_or_else(Matrix3::zeros);
        let local = MassProperties::new(mass, Point3::origin(), inertia);
        Ok(local.transformed(&self.origin.unwrap_or_else(Isometry3::identity)))
    }
}

/// Visual element under construction
struct PendingVisual {
    name: String,
    origin: Isometry3<f64>,
    filename: Option<String>,
}

/// Parse a URDF document into a validated robot description
pub fn parse_urdf_str(xml: &str) -> Result<RobotDescription> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
    let mut robot: Option<RobotDescription> = None;
    let mut current_link: Option<Link> = None;
    let mut current_joint: Option<Joint> = None;
    let mut inertial: Option<PendingInertial> = None;
    let mut visual: Option<PendingVisual> = None;
    let mut collision_depth = 0usize;

    loop {
        let event_result = reader.read_event_into(&mut buf);
        let is_empty_element = matches!(&event_result, Ok(Event::Empty(_)));

        match event_result {
            Ok(Event::DocType(_)) => {
                return Err(Error::InvalidXml(
                    "DTD declarations are not allowed in robot descriptions".to_string(),
                ));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?
                    .to_string();

                if collision_depth > 0 {
                    if !is_empty_element {
                        collision_depth += 1;
                    }
                    buf.clear();
                    continue;
                }

                let attrs = parse_attributes(e)?;
                match name_str.as_str() {
                    "robot" => {
                        let robot_name = required(&attrs, "robot", "name")?;
                        robot = Some(RobotDescription::new(robot_name));
                    }
                    "link" => {
                        let link = Link::new(required(&attrs, "link", "name")?);
                        if is_empty_element {
                            push_link(&mut robot, link)?;
                        } else {
                            current_link = Some(link);
                        }
                    }
                    "inertial" if current_link.is_some() => {
                        inertial = Some(PendingInertial::default());
                    }
                    "visual" if current_link.is_some() => {
                        visual = Some(PendingVisual {
                            name: attrs.get("name").cloned().unwrap_or_default(),
                            origin: Isometry3::identity(),
                            filename: None,
                        });
                    }
                    "collision" if !is_empty_element => {
                        collision_depth = 1;
                    }
                    "origin" => {
                        let origin = parse_origin(&attrs)?;
                        if let Some(ref mut v) = visual {
                            v.origin = origin;
                        } else if let Some(ref mut i) = inertial {
                            i.origin = Some(origin);
                        } else if let Some(ref mut j) = current_joint {
                            j.origin = origin;
                        }
                    }
                    "mass" => {
                        if let Some(ref mut i) = inertial {
                            let value = required(&attrs, "mass", "value")?;
                            i.mass = Some(value.parse::<f64>().map_err(|_| {
                                Error::parse_error_with_context("mass value", value, "a floating-point number")
                            })?);
                        }
                    }
                    "inertia" => {
                        if let Some(ref mut i) = inertial {
                            i.inertia = Some(parse_inertia(&attrs)?);
                        }
                    }
                    "mesh" => {
                        if let Some(ref mut v) = visual {
                            v.filename = Some(required(&attrs, "mesh", "filename")?.to_string());
                        }
                    }
                    "joint" => {
                        let (joint_name, kind) = parse_joint_header(&attrs)?;
                        current_joint = Some(Joint {
                            name: joint_name,
                            kind,
                            parent: String::new(),
                            child: String::new(),
                            origin: Isometry3::identity(),
                            // Default axis of the format
                            axis: Vector3::x(),
                            limits: None,
                            mimic: None,
                            mate_id: None,
                        });
                        if is_empty_element {
                            push_joint(&mut robot, current_joint.take())?;
                        }
                    }
                    "parent" | "child" => {
                        if let Some(ref mut j) = current_joint {
                            let link = required(&attrs, &name_str, "link")?.to_string();
                            if name_str == "parent" {
                                j.parent = link;
                            } else {
                                j.child = link;
                            }
                        }
                    }
                    "axis" => {
                        if let Some(ref mut j) = current_joint {
                            j.axis = parse_axis(&attrs)?;
                        }
                    }
                    "limit" => {
                        if let Some(ref mut j) = current_joint {
                            j.limits = Some(parse_limit(&attrs)?);
                        }
                    }
                    "mimic" => {
                        if let Some(ref mut j) = current_joint {
                            j.mimic = Some(parse_mimic(&attrs)?);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                if collision_depth > 0 {
                    collision_depth -= 1;
                    buf.clear();
                    continue;
                }
                let name = e.name();
                match name.as_ref() {
                    b"link" => {
                        if let Some(link) = current_link.take() {
                            push_link(&mut robot, link)?;
                        }
                    }
                    b"inertial" => {
                        if let (Some(pending), Some(link)) = (inertial.take(), current_link.as_mut()) {
                            link.inertial = Some(pending.finish(&link.name)?);
                        }
                    }
                    b"visual" => {
                        if let (Some(pending), Some(link)) = (visual.take(), current_link.as_mut()) {
                            let filename = pending.filename.ok_or_else(|| {
                                Error::InvalidXml(format!(
                                    "Visual of link '{}' has no mesh geometry",
                                    link.name
                                ))
                            })?;
                            link.visuals.push(Visual {
                                name: pending.name,
                                geometry: GeometryRef::new(filename),
                                origin: pending.origin,
                                mesh_file: None,
                            });
                        }
                    }
                    b"joint" => push_joint(&mut robot, current_joint.take())?,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let robot = robot
        .ok_or_else(|| Error::InvalidXml("Document has no <robot> element".to_string()))?;
    validate_robot(&robot)?;
    Ok(robot)
}

fn push_link(robot: &mut Option<RobotDescription>, link: Link) -> Result<()> {
    let robot = robot
        .as_mut()
        .ok_or_else(|| Error::InvalidXml("<link> outside of <robot>".to_string()))?;
    robot.links.push(link);
    Ok(())
}

fn push_joint(robot: &mut Option<RobotDescription>, joint: Option<Joint>) -> Result<()> {
    let Some(joint) = joint else {
        return Ok(());
    };
    if joint.parent.is_empty() {
        return Err(Error::InvalidXml(format!(
            "Joint '{}' has no <parent> element",
            joint.name
        )));
    }
    if joint.child.is_empty() {
        return Err(Error::InvalidXml(format!(
            "Joint '{}' has no <child> element",
            joint.name
        )));
    }
    let robot = robot
        .as_mut()
        .ok_or_else(|| Error::InvalidXml("<joint> outside of <robot>".to_string()))?;
    robot.joints.push(joint);
    Ok(())
}
