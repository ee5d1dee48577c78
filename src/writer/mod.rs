//! XML writing for robot descriptions
//!
//! Serializes a [`RobotDescription`] into URDF. Poses are written as `xyz`
//! and fixed-axis `rpy`; floating-point values use the shortest
//! representation that parses back to the same `f64`.

mod elements;

use crate::error::{Error, Result};
use crate::model::RobotDescription;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

use elements::{write_joint, write_link};

/// Write a robot description as URDF XML
pub fn write_robot_xml<W: IoWrite>(robot: &RobotDescription, writer: W) -> Result<()> {
    let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);

    // Write XML declaration
    xml_writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut robot_elem = BytesStart::new("robot");
    robot_elem.push_attribute(("name", robot.name.as_str()));
    xml_writer
        .write_event(Event::Start(robot_elem))
        .map_err(|e| Error::xml_write(format!("Failed to write robot element: {}", e)))?;

    for link in &robot.links {
        write_link(&mut xml_writer, link)?;
    }
    for joint in &robot.joints {
        write_joint(&mut xml_writer, joint)?;
    }

    xml_writer
        .write_event(Event::End(BytesEnd::new("robot")))
        .map_err(|e| Error::xml_write(format!("Failed to close robot element: {}", e)))?;

    Ok(())
}

/// Serialize a robot description into a URDF string
pub fn robot_to_string(robot: &RobotDescription) -> Result<String> {
    let mut buffer = Vec::new();
    write_robot_xml(robot, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| Error::xml_write(format!("Serialized document is not UTF-8: {}", e)))
}

/// Format a float so it parses back exactly
pub(crate) fn format_float(value: f64) -> String {
    // Avoid "-0" in output
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// Format three floats separated by spaces
pub(crate) fn format_triple(values: [f64; 3]) -> String {
    values
        .iter()
        .map(|v| format_float(*v))
        .collect::<Vec<_>>()
        .join(" ")
}
