//! Link and joint element writing

use crate::error::{Error, Result};
use crate::model::{Joint, Link, MassProperties, Visual};
use crate::transform::to_xyz_rpy;
use nalgebra::Isometry3;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Write as IoWrite;

use super::{format_float, format_triple};

fn write_empty<W: IoWrite>(writer: &mut Writer<W>, elem: BytesStart<'_>, name: &str) -> Result<()> {
    writer
        .write_event(Event::Empty(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write {} element: {}", name, e)))
}

fn write_origin<W: IoWrite>(writer: &mut Writer<W>, origin: &Isometry3<f64>) -> Result<()> {
    let (xyz, rpy) = to_xyz_rpy(origin);
    let mut elem = BytesStart::new("origin");
    elem.push_attribute(("xyz", format_triple(xyz).as_str()));
    elem.push_attribute(("rpy", format_triple(rpy).as_str()));
    write_empty(writer, elem, "origin")
}

/// Write a link with its inertial, visual and collision elements
pub(super) fn write_link<W: IoWrite>(writer: &mut Writer<W>, link: &Link) -> Result<()> {
    let mut elem = BytesStart::new("link");
    elem.push_attribute(("name", link.name.as_str()));

    if link.inertial.is_none() && link.visuals.is_empty() {
        return write_empty(writer, elem, "link");
    }

    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write link element: {}", e)))?;

    if let Some(ref inertial) = link.inertial {
        write_inertial(writer, inertial)?;
    }
    for visual in &link.visuals {
        write_geometry_element(writer, "visual", visual)?;
    }
    // Collision shapes reuse the visual meshes
    for visual in &link.visuals {
        write_geometry_element(writer, "collision", visual)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("link")))
        .map_err(|e| Error::xml_write(format!("Failed to close link element: {}", e)))?;

    Ok(())
}

fn write_inertial<W: IoWrite>(writer: &mut Writer<W>, inertial: &MassProperties) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("inertial")))
        .map_err(|e| Error::xml_write(format!("Failed to write inertial element: {}", e)))?;

    // The inertia tensor is already aligned with the link frame
    let com = inertial.center_of_mass.coords;
    let mut origin = BytesStart::new("origin");
    origin.push_attribute(("xyz", format_triple([com.x, com.y, com.z]).as_str()));
    origin.push_attribute(("rpy", "0 0 0"));
    write_empty(writer, origin, "origin")?;

    let mut mass = BytesStart::new("mass");
    mass.push_attribute(("value", format_float(inertial.mass).as_str()));
    write_empty(writer, mass, "mass")?;

    let i = &inertial.inertia;
    let mut inertia = BytesStart::new("inertia");
    for (attr, (r, c)) in [
        ("ixx", (0, 0)),
        ("ixy", (0, 1)),
        ("ixz", (0, 2)),
        ("iyy", (1, 1)),
        ("iyz", (1, 2)),
        ("izz", (2, 2)),
    ] {
        inertia.push_attribute((attr, format_float(i[(r, c)]).as_str()));
    }
    write_empty(writer, inertia, "inertia")?;

    writer
        .write_event(Event::End(BytesEnd::new("inertial")))
        .map_err(|e| Error::xml_write(format!("Failed to close inertial element: {}", e)))?;
    Ok(())
}

fn write_geometry_element<W: IoWrite>(
    writer: &mut Writer<W>,
    tag: &str,
    visual: &Visual,
) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    elem.push_attribute(("name", visual.name.as_str()));
    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write {} element: {}", tag, e)))?;

    write_origin(writer, &visual.origin)?;

    writer
        .write_event(Event::Start(BytesStart::new("geometry")))
        .map_err(|e| Error::xml_write(format!("Failed to write geometry element: {}", e)))?;
    let mut mesh = BytesStart::new("mesh");
    mesh.push_attribute(("filename", visual.filename()));
    write_empty(writer, mesh, "mesh")?;
    writer
        .write_event(Event::End(BytesEnd::new("geometry")))
        .map_err(|e| Error::xml_write(format!("Failed to close geometry element: {}", e)))?;

    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| Error::xml_write(format!("Failed to close {} element: {}", tag, e)))?;
    Ok(())
}

/// Write a joint
pub(super) fn write_joint<W: IoWrite>(writer: &mut Writer<W>, joint: &Joint) -> Result<()> {
    let mut elem = BytesStart::new("joint");
    elem.push_attribute(("name", joint.name.as_str()));
    elem.push_attribute(("type", joint.kind.as_str()));
    writer
        .write_event(Event::Start(elem))
        .map_err(|e| Error::xml_write(format!("Failed to write joint element: {}", e)))?;

    write_origin(writer, &joint.origin)?;

    let mut parent = BytesStart::new("parent");
    parent.push_attribute(("link", joint.parent.as_str()));
    write_empty(writer, parent, "parent")?;

    let mut child = BytesStart::new("child");
    child.push_attribute(("link", joint.child.as_str()));
    write_empty(writer, child, "child")?;

    if joint.kind.is_movable() {
        let mut axis = BytesStart::new("axis");
        axis.push_attribute((
            "xyz",
            format_triple([joint.axis.x, joint.axis.y, joint.axis.z]).as_str(),
        ));
        write_empty(writer, axis, "axis")?;
    }

    if let Some(ref limits) = joint.limits {
        let mut limit = BytesStart::new("limit");
        limit.push_attribute(("lower", format_float(limits.lower).as_str()));
        limit.push_attribute(("upper", format_float(limits.upper).as_str()));
        limit.push_attribute(("effort", format_float(limits.effort).as_str()));
        limit.push_attribute(("velocity", format_float(limits.velocity).as_str()));
        write_empty(writer, limit, "limit")?;
    }

    if let Some(ref mimic) = joint.mimic {
        let mut elem = BytesStart::new("mimic");
        elem.push_attribute(("joint", mimic.joint.as_str()));
        elem.push_attribute(("multiplier", format_float(mimic.multiplier).as_str()));
        elem.push_attribute(("offset", format_float(mimic.offset).as_str()));
        write_empty(writer, elem, "mimic")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("joint")))
        .map_err(|e| Error::xml_write(format!("Failed to close joint element: {}", e)))?;

    Ok(())
}
