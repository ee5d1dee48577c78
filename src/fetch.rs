//! Injected collaborators and parallel data hydration
//!
//! The core never talks to the CAD service itself. Callers pass an
//! [`AssemblySource`], a [`MassPropertySource`] and a [`MeshExporter`] into
//! the pipeline. Closures implement all three.
//!
//! Mass properties are fetched in parallel, one request per unique geometry,
//! and joined back into the flat assembly before any order-sensitive stage
//! runs. A failed fetch aborts the run; retries belong to the collaborator.

use nalgebra::Isometry3;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flatten::FlatAssembly;
use crate::model::{AssemblyDescription, GeometryRef, MassProperties, RobotDescription};
use crate::transform::to_xyz_rpy;

/// Error type returned by collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fetches the nested assembly description for a document
pub trait AssemblySource {
    /// Fetch the assembly referenced by `document`
    fn fetch_assembly(&self, document: &str) -> std::result::Result<AssemblyDescription, BoxError>;
}

impl<F> AssemblySource for F
where
    F: Fn(&str) -> std::result::Result<AssemblyDescription, BoxError>,
{
    fn fetch_assembly(&self, document: &str) -> std::result::Result<AssemblyDescription, BoxError> {
        self(document)
    }
}

/// Fetches mass properties of a body
///
/// Called concurrently from several threads.
pub trait MassPropertySource: Sync {
    /// Mass properties of `geometry`, expressed in the body's own frame
    fn fetch_mass_properties(
        &self,
        geometry: &GeometryRef,
    ) -> std::result::Result<MassProperties, BoxError>;
}

impl<F> MassPropertySource for F
where
    F: Fn(&GeometryRef) -> std::result::Result<MassProperties, BoxError> + Sync,
{
    fn fetch_mass_properties(
        &self,
        geometry: &GeometryRef,
    ) -> std::result::Result<MassProperties, BoxError> {
        self(geometry)
    }
}

/// Exports body geometry into a mesh file
pub trait MeshExporter {
    /// Export `geometry` with `frame` baked in and return the file reference
    fn export_mesh(
        &self,
        geometry: &GeometryRef,
        frame: &Isometry3<f64>,
    ) -> std::result::Result<String, BoxError>;
}

impl<F> MeshExporter for F
where
    F: Fn(&GeometryRef, &Isometry3<f64>) -> std::result::Result<String, BoxError>,
{
    fn export_mesh(
        &self,
        geometry: &GeometryRef,
        frame: &Isometry3<f64>,
    ) -> std::result::Result<String, BoxError> {
        self(geometry, frame)
    }
}

/// Fetch missing mass properties for every body, in parallel
///
/// Bodies whose definitions already carry mass properties are left alone.
/// Each unique geometry is requested once. Returns the number of requests made.
#[tracing::instrument(skip_all)]
pub fn hydrate_mass_properties<S>(flat: &mut FlatAssembly, source: &S) -> Result<usize>
where
    S: MassPropertySource + ?Sized,
{
    let mut pending: Vec<GeometryRef> = flat
        .bodies()
        .filter(|i| i.mass_properties.is_none())
        .map(|i| i.geometry.clone())
        .collect();
    pending.sort();
    pending.dedup();
    if pending.is_empty() {
        return Ok(0);
    }

    let fetched: Vec<std::result::Result<MassProperties, BoxError>> = pending
        .par_iter()
        .map(|geometry| source.fetch_mass_properties(geometry))
        .collect();

    let mut cache: HashMap<GeometryRef, MassProperties> = HashMap::with_capacity(pending.len());
    for (geometry, result) in pending.iter().zip(fetched) {
        let props = result
            .map_err(|e| Error::fetch(format!("mass properties of '{}'", geometry), e))?;
        cache.insert(geometry.clone(), props);
    }

    for instance in flat.instances_mut() {
        if instance.is_body() && instance.mass_properties.is_none() {
            instance.mass_properties = cache.get(&instance.geometry).cloned();
        }
    }
    info!(requests = pending.len(), "hydrated mass properties");
    Ok(pending.len())
}

/// Key identifying one part-in-frame; frames are compared at nanometre and nanoradian resolution
fn mesh_key(geometry: &GeometryRef, frame: &Isometry3<f64>) -> (GeometryRef, [i64; 6]) {
    let (xyz, rpy) = to_xyz_rpy(frame);
    let q = |v: f64| (v * 1e9).round() as i64;
    (
        geometry.clone(),
        [q(xyz[0]), q(xyz[1]), q(xyz[2]), q(rpy[0]), q(rpy[1]), q(rpy[2])],
    )
}

/// Export every visual's geometry and point the visual at the exported file
///
/// The exporter is called once per unique geometry and frame. Exported
/// meshes carry their frame, so visual origins are reset to identity.
/// Returns the number of exports performed.
#[tracing::instrument(skip_all, fields(robot = %robot.name))]
pub fn attach_meshes<E>(robot: &mut RobotDescription, exporter: &E) -> Result<usize>
where
    E: MeshExporter + ?Sized,
{
    let mut exported: HashMap<(GeometryRef, [i64; 6]), String> = HashMap::new();
    for link in &mut robot.links {
        for visual in &mut link.visuals {
            if visual.mesh_file.is_some() {
                continue;
            }
            let key = mesh_key(&visual.geometry, &visual.origin);
            let file = match exported.get(&key) {
                Some(file) => file.clone(),
                None => {
                    let file = exporter
                        .export_mesh(&visual.geometry, &visual.origin)
                        .map_err(|e| Error::fetch(format!("mesh of '{}'", visual.geometry), e))?;
                    debug!(geometry = %visual.geometry, file = %file, "exported mesh");
                    exported.insert(key, file.clone());
                    file
                }
            };
            visual.mesh_file = Some(file);
            visual.origin = Isometry3::identity();
        }
    }
    info!(exports = exported.len(), "attached meshes");
    Ok(exported.len())
}
