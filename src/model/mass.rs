//! Mass properties and their aggregation

use nalgebra::{Isometry3, Matrix3, Point3};

use crate::error::{Error, Result};

/// Relative tolerance for the inertia symmetry check
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Mass, center of mass and inertia tensor of a rigid body
///
/// The center of mass is expressed in some body frame and the inertia tensor
/// is taken about the center of mass, with axes aligned to that same frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MassProperties {
    /// Mass in kilograms
    pub mass: f64,
    /// Center of mass
    pub center_of_mass: Point3<f64>,
    /// Inertia tensor about the center of mass (symmetric)
    pub inertia: Matrix3<f64>,
}

impl MassProperties {
    /// Create mass properties from their components
    pub fn new(mass: f64, center_of_mass: Point3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Zero mass and inertia at the frame origin
    ///
    /// Used for synthetic intermediate links.
    pub fn zero() -> Self {
        Self::new(0.0, Point3::origin(), Matrix3::zeros())
    }

    /// Whether both mass and inertia are exactly zero
    pub fn is_zero(&self) -> bool {
        self.mass == 0.0 && self.inertia == Matrix3::zeros()
    }

    /// Re-express these properties in another frame
    ///
    /// `transform` maps coordinates of the current frame into the target
    /// frame. The center of mass is transformed as a point and the inertia
    /// tensor is rotated as `R I Rᵀ`; translation does not affect inertia
    /// about the center of mass.
    pub fn transformed(&self, transform: &Isometry3<f64>) -> Self {
        let rotation = transform.rotation.to_rotation_matrix();
        let r = rotation.matrix();
        Self {
            mass: self.mass,
            center_of_mass: transform.transform_point(&self.center_of_mass),
            inertia: r * self.inertia * r.transpose(),
        }
    }

    /// Aggregate several bodies expressed in a common frame into one
    ///
    /// Total mass is the sum of masses, the composite center of mass is the
    /// mass-weighted mean, and each body's inertia is shifted to the composite
    /// center of mass with the parallel-axis rule before summing. Every step
    /// is a plain sum over the inputs, so the result depends on input order
    /// only through floating-point rounding.
    ///
    /// Returns `None` when `bodies` is empty or the total mass is not positive.
    pub fn combine<'a, I>(bodies: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MassProperties>,
    {
        let bodies: Vec<&MassProperties> = bodies.into_iter().collect();
        let total: f64 = bodies.iter().map(|b| b.mass).sum();
        if bodies.is_empty() || total <= 0.0 {
            return None;
        }

        let weighted = bodies
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, b| {
                acc + b.center_of_mass.coords * b.mass
            });
        let com = Point3::from(weighted / total);

        let inertia = bodies.iter().fold(Matrix3::zeros(), |acc, b| {
            let d = b.center_of_mass - com;
            let shift = (Matrix3::identity() * d.dot(&d) - d * d.transpose()) * b.mass;
            acc + b.inertia + shift
        });

        Some(Self::new(total, com, inertia))
    }

    /// Check that the data describes a physical rigid body
    ///
    /// # Arguments
    /// * `part` - Name used in the error message
    pub fn validate(&self, part: &str) -> Result<()> {
        if !self.mass.is_finite()
            || !self.center_of_mass.coords.iter().all(|v| v.is_finite())
            || !self.inertia.iter().all(|v| v.is_finite())
        {
            return Err(Error::invalid_mass(part, "values must be finite"));
        }
        if self.mass <= 0.0 {
            return Err(Error::invalid_mass(
                part,
                format!("mass must be positive, got {}", self.mass),
            ));
        }

        let scale = self.inertia.abs().max().max(1.0);
        if (self.inertia - self.inertia.transpose()).abs().max() > SYMMETRY_TOLERANCE * scale {
            return Err(Error::invalid_mass(part, "inertia tensor is not symmetric"));
        }
        if (0..3).any(|i| self.inertia[(i, i)] < -SYMMETRY_TOLERANCE * scale) {
            return Err(Error::invalid_mass(
                part,
                "inertia tensor has a negative principal moment",
            ));
        }
        Ok(())
    }
}
