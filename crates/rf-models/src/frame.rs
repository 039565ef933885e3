//! Reference-frame kinematics.
//!
//! The momentum equation is solved for the velocity relative to a frame
//! rotating with constant angular velocity `Omega` about `origin`. The
//! frame adds the Coriolis and centrifugal accelerations as an explicit
//! source, and the absolute velocity is recovered as
//! `U = Urel + Omega x (r - origin)`.

use rf_core::units::{AngularVelocity, rpm, to_rad_per_s};
use rf_core::Vec3;
use rf_fvm::{PatchField, VolField, VolVectorField};
use rf_mesh::Mesh;
use uom::si::angular_velocity::revolution_per_minute;

use crate::error::{ModelError, ModelResult};

pub trait FrameModel: Send + Sync {
    fn name(&self) -> &str;

    /// Angular velocity vector, rad/s.
    fn omega(&self) -> Vec3;

    /// Point on the rotation axis.
    fn origin(&self) -> Vec3;

    /// Frame velocity `Omega x (r - origin)` at `point`.
    fn velocity_at(&self, point: &Vec3) -> Vec3 {
        self.omega().cross(&(point - self.origin()))
    }

    /// Coriolis plus centrifugal acceleration per cell,
    /// `2 Omega x Urel + Omega x (Omega x (r - origin))`.
    fn su(&self, mesh: &Mesh, urel: &VolVectorField) -> Vec<Vec3> {
        let omega = self.omega();
        mesh.cell_centres()
            .iter()
            .zip(urel.internal())
            .map(|(c, u)| 2.0 * omega.cross(u) + omega.cross(&self.velocity_at(c)))
            .collect()
    }

    /// Frame velocity on cells and boundary faces.
    fn velocity(&self, mesh: &Mesh) -> ModelResult<VolVectorField> {
        let cells = mesh
            .cell_centres()
            .iter()
            .map(|c| self.velocity_at(c))
            .collect();
        let mut field = VolField::calculated("Usrf", mesh, cells)?;
        fill_boundary(mesh, &mut field, |f| self.velocity_at(&mesh.face_centres()[f]));
        Ok(field)
    }

    /// Absolute velocity `Urel + Omega x (r - origin)`, calculated on every
    /// non-empty patch.
    fn absolute_velocity(&self, mesh: &Mesh, urel: &VolVectorField) -> ModelResult<VolVectorField> {
        let cells = mesh
            .cell_centres()
            .iter()
            .zip(urel.internal())
            .map(|(c, u)| u + self.velocity_at(c))
            .collect();
        let mut field = VolField::calculated("U", mesh, cells)?;
        fill_boundary(mesh, &mut field, |f| {
            urel.boundary_face_value(mesh, f) + self.velocity_at(&mesh.face_centres()[f])
        });
        Ok(field)
    }
}

fn fill_boundary(mesh: &Mesh, field: &mut VolVectorField, value: impl Fn(usize) -> Vec3) {
    for (patch, pf) in mesh.patches().iter().zip(field.boundary_mut()) {
        if patch.is_empty_kind() {
            continue;
        }
        for (i, f) in patch.faces().enumerate() {
            pf.values[i] = value(f);
        }
    }
}

/// Frame rotating at a fixed speed about a fixed axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatingFrame {
    origin: Vec3,
    axis: Vec3,
    speed: AngularVelocity,
}

impl RotatingFrame {
    /// `axis` need not be normalised but must be non-zero.
    pub fn new(origin: Vec3, axis: Vec3, speed: AngularVelocity) -> ModelResult<Self> {
        let norm = axis.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(ModelError::invalid("SRF", "rotation axis must be non-zero"));
        }
        if !to_rad_per_s(speed).is_finite() {
            return Err(ModelError::invalid("SRF", "rotation speed must be finite"));
        }
        Ok(Self {
            origin,
            axis: axis / norm,
            speed,
        })
    }

    pub fn from_rpm(origin: Vec3, axis: Vec3, speed_rpm: f64) -> ModelResult<Self> {
        Self::new(origin, axis, rpm(speed_rpm))
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn rpm(&self) -> f64 {
        self.speed.get::<revolution_per_minute>()
    }
}

impl FrameModel for RotatingFrame {
    fn name(&self) -> &str {
        "rpm"
    }

    fn omega(&self) -> Vec3 {
        self.axis * to_rad_per_s(self.speed)
    }

    fn origin(&self) -> Vec3 {
        self.origin
    }
}

/// Non-rotating frame: no source, `U = Urel`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StationaryFrame;

impl FrameModel for StationaryFrame {
    fn name(&self) -> &str {
        "stationary"
    }

    fn omega(&self) -> Vec3 {
        Vec3::zeros()
    }

    fn origin(&self) -> Vec3 {
        Vec3::zeros()
    }
}

/// Fixed relative-velocity values for an `srfVelocity` patch.
///
/// With `relative` the value is imposed on `Urel` directly; otherwise it is
/// an absolute (inertial) velocity and the frame velocity at each face
/// centre is subtracted.
pub fn srf_velocity_values(
    frame: &dyn FrameModel,
    mesh: &Mesh,
    patch: usize,
    value: Vec3,
    relative: bool,
) -> PatchField<Vec3> {
    let p = &mesh.patches()[patch];
    let values = p
        .faces()
        .map(|f| {
            if relative {
                value
            } else {
                value - frame.velocity_at(&mesh.face_centres()[f])
            }
        })
        .collect();
    PatchField::fixed_value(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rf_mesh::{BlockPatches, BlockSpec, block_mesh};

    fn mesh_2d() -> Mesh {
        let mut spec = BlockSpec::unit_cube([3, 3, 1]);
        spec.origin = Vec3::new(-0.5, -0.5, -0.5);
        spec.patches = BlockPatches::two_dimensional("walls", "frontAndBack");
        block_mesh(&spec).unwrap()
    }

    fn urel(mesh: &Mesh, v: Vec3) -> VolVectorField {
        VolField::uniform("Urel", mesh, v, |p| PatchField::uniform_fixed_value(v, p.size)).unwrap()
    }

    #[test]
    fn rpm_sets_angular_velocity() {
        let frame = RotatingFrame::from_rpm(Vec3::zeros(), Vec3::new(0.0, 0.0, 2.0), 60.0).unwrap();
        let w = frame.omega();
        assert!((w.z - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert!((frame.rpm() - 60.0).abs() < 1e-9);
        assert_eq!(frame.axis(), Vec3::new(0.0, 0.0, 1.0));
        assert!(RotatingFrame::from_rpm(Vec3::zeros(), Vec3::zeros(), 1.0).is_err());
    }

    #[test]
    fn coriolis_and_centrifugal_terms() {
        let mesh = mesh_2d();
        let frame = RotatingFrame::new(
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, 1.0),
            rf_core::units::rad_per_s(2.0),
        )
        .unwrap();
        let u = urel(&mesh, Vec3::new(1.0, 0.0, 0.0));
        let su = frame.su(&mesh, &u);
        for (c, s) in mesh.cell_centres().iter().zip(&su) {
            // 2 w x U = (0, 4, 0); w x (w x r) = -w^2 (x, y, 0)
            let expected = Vec3::new(-4.0 * c.x, 4.0 - 4.0 * c.y, 0.0);
            assert!((s - expected).norm() < 1e-12);
        }
    }

    #[test]
    fn absolute_velocity_adds_frame_velocity_everywhere() {
        let mesh = mesh_2d();
        let frame = RotatingFrame::from_rpm(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), 30.0).unwrap();
        let u = urel(&mesh, Vec3::new(0.3, -0.1, 0.0));
        let abs = frame.absolute_velocity(&mesh, &u).unwrap();
        for (c, (ua, ur)) in mesh
            .cell_centres()
            .iter()
            .zip(abs.internal().iter().zip(u.internal()))
        {
            assert_eq!(*ua, ur + frame.velocity_at(c));
        }
        let walls = mesh.patch_by_name("walls").unwrap();
        for f in walls.faces() {
            let expected = u.boundary_face_value(&mesh, f) + frame.velocity_at(&mesh.face_centres()[f]);
            assert_eq!(abs.boundary_face_value(&mesh, f), expected);
        }
    }

    #[test]
    fn stationary_frame_is_inert() {
        let mesh = mesh_2d();
        let u = urel(&mesh, Vec3::new(1.0, 2.0, 0.0));
        let frame = StationaryFrame;
        assert!(frame.su(&mesh, &u).iter().all(|s| *s == Vec3::zeros()));
        assert_eq!(frame.absolute_velocity(&mesh, &u).unwrap().internal(), u.internal());
    }

    #[test]
    fn absolute_srf_velocity_subtracts_frame_motion() {
        let mesh = mesh_2d();
        let frame = RotatingFrame::from_rpm(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), 10.0).unwrap();
        // a wall at rest in the inertial frame
        let pf = srf_velocity_values(&frame, &mesh, 0, Vec3::zeros(), false);
        let walls = &mesh.patches()[0];
        for (i, f) in walls.faces().enumerate() {
            let absolute = pf.values[i] + frame.velocity_at(&mesh.face_centres()[f]);
            assert!(absolute.norm() < 1e-14);
        }
        let rel = srf_velocity_values(&frame, &mesh, 0, Vec3::new(1.0, 0.0, 0.0), true);
        assert!(rel.values.iter().all(|v| *v == Vec3::new(1.0, 0.0, 0.0)));
    }

    proptest! {
        #[test]
        fn frame_velocity_is_normal_to_axis_and_radius(
            ax in -1.0f64..1.0, ay in -1.0f64..1.0, az in 0.1f64..1.0,
            px in -2.0f64..2.0, py in -2.0f64..2.0, pz in -2.0f64..2.0,
            speed in -500.0f64..500.0,
        ) {
            let origin = Vec3::new(0.1, -0.2, 0.3);
            let frame = RotatingFrame::from_rpm(origin, Vec3::new(ax, ay, az), speed).unwrap();
            let r = Vec3::new(px, py, pz) - origin;
            let v = frame.velocity_at(&(origin + r));
            let scale = 1.0 + v.norm() * (1.0 + r.norm());
            prop_assert!(v.dot(&frame.axis()).abs() <= 1e-12 * scale);
            prop_assert!(v.dot(&r).abs() <= 1e-12 * scale);
        }
    }
}
