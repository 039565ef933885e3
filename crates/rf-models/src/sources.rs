//! Volumetric momentum sources and their ordered collection.
//!
//! A source can take part in three places of an outer iteration:
//! `add_sup` contributes to the explicit right-hand side of the momentum
//! equation, `constrain` may rewrite the assembled system after relaxation,
//! and `correct` adjusts the velocity after the pressure correction.

use rf_core::{VSMALL, Vec3, ensure_relaxation_factor};
use rf_fvm::{FvMatrix, VolVectorField};
use rf_mesh::Mesh;

use crate::error::{ModelError, ModelResult};
use crate::selection::CellSelection;

pub trait MomentumSource: Send + Sync {
    fn name(&self) -> &str;

    /// Add the explicit contribution, per unit volume, to `su`.
    fn add_sup(&self, _mesh: &Mesh, _su: &mut [Vec3]) {}

    /// Modify the assembled, relaxed system before it is solved.
    fn constrain(
        &mut self,
        _mesh: &Mesh,
        _eqn: &mut FvMatrix<Vec3>,
        _u: &mut VolVectorField,
    ) -> ModelResult<()> {
        Ok(())
    }

    /// Adjust the velocity after the pressure correction.
    fn correct(&mut self, _mesh: &Mesh, _u: &mut VolVectorField) -> ModelResult<()> {
        Ok(())
    }
}

/// Sources applied in insertion order.
#[derive(Default)]
pub struct SourceList {
    sources: Vec<Box<dyn MomentumSource>>,
}

impl std::fmt::Debug for SourceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.name()))
            .finish()
    }
}

impl SourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: Box<dyn MomentumSource>) {
        self.sources.push(source);
    }

    pub fn with(mut self, source: Box<dyn MomentumSource>) -> Self {
        self.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Net explicit contribution per unit volume.
    pub fn sources(&self, mesh: &Mesh) -> Vec<Vec3> {
        let mut su = vec![Vec3::zeros(); mesh.n_cells()];
        for s in &self.sources {
            s.add_sup(mesh, &mut su);
        }
        su
    }

    pub fn constrain(
        &mut self,
        mesh: &Mesh,
        eqn: &mut FvMatrix<Vec3>,
        u: &mut VolVectorField,
    ) -> ModelResult<()> {
        for s in &mut self.sources {
            s.constrain(mesh, eqn, u)?;
        }
        Ok(())
    }

    pub fn correct(&mut self, mesh: &Mesh, u: &mut VolVectorField) -> ModelResult<()> {
        for s in &mut self.sources {
            s.correct(mesh, u)?;
        }
        Ok(())
    }
}

/// How an explicit source value is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeMode {
    /// Value is already per unit volume.
    #[default]
    Specific,
    /// Value is the total over the selection, spread by volume.
    Absolute,
}

/// Constant volumetric force over a cell selection.
#[derive(Debug, Clone)]
pub struct ExplicitSource {
    name: String,
    cells: Vec<usize>,
    value: Vec3,
}

impl ExplicitSource {
    pub fn new(
        name: impl Into<String>,
        mesh: &Mesh,
        selection: &CellSelection,
        value: Vec3,
        mode: VolumeMode,
    ) -> ModelResult<Self> {
        let name = name.into();
        let cells = selection.cells(mesh, &name)?;
        let value = match mode {
            VolumeMode::Specific => value,
            VolumeMode::Absolute => {
                let v: f64 = cells.iter().map(|&c| mesh.cell_volumes()[c]).sum();
                value / v
            }
        };
        Ok(Self { name, cells, value })
    }
}

impl MomentumSource for ExplicitSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_sup(&self, _mesh: &Mesh, su: &mut [Vec3]) {
        for &c in &self.cells {
            su[c] += self.value;
        }
    }
}

/// Driving pressure gradient that holds the mean velocity along a direction
/// at a target value.
///
/// `constrain` records `1/A` of the momentum system; `correct` measures the
/// volume-averaged velocity, computes the gradient increment that brings it
/// to the target and applies the matching velocity correction.
#[derive(Debug, Clone)]
pub struct MeanVelocityForce {
    name: String,
    cells: Vec<usize>,
    volume: f64,
    flow_dir: Vec3,
    u_bar: f64,
    relaxation: f64,
    grad_p0: f64,
    d_grad_p: f64,
    r_a: Option<Vec<f64>>,
}

impl MeanVelocityForce {
    pub fn new(
        name: impl Into<String>,
        mesh: &Mesh,
        selection: &CellSelection,
        u_bar: Vec3,
        relaxation: f64,
        grad_p_initial: f64,
    ) -> ModelResult<Self> {
        let name = name.into();
        let mag = u_bar.norm();
        if !(mag.is_finite() && mag > 0.0) {
            return Err(ModelError::invalid(&name, "Ubar must be non-zero"));
        }
        ensure_relaxation_factor(relaxation, "relaxation")
            .map_err(|e| ModelError::invalid(&name, e.to_string()))?;
        let cells = selection.cells(mesh, &name)?;
        let volume = cells.iter().map(|&c| mesh.cell_volumes()[c]).sum();
        Ok(Self {
            name,
            cells,
            volume,
            flow_dir: u_bar / mag,
            u_bar: mag,
            relaxation,
            grad_p0: grad_p_initial,
            d_grad_p: 0.0,
            r_a: None,
        })
    }

    /// Current driving gradient.
    pub fn grad_p(&self) -> f64 {
        self.grad_p0 + self.d_grad_p
    }

    /// Volume-averaged velocity along the flow direction.
    pub fn mean_velocity(&self, mesh: &Mesh, u: &VolVectorField) -> f64 {
        let sum: f64 = self
            .cells
            .iter()
            .map(|&c| self.flow_dir.dot(&u.internal()[c]) * mesh.cell_volumes()[c])
            .sum();
        sum / self.volume
    }
}

impl MomentumSource for MeanVelocityForce {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_sup(&self, _mesh: &Mesh, su: &mut [Vec3]) {
        let g = self.flow_dir * self.grad_p();
        for &c in &self.cells {
            su[c] += g;
        }
    }

    fn constrain(
        &mut self,
        mesh: &Mesh,
        eqn: &mut FvMatrix<Vec3>,
        _u: &mut VolVectorField,
    ) -> ModelResult<()> {
        self.r_a = Some(eqn.a(mesh).iter().map(|a| 1.0 / a).collect());
        self.grad_p0 += self.d_grad_p;
        self.d_grad_p = 0.0;
        Ok(())
    }

    fn correct(&mut self, mesh: &Mesh, u: &mut VolVectorField) -> ModelResult<()> {
        let r_a = self.r_a.as_ref().ok_or_else(|| ModelError::NotConstrained {
            name: self.name.clone(),
        })?;
        let r_a_ave = self
            .cells
            .iter()
            .map(|&c| r_a[c] * mesh.cell_volumes()[c])
            .sum::<f64>()
            / self.volume;
        let u_bar_ave = self.mean_velocity(mesh, u);

        self.d_grad_p = self.relaxation * (self.u_bar - u_bar_ave) / (r_a_ave + VSMALL);
        for &c in &self.cells {
            u.internal_mut()[c] += self.flow_dir * (r_a[c] * self.d_grad_p);
        }
        u.correct_boundary_conditions(mesh);

        tracing::info!(
            "Pressure gradient source: uncorrected Ubar = {}, pressure gradient = {}",
            u_bar_ave,
            self.grad_p()
        );
        Ok(())
    }
}

/// Fixed velocity in a cell selection, imposed by rewriting the rows of the
/// momentum system.
#[derive(Debug, Clone)]
pub struct FixedVelocity {
    name: String,
    cells: Vec<usize>,
    value: Vec3,
}

impl FixedVelocity {
    pub fn new(
        name: impl Into<String>,
        mesh: &Mesh,
        selection: &CellSelection,
        value: Vec3,
    ) -> ModelResult<Self> {
        let name = name.into();
        let cells = selection.cells(mesh, &name)?;
        Ok(Self { name, cells, value })
    }
}

impl MomentumSource for FixedVelocity {
    fn name(&self) -> &str {
        &self.name
    }

    fn constrain(
        &mut self,
        mesh: &Mesh,
        eqn: &mut FvMatrix<Vec3>,
        u: &mut VolVectorField,
    ) -> ModelResult<()> {
        let values = vec![self.value; self.cells.len()];
        eqn.set_values(mesh, u, &self.cells, &values)?;
        Ok(())
    }

    fn correct(&mut self, mesh: &Mesh, u: &mut VolVectorField) -> ModelResult<()> {
        for &c in &self.cells {
            u.internal_mut()[c] = self.value;
        }
        u.correct_boundary_conditions(mesh);
        Ok(())
    }
}

/// Clips the velocity magnitude to `max` after each correction.
#[derive(Debug, Clone)]
pub struct VelocityLimit {
    name: String,
    cells: Vec<usize>,
    max: f64,
}

impl VelocityLimit {
    pub fn new(
        name: impl Into<String>,
        mesh: &Mesh,
        selection: &CellSelection,
        max: f64,
    ) -> ModelResult<Self> {
        let name = name.into();
        if !(max.is_finite() && max > 0.0) {
            return Err(ModelError::invalid(&name, "max must be positive"));
        }
        let cells = selection.cells(mesh, &name)?;
        Ok(Self { name, cells, max })
    }
}

impl MomentumSource for VelocityLimit {
    fn name(&self) -> &str {
        &self.name
    }

    fn correct(&mut self, mesh: &Mesh, u: &mut VolVectorField) -> ModelResult<()> {
        let mut limited = 0usize;
        for &c in &self.cells {
            let v = u.internal()[c];
            let mag = v.norm();
            if mag > self.max {
                u.internal_mut()[c] = v * (self.max / mag);
                limited += 1;
            }
        }
        if limited > 0 {
            u.correct_boundary_conditions(mesh);
            tracing::info!("{}: limited {} cells to |U| = {}", self.name, limited, self.max);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_fvm::{PatchField, VolField, fvm};
    use rf_mesh::{BlockPatches, BlockSpec, block_mesh};

    fn mesh_2d() -> Mesh {
        let mut spec = BlockSpec::unit_cube([4, 4, 1]);
        spec.patches = BlockPatches::two_dimensional("walls", "frontAndBack");
        block_mesh(&spec).unwrap()
    }

    fn still(mesh: &Mesh) -> VolVectorField {
        VolField::uniform("Urel", mesh, Vec3::zeros(), |p| {
            PatchField::uniform_fixed_value(Vec3::zeros(), p.size)
        })
        .unwrap()
    }

    #[test]
    fn explicit_sources_accumulate_in_order() {
        let mesh = mesh_2d();
        let g = Vec3::new(0.0, -9.81, 0.0);
        let lower_half = CellSelection::Box {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 0.5, 1.0),
        };
        let list = SourceList::new()
            .with(Box::new(
                ExplicitSource::new("gravity", &mesh, &CellSelection::All, g, VolumeMode::Specific)
                    .unwrap(),
            ))
            .with(Box::new(
                ExplicitSource::new(
                    "push",
                    &mesh,
                    &lower_half,
                    Vec3::new(0.5, 0.0, 0.0),
                    VolumeMode::Absolute,
                )
                .unwrap(),
            ));
        assert_eq!(list.names(), ["gravity", "push"]);
        let su = list.sources(&mesh);
        let total: Vec3 = su
            .iter()
            .zip(mesh.cell_volumes())
            .map(|(s, v)| s * *v)
            .sum();
        assert!((total - Vec3::new(0.5, -9.81, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn fixed_velocity_rewrites_rows() {
        let mesh = mesh_2d();
        let mut u = still(&mesh);
        let mut eqn = fvm::ddt(&mesh, &u, u.internal(), 0.1).unwrap();
        let target = Vec3::new(1.0, 0.0, 0.0);
        let sel = CellSelection::Box {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(0.3, 0.3, 1.0),
        };
        let mut list = SourceList::new()
            .with(Box::new(FixedVelocity::new("fix", &mesh, &sel, target).unwrap()));
        list.constrain(&mesh, &mut eqn, &mut u).unwrap();
        eqn.solve(&mesh, &mut u, &rf_fvm::SolverControls::pbicgstab(1e-12, 0.0))
            .unwrap();
        assert!((u.internal()[0] - target).norm() < 1e-12);
        assert_eq!(u.internal()[5], Vec3::zeros());
    }

    #[test]
    fn mean_velocity_force_hits_target() {
        let mesh = mesh_2d();
        let mut u = still(&mesh);
        let mut eqn = fvm::ddt(&mesh, &u, u.internal(), 0.5).unwrap();
        let mut force = MeanVelocityForce::new(
            "drive",
            &mesh,
            &CellSelection::All,
            Vec3::new(2.0, 0.0, 0.0),
            1.0,
            0.0,
        )
        .unwrap();

        assert!(matches!(
            force.clone().correct(&mesh, &mut u),
            Err(ModelError::NotConstrained { .. })
        ));

        force.constrain(&mesh, &mut eqn, &mut u).unwrap();
        force.correct(&mesh, &mut u).unwrap();
        assert!((force.mean_velocity(&mesh, &u) - 2.0).abs() < 1e-12);
        // rA = dt for a pure ddt system, so the gradient is Ubar / dt
        assert!((force.grad_p() - 4.0).abs() < 1e-12);
        let mut su = vec![Vec3::zeros(); mesh.n_cells()];
        force.add_sup(&mesh, &mut su);
        assert!((su[3] - Vec3::new(4.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn velocity_limit_clips_magnitude() {
        let mesh = mesh_2d();
        let mut u = still(&mesh);
        u.internal_mut()[2] = Vec3::new(3.0, 4.0, 0.0);
        u.internal_mut()[7] = Vec3::new(0.1, 0.0, 0.0);
        let mut lim = VelocityLimit::new("lim", &mesh, &CellSelection::All, 1.0).unwrap();
        lim.correct(&mesh, &mut u).unwrap();
        assert!((u.internal()[2] - Vec3::new(0.6, 0.8, 0.0)).norm() < 1e-12);
        assert_eq!(u.internal()[7], Vec3::new(0.1, 0.0, 0.0));
        assert!(VelocityLimit::new("bad", &mesh, &CellSelection::All, 0.0).is_err());
    }
}
