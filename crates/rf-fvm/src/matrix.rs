//! LDU-addressed finite-volume equation system.
//!
//! An [`FvMatrix`] represents `A psi = b` for one field. Coefficients are
//! stored per cell (`diag`), per internal face (`upper`, `lower`) and per
//! boundary face (`internal_coeffs`, `boundary_coeffs`). Boundary
//! contributions stay out of `diag`/`source` until the system is solved,
//! so `a()` and `h()` can account for them separately.
//!
//! Sign convention: an explicit term written on the left (`A + su`) goes
//! into the source with a minus sign, one written on the right (`A == su`)
//! with a plus sign.

use std::ops::{AddAssign, Neg, SubAssign};

use rayon::prelude::*;
use rf_mesh::Mesh;

use crate::controls::SolverControls;
use crate::error::{FvmError, FvmResult};
use crate::field::{FieldValue, VolField};
use crate::linear::{self, LduSystem, SolverPerformance};

#[derive(Debug, Clone, PartialEq)]
pub struct FvMatrix<T> {
    psi_name: String,
    pub(crate) diag: Vec<f64>,
    pub(crate) upper: Vec<f64>,
    pub(crate) lower: Vec<f64>,
    pub(crate) source: Vec<T>,
    /// Coefficient of the owner value, per boundary face.
    pub(crate) internal_coeffs: Vec<f64>,
    /// Source contribution of each boundary face.
    pub(crate) boundary_coeffs: Vec<T>,
    /// Explicit part of the face flux (non-orthogonal correction).
    pub(crate) face_flux_correction: Option<Vec<T>>,
}

impl<T: FieldValue> FvMatrix<T> {
    /// Empty system for `psi_name` on `mesh`.
    pub fn new(mesh: &Mesh, psi_name: impl Into<String>) -> Self {
        Self {
            psi_name: psi_name.into(),
            diag: vec![0.0; mesh.n_cells()],
            upper: vec![0.0; mesh.n_internal_faces()],
            lower: vec![0.0; mesh.n_internal_faces()],
            source: vec![T::zero(); mesh.n_cells()],
            internal_coeffs: vec![0.0; mesh.n_boundary_faces()],
            boundary_coeffs: vec![T::zero(); mesh.n_boundary_faces()],
            face_flux_correction: None,
        }
    }

    pub fn psi_name(&self) -> &str {
        &self.psi_name
    }

    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn source(&self) -> &[T] {
        &self.source
    }

    pub fn internal_coeffs(&self) -> &[f64] {
        &self.internal_coeffs
    }

    pub fn boundary_coeffs(&self) -> &[T] {
        &self.boundary_coeffs
    }

    pub fn face_flux_correction(&self) -> Option<&[T]> {
        self.face_flux_correction.as_deref()
    }

    pub fn is_symmetric(&self) -> bool {
        self.upper == self.lower
    }

    /// `diag[l] -= lower`, `diag[u] -= upper` for every internal face.
    pub(crate) fn neg_sum_diag(&mut self, mesh: &Mesh) {
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        for f in 0..self.upper.len() {
            self.diag[owner[f]] -= self.lower[f];
            self.diag[neighbour[f]] -= self.upper[f];
        }
    }

    /// `A + su`: explicit per-volume term on the left-hand side.
    pub fn add_explicit_lhs(&mut self, mesh: &Mesh, su: &[T]) -> FvmResult<()> {
        self.check_cells(su.len(), "explicit source")?;
        for (c, (s, v)) in self.source.iter_mut().zip(mesh.cell_volumes()).enumerate() {
            *s -= su[c] * *v;
        }
        Ok(())
    }

    /// `A == su`: explicit per-volume term on the right-hand side.
    pub fn add_explicit_rhs(&mut self, mesh: &Mesh, su: &[T]) -> FvmResult<()> {
        self.check_cells(su.len(), "explicit source")?;
        for (c, (s, v)) in self.source.iter_mut().zip(mesh.cell_volumes()).enumerate() {
            *s += su[c] * *v;
        }
        Ok(())
    }

    fn check_cells(&self, got: usize, what: &str) -> FvmResult<()> {
        if got != self.diag.len() {
            return Err(FvmError::SizeMismatch {
                what: format!("{} for {}", what, self.psi_name),
                expected: self.diag.len(),
                got,
            });
        }
        Ok(())
    }

    /// Implicit under-relaxation toward the current field values.
    ///
    /// The diagonal is first made at least as large as the sum of the
    /// off-diagonal magnitudes (boundary internal coefficients included),
    /// then divided by `alpha`; the difference to the original diagonal
    /// times `psi` goes into the source, so a converged solution is a fixed
    /// point.
    pub fn relax(&mut self, mesh: &Mesh, psi: &VolField<T>, alpha: f64) -> FvmResult<()> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(FvmError::InvalidArg {
                what: format!("relaxation factor {alpha} for {}", self.psi_name),
            });
        }
        if alpha >= 1.0 {
            return Ok(());
        }

        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        let n_internal = mesh.n_internal_faces();

        let d0 = self.diag.clone();
        let mut sum_off = vec![0.0; self.diag.len()];
        for f in 0..self.upper.len() {
            sum_off[owner[f]] += self.upper[f].abs();
            sum_off[neighbour[f]] += self.lower[f].abs();
        }

        let mut d = self.diag.clone();
        for (b, ic) in self.internal_coeffs.iter().enumerate() {
            d[owner[n_internal + b]] += ic.abs();
        }
        for (dc, so) in d.iter_mut().zip(&sum_off) {
            *dc = dc.abs().max(*so) / alpha;
        }
        for (b, ic) in self.internal_coeffs.iter().enumerate() {
            d[owner[n_internal + b]] -= ic;
        }

        for c in 0..d.len() {
            self.source[c] += psi.internal()[c] * (d[c] - d0[c]);
        }
        self.diag = d;
        Ok(())
    }

    /// Overwrite the rows of `cells` so the solution there equals
    /// `values`, moving the couplings of those cells into their
    /// neighbours' sources.
    pub fn set_values(
        &mut self,
        mesh: &Mesh,
        psi: &mut VolField<T>,
        cells: &[usize],
        values: &[T],
    ) -> FvmResult<()> {
        if cells.len() != values.len() {
            return Err(FvmError::SizeMismatch {
                what: format!("constrained values for {}", self.psi_name),
                expected: cells.len(),
                got: values.len(),
            });
        }
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        let n_internal = mesh.n_internal_faces();

        for (&cell, &value) in cells.iter().zip(values) {
            if cell >= self.diag.len() {
                return Err(FvmError::InvalidArg {
                    what: format!("constrained cell {cell} out of range"),
                });
            }
            psi.internal_mut()[cell] = value;
            self.source[cell] = value * self.diag[cell];

            for &f in mesh.cell_faces(cell) {
                if f < n_internal {
                    if owner[f] == cell {
                        self.source[neighbour[f]] -= value * self.lower[f];
                    } else {
                        self.source[owner[f]] -= value * self.upper[f];
                    }
                    self.upper[f] = 0.0;
                    self.lower[f] = 0.0;
                } else {
                    self.internal_coeffs[f - n_internal] = 0.0;
                    self.boundary_coeffs[f - n_internal] = T::zero();
                }
            }
        }
        Ok(())
    }

    /// Per-cell diagonal including boundary contributions, divided by volume.
    pub fn a(&self, mesh: &Mesh) -> Vec<f64> {
        let mut d = self.diag_with_boundary(mesh);
        for (dc, v) in d.iter_mut().zip(mesh.cell_volumes()) {
            *dc /= v;
        }
        d
    }

    /// Off-diagonal part of the system applied to `psi`, plus sources,
    /// divided by volume: `(b - sum_n a_n psi_n) / V`.
    pub fn h(&self, mesh: &Mesh, psi: &VolField<T>) -> Vec<T> {
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        let x = psi.internal();

        let mut h = self.source_with_boundary(mesh);
        for f in 0..self.upper.len() {
            let (l, u) = (owner[f], neighbour[f]);
            h[u] -= x[l] * self.lower[f];
            h[l] -= x[u] * self.upper[f];
        }
        for (hc, v) in h.iter_mut().zip(mesh.cell_volumes()) {
            *hc = *hc * (1.0 / v);
        }
        h
    }

    /// Face flux implied by the system for the solved `psi`.
    ///
    /// Internal faces give `upper psi_n - lower psi_o`, boundary faces
    /// `internal_coeff psi_o - boundary_coeff`, plus any stored face-flux
    /// correction. Faces on `empty` patches carry zero.
    pub fn flux(&self, mesh: &Mesh, psi: &VolField<T>) -> Vec<T> {
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        let n_internal = mesh.n_internal_faces();
        let x = psi.internal();

        let mut flux = vec![T::zero(); mesh.n_faces()];
        for f in 0..n_internal {
            flux[f] = x[neighbour[f]] * self.upper[f] - x[owner[f]] * self.lower[f];
        }
        for patch in mesh.patches() {
            if patch.is_empty_kind() {
                continue;
            }
            for f in patch.faces() {
                let b = f - n_internal;
                flux[f] = x[owner[f]] * self.internal_coeffs[b] - self.boundary_coeffs[b];
            }
        }
        if let Some(corr) = &self.face_flux_correction {
            for (fl, c) in flux.iter_mut().zip(corr) {
                *fl += *c;
            }
        }
        flux
    }

    fn diag_with_boundary(&self, mesh: &Mesh) -> Vec<f64> {
        let owner = mesh.owner();
        let n_internal = mesh.n_internal_faces();
        let mut d = self.diag.clone();
        for (b, ic) in self.internal_coeffs.iter().enumerate() {
            d[owner[n_internal + b]] += ic;
        }
        d
    }

    fn source_with_boundary(&self, mesh: &Mesh) -> Vec<T> {
        let owner = mesh.owner();
        let n_internal = mesh.n_internal_faces();
        let mut s = self.source.clone();
        for (b, bc) in self.boundary_coeffs.iter().enumerate() {
            s[owner[n_internal + b]] += *bc;
        }
        s
    }

    /// Solve component by component, update `psi` in place and re-evaluate
    /// its boundary conditions.
    pub fn solve(
        &self,
        mesh: &Mesh,
        psi: &mut VolField<T>,
        controls: &SolverControls,
    ) -> FvmResult<Vec<SolverPerformance>> {
        if psi.internal().len() != self.diag.len() {
            return Err(FvmError::SizeMismatch {
                what: format!("solution field {}", psi.name()),
                expected: self.diag.len(),
                got: psi.internal().len(),
            });
        }

        let diag = self.diag_with_boundary(mesh);
        let source = self.source_with_boundary(mesh);
        let n_internal = mesh.n_internal_faces();
        let system = LduSystem {
            diag: &diag,
            upper: &self.upper,
            lower: &self.lower,
            l: &mesh.owner()[..n_internal],
            u: mesh.neighbour(),
        };

        // components are independent systems sharing one matrix
        let solved: Vec<(Vec<f64>, SolverPerformance)> = (0..T::N_COMPONENTS)
            .into_par_iter()
            .map(|d| {
                let mut x: Vec<f64> = psi.internal().iter().map(|v| v.component(d)).collect();
                let b: Vec<f64> = source.iter().map(|v| v.component(d)).collect();
                let name = T::component_name(psi.name(), d);
                let perf = linear::solve(&system, &b, &mut x, controls, &name);
                (x, perf)
            })
            .collect();

        let mut perfs = Vec::with_capacity(T::N_COMPONENTS);
        for (d, (x, perf)) in solved.into_iter().enumerate() {
            perf.log();
            for (c, xc) in x.iter().enumerate() {
                psi.internal_mut()[c].set_component(d, *xc);
            }
            perfs.push(perf);
        }
        psi.correct_boundary_conditions(mesh);
        Ok(perfs)
    }

    /// Residual `b - A psi` per cell, boundary contributions included.
    pub fn residual(&self, mesh: &Mesh, psi: &VolField<T>) -> Vec<T> {
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        let x = psi.internal();
        let diag = self.diag_with_boundary(mesh);
        let mut r = self.source_with_boundary(mesh);
        for c in 0..r.len() {
            r[c] -= x[c] * diag[c];
        }
        for f in 0..self.upper.len() {
            let (l, u) = (owner[f], neighbour[f]);
            r[u] -= x[l] * self.lower[f];
            r[l] -= x[u] * self.upper[f];
        }
        r
    }
}

impl FvMatrix<f64> {
    /// Pin `psi[cell] = value` by doubling the diagonal of that row.
    ///
    /// Only meaningful for a system whose solution is otherwise determined
    /// up to a constant, where the pin is exact at convergence.
    pub fn set_reference(&mut self, cell: usize, value: f64) -> FvmResult<()> {
        if cell >= self.diag.len() {
            return Err(FvmError::InvalidArg {
                what: format!(
                    "reference cell {cell} out of range for {} cells",
                    self.diag.len()
                ),
            });
        }
        self.source[cell] += self.diag[cell] * value;
        self.diag[cell] += self.diag[cell];
        Ok(())
    }
}

impl<T: FieldValue> AddAssign<&FvMatrix<T>> for FvMatrix<T> {
    fn add_assign(&mut self, rhs: &FvMatrix<T>) {
        debug_assert_eq!(self.diag.len(), rhs.diag.len());
        add_into(&mut self.diag, &rhs.diag, 1.0);
        add_into(&mut self.upper, &rhs.upper, 1.0);
        add_into(&mut self.lower, &rhs.lower, 1.0);
        add_into(&mut self.internal_coeffs, &rhs.internal_coeffs, 1.0);
        for (a, b) in self.source.iter_mut().zip(&rhs.source) {
            *a += *b;
        }
        for (a, b) in self.boundary_coeffs.iter_mut().zip(&rhs.boundary_coeffs) {
            *a += *b;
        }
        merge_correction(&mut self.face_flux_correction, &rhs.face_flux_correction, 1.0);
    }
}

impl<T: FieldValue> SubAssign<&FvMatrix<T>> for FvMatrix<T> {
    fn sub_assign(&mut self, rhs: &FvMatrix<T>) {
        debug_assert_eq!(self.diag.len(), rhs.diag.len());
        add_into(&mut self.diag, &rhs.diag, -1.0);
        add_into(&mut self.upper, &rhs.upper, -1.0);
        add_into(&mut self.lower, &rhs.lower, -1.0);
        add_into(&mut self.internal_coeffs, &rhs.internal_coeffs, -1.0);
        for (a, b) in self.source.iter_mut().zip(&rhs.source) {
            *a -= *b;
        }
        for (a, b) in self.boundary_coeffs.iter_mut().zip(&rhs.boundary_coeffs) {
            *a -= *b;
        }
        merge_correction(&mut self.face_flux_correction, &rhs.face_flux_correction, -1.0);
    }
}

impl<T: FieldValue> std::ops::Add for FvMatrix<T> {
    type Output = FvMatrix<T>;

    fn add(mut self, rhs: FvMatrix<T>) -> FvMatrix<T> {
        self += &rhs;
        self
    }
}

impl<T: FieldValue> std::ops::Sub for FvMatrix<T> {
    type Output = FvMatrix<T>;

    fn sub(mut self, rhs: FvMatrix<T>) -> FvMatrix<T> {
        self -= &rhs;
        self
    }
}

impl<T: FieldValue> Neg for FvMatrix<T> {
    type Output = FvMatrix<T>;

    fn neg(mut self) -> FvMatrix<T> {
        self.diag.iter_mut().for_each(|v| *v = -*v);
        self.upper.iter_mut().for_each(|v| *v = -*v);
        self.lower.iter_mut().for_each(|v| *v = -*v);
        self.internal_coeffs.iter_mut().for_each(|v| *v = -*v);
        self.source.iter_mut().for_each(|v| *v = -*v);
        self.boundary_coeffs.iter_mut().for_each(|v| *v = -*v);
        if let Some(corr) = &mut self.face_flux_correction {
            corr.iter_mut().for_each(|v| *v = -*v);
        }
        self
    }
}

fn add_into(a: &mut [f64], b: &[f64], sign: f64) {
    for (x, y) in a.iter_mut().zip(b) {
        *x += sign * y;
    }
}

fn merge_correction<T: FieldValue>(a: &mut Option<Vec<T>>, b: &Option<Vec<T>>, sign: f64) {
    if let Some(b) = b {
        match a {
            Some(a) => {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += *y * sign;
                }
            }
            None => *a = Some(b.iter().map(|y| *y * sign).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::PatchField;
    use rf_mesh::{BlockSpec, block_mesh};

    fn line_mesh(n: usize) -> Mesh {
        block_mesh(&BlockSpec::unit_cube([n, 1, 1])).unwrap()
    }

    /// 1-D diffusion matrix with psi fixed to 0 at xmin and 1 at xmax,
    /// built by hand on a line of cells.
    fn diffusion(mesh: &Mesh) -> (FvMatrix<f64>, VolField<f64>) {
        let psi = VolField::new(
            "T",
            mesh,
            vec![0.0; mesh.n_cells()],
            mesh.patches()
                .iter()
                .map(|p| match p.name.as_str() {
                    "xmin" => PatchField::uniform_fixed_value(0.0, p.size),
                    "xmax" => PatchField::uniform_fixed_value(1.0, p.size),
                    _ => PatchField::zero_gradient(p.size),
                })
                .collect(),
        )
        .unwrap();
        let m = crate::fvm::laplacian(mesh, &vec![1.0; mesh.n_faces()], &psi).unwrap();
        (m, psi)
    }

    #[test]
    fn explicit_sources_have_opposite_signs() {
        let mesh = line_mesh(3);
        let mut lhs = FvMatrix::<f64>::new(&mesh, "T");
        let mut rhs = FvMatrix::<f64>::new(&mesh, "T");
        lhs.add_explicit_lhs(&mesh, &[1.0, 2.0, 3.0]).unwrap();
        rhs.add_explicit_rhs(&mesh, &[1.0, 2.0, 3.0]).unwrap();
        for c in 0..3 {
            assert!((lhs.source()[c] + rhs.source()[c]).abs() < 1e-15);
        }
        assert!(lhs.add_explicit_lhs(&mesh, &[1.0]).is_err());
    }

    #[test]
    fn neg_and_sub_cancel() {
        let mesh = line_mesh(4);
        let (m, _) = diffusion(&mesh);
        let zero = m.clone() + (-m.clone());
        assert!(zero.diag().iter().all(|v| v.abs() < 1e-12));
        assert!(zero.upper().iter().all(|v| v.abs() < 1e-12));
        let zero = m.clone() - m;
        assert!(zero.internal_coeffs().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn solve_reproduces_linear_profile_and_flux() {
        let mesh = line_mesh(8);
        let (m, mut psi) = diffusion(&mesh);
        let perf = m
            .solve(&mesh, &mut psi, &SolverControls::pcg(1e-12, 0.0))
            .unwrap();
        assert_eq!(perf.len(), 1);
        for (c, x) in mesh.cell_centres().iter().enumerate() {
            assert!((psi.internal()[c] - x.x).abs() < 1e-9);
        }
        // uniform gradient 1 through unit cross-section
        let flux = m.flux(&mesh, &psi);
        for f in 0..mesh.n_internal_faces() {
            assert!((flux[f] - 1.0).abs() < 1e-8);
        }
        let xmin = mesh.patch_by_name("xmin").unwrap();
        for f in xmin.faces() {
            assert!((flux[f] + 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn h_over_a_is_the_jacobi_update() {
        let mesh = line_mesh(5);
        let (m, mut psi) = diffusion(&mesh);
        m.solve(&mesh, &mut psi, &SolverControls::pcg(1e-13, 0.0))
            .unwrap();
        // at the solution, H/A reproduces psi
        let a = m.a(&mesh);
        let h = m.h(&mesh, &psi);
        for c in 0..mesh.n_cells() {
            assert!((h[c] / a[c] - psi.internal()[c]).abs() < 1e-9);
        }
    }

    #[test]
    fn relaxation_keeps_the_solution_a_fixed_point() {
        let mesh = line_mesh(6);
        let (m, mut psi) = diffusion(&mesh);
        let mut m = -m;
        m.solve(&mesh, &mut psi, &SolverControls::pcg(1e-13, 0.0))
            .unwrap();
        let before = psi.internal().to_vec();
        m.relax(&mesh, &psi, 0.5).unwrap();
        let r = m.residual(&mesh, &psi);
        let scale: f64 = m.diag().iter().map(|d| d.abs()).sum();
        for rc in r {
            assert!(rc.abs() < 1e-9 * scale);
        }
        m.solve(&mesh, &mut psi, &SolverControls::pcg(1e-13, 0.0))
            .unwrap();
        for (a, b) in psi.internal().iter().zip(before) {
            assert!((a - b).abs() < 1e-9);
        }
        assert!(m.relax(&mesh, &psi, 0.0).is_err());
    }

    #[test]
    fn set_values_pins_cells() {
        let mesh = line_mesh(6);
        let (m, mut psi) = diffusion(&mesh);
        let mut m = -m;
        m.set_values(&mesh, &mut psi, &[2], &[5.0]).unwrap();
        m.solve(&mesh, &mut psi, &SolverControls::pbicgstab(1e-13, 0.0))
            .unwrap();
        assert!((psi.internal()[2] - 5.0).abs() < 1e-10);
        // cells left of the pin interpolate between 0 and 5
        assert!(psi.internal()[1] > psi.internal()[0]);
        assert!(psi.internal()[1] < 5.0);
        assert!(m.set_values(&mesh, &mut psi, &[99], &[0.0]).is_err());
    }

    #[test]
    fn reference_pins_a_floating_solution() {
        let mesh = line_mesh(5);
        let psi0 = VolField::uniform("p", &mesh, 0.0, |p| PatchField::zero_gradient(p.size))
            .unwrap();
        let mut psi = psi0.clone();
        let mut m = crate::fvm::laplacian(&mesh, &vec![1.0; mesh.n_faces()], &psi0).unwrap();
        m.set_reference(0, 3.0).unwrap();
        m.solve(&mesh, &mut psi, &SolverControls::pcg(1e-12, 0.0))
            .unwrap();
        for v in psi.internal() {
            assert!((v - 3.0).abs() < 1e-9);
        }
        assert!(m.set_reference(7, 0.0).is_err());
    }
}
