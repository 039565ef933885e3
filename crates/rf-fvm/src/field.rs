//! Cell-centred fields with per-patch boundary conditions.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use rf_core::Vec3;
use rf_mesh::{Mesh, PatchKind};

use crate::error::{FvmError, FvmResult};

/// Value stored per cell: a scalar or a 3-vector.
pub trait FieldValue:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    const N_COMPONENTS: usize;

    fn zero() -> Self;
    fn component(&self, d: usize) -> f64;
    fn set_component(&mut self, d: usize, v: f64);
    fn mag(&self) -> f64;

    /// Name of component `d` of a field called `base` ("Urelx", "p").
    fn component_name(base: &str, d: usize) -> String {
        if Self::N_COMPONENTS == 1 {
            base.to_string()
        } else {
            format!("{}{}", base, ["x", "y", "z"][d.min(2)])
        }
    }
}

impl FieldValue for f64 {
    const N_COMPONENTS: usize = 1;

    fn zero() -> Self {
        0.0
    }

    fn component(&self, _d: usize) -> f64 {
        *self
    }

    fn set_component(&mut self, _d: usize, v: f64) {
        *self = v;
    }

    fn mag(&self) -> f64 {
        self.abs()
    }
}

impl FieldValue for Vec3 {
    const N_COMPONENTS: usize = 3;

    fn zero() -> Self {
        Vec3::zeros()
    }

    fn component(&self, d: usize) -> f64 {
        self[d]
    }

    fn set_component(&mut self, d: usize, v: f64) {
        self[d] = v;
    }

    fn mag(&self) -> f64 {
        self.norm()
    }
}

/// Boundary condition policy of one patch.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchFieldKind<T> {
    FixedValue,
    ZeroGradient,
    /// Prescribed normal gradient per face.
    FixedGradient(Vec<T>),
    /// Values assigned by whoever derives the field.
    Calculated,
    /// Placeholder on `empty` mesh patches.
    Empty,
}

impl<T> PatchFieldKind<T> {
    pub fn label(&self) -> &'static str {
        match self {
            PatchFieldKind::FixedValue => "fixedValue",
            PatchFieldKind::ZeroGradient => "zeroGradient",
            PatchFieldKind::FixedGradient(_) => "fixedGradient",
            PatchFieldKind::Calculated => "calculated",
            PatchFieldKind::Empty => "empty",
        }
    }
}

/// Boundary values of one patch together with their policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchField<T> {
    pub kind: PatchFieldKind<T>,
    pub values: Vec<T>,
}

impl<T: FieldValue> PatchField<T> {
    pub fn fixed_value(values: Vec<T>) -> Self {
        Self {
            kind: PatchFieldKind::FixedValue,
            values,
        }
    }

    pub fn uniform_fixed_value(value: T, size: usize) -> Self {
        Self::fixed_value(vec![value; size])
    }

    pub fn zero_gradient(size: usize) -> Self {
        Self {
            kind: PatchFieldKind::ZeroGradient,
            values: vec![T::zero(); size],
        }
    }

    pub fn fixed_gradient(gradient: Vec<T>) -> Self {
        let size = gradient.len();
        Self {
            kind: PatchFieldKind::FixedGradient(gradient),
            values: vec![T::zero(); size],
        }
    }

    pub fn calculated(values: Vec<T>) -> Self {
        Self {
            kind: PatchFieldKind::Calculated,
            values,
        }
    }

    pub fn empty(size: usize) -> Self {
        Self {
            kind: PatchFieldKind::Empty,
            values: vec![T::zero(); size],
        }
    }

    pub fn fixes_value(&self) -> bool {
        matches!(self.kind, PatchFieldKind::FixedValue)
    }

    pub fn is_empty_kind(&self) -> bool {
        matches!(self.kind, PatchFieldKind::Empty)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Update derived boundary values from the adjacent cell values.
    pub fn evaluate(&mut self, patch_internal: &[T], delta_coeffs: &[f64]) {
        match &self.kind {
            PatchFieldKind::ZeroGradient => {
                self.values.copy_from_slice(patch_internal);
            }
            PatchFieldKind::FixedGradient(g) => {
                for i in 0..self.values.len() {
                    self.values[i] = patch_internal[i] + g[i] * (1.0 / delta_coeffs[i]);
                }
            }
            PatchFieldKind::FixedValue | PatchFieldKind::Calculated | PatchFieldKind::Empty => {}
        }
    }

    /// Coefficient of the cell value in the face value.
    pub fn value_internal_coeff(&self) -> Option<f64> {
        match self.kind {
            PatchFieldKind::FixedValue | PatchFieldKind::Empty => Some(0.0),
            PatchFieldKind::ZeroGradient | PatchFieldKind::FixedGradient(_) => Some(1.0),
            PatchFieldKind::Calculated => None,
        }
    }

    /// Constant part of the face value.
    pub fn value_boundary_coeff(&self, i: usize, delta: f64) -> T {
        match &self.kind {
            PatchFieldKind::FixedValue => self.values[i],
            PatchFieldKind::FixedGradient(g) => g[i] * (1.0 / delta),
            _ => T::zero(),
        }
    }

    /// Coefficient of the cell value in the face-normal gradient.
    pub fn gradient_internal_coeff(&self, delta: f64) -> Option<f64> {
        match self.kind {
            PatchFieldKind::FixedValue => Some(-delta),
            PatchFieldKind::Calculated => None,
            _ => Some(0.0),
        }
    }

    /// Constant part of the face-normal gradient.
    pub fn gradient_boundary_coeff(&self, i: usize, delta: f64) -> T {
        match &self.kind {
            PatchFieldKind::FixedValue => self.values[i] * delta,
            PatchFieldKind::FixedGradient(g) => g[i],
            _ => T::zero(),
        }
    }
}

/// Cell values plus boundary values per patch.
#[derive(Debug, Clone, PartialEq)]
pub struct VolField<T> {
    name: String,
    internal: Vec<T>,
    boundary: Vec<PatchField<T>>,
    prev_iter: Option<Vec<T>>,
}

pub type VolScalarField = VolField<f64>;
pub type VolVectorField = VolField<Vec3>;

impl<T: FieldValue> VolField<T> {
    /// Build a field, checking sizes and `empty` patch agreement against
    /// the mesh, then evaluate derived boundary values.
    pub fn new(
        name: impl Into<String>,
        mesh: &Mesh,
        internal: Vec<T>,
        boundary: Vec<PatchField<T>>,
    ) -> FvmResult<Self> {
        let name = name.into();
        if internal.len() != mesh.n_cells() {
            return Err(FvmError::SizeMismatch {
                what: format!("{} internal values", name),
                expected: mesh.n_cells(),
                got: internal.len(),
            });
        }
        if boundary.len() != mesh.patches().len() {
            return Err(FvmError::SizeMismatch {
                what: format!("{} patch count", name),
                expected: mesh.patches().len(),
                got: boundary.len(),
            });
        }
        for (patch, pf) in mesh.patches().iter().zip(&boundary) {
            if pf.values.len() != patch.size {
                return Err(FvmError::SizeMismatch {
                    what: format!("{} values on patch {}", name, patch.name),
                    expected: patch.size,
                    got: pf.values.len(),
                });
            }
            if let PatchFieldKind::FixedGradient(g) = &pf.kind
                && g.len() != patch.size
            {
                return Err(FvmError::SizeMismatch {
                    what: format!("{} gradient on patch {}", name, patch.name),
                    expected: patch.size,
                    got: g.len(),
                });
            }
            let mesh_empty = patch.kind == PatchKind::Empty;
            if mesh_empty != pf.is_empty_kind() {
                return Err(FvmError::PatchKindMismatch {
                    field: name,
                    patch: patch.name.clone(),
                    expected: if mesh_empty { "empty" } else { "non-empty" },
                    found: pf.kind.label(),
                });
            }
        }

        let mut field = Self {
            name,
            internal,
            boundary,
            prev_iter: None,
        };
        field.correct_boundary_conditions(mesh);
        Ok(field)
    }

    /// Uniform field with the same boundary policy on every non-empty patch.
    pub fn uniform(
        name: impl Into<String>,
        mesh: &Mesh,
        value: T,
        make_patch: impl Fn(&rf_mesh::Patch) -> PatchField<T>,
    ) -> FvmResult<Self> {
        let boundary = mesh
            .patches()
            .iter()
            .map(|p| {
                if p.is_empty_kind() {
                    PatchField::empty(p.size)
                } else {
                    make_patch(p)
                }
            })
            .collect();
        Self::new(name, mesh, vec![value; mesh.n_cells()], boundary)
    }

    /// Derived field: calculated on every non-empty patch, boundary values
    /// copied from the adjacent cells.
    pub fn calculated(name: impl Into<String>, mesh: &Mesh, internal: Vec<T>) -> FvmResult<Self> {
        let mut boundary = Vec::with_capacity(mesh.patches().len());
        for p in mesh.patches() {
            if p.is_empty_kind() {
                boundary.push(PatchField::empty(p.size));
            } else {
                let values = p.faces().map(|f| internal[mesh.owner()[f]]).collect();
                boundary.push(PatchField::calculated(values));
            }
        }
        Self::new(name, mesh, internal, boundary)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    pub fn internal_mut(&mut self) -> &mut [T] {
        &mut self.internal
    }

    pub fn boundary(&self) -> &[PatchField<T>] {
        &self.boundary
    }

    pub fn boundary_mut(&mut self) -> &mut [PatchField<T>] {
        &mut self.boundary
    }

    /// Value on boundary face `face` (global face index).
    pub fn boundary_face_value(&self, mesh: &Mesh, face: usize) -> T {
        match mesh.patch_of_face(face) {
            Some(p) => self.boundary[p.id.index()].values[face - p.start],
            None => T::zero(),
        }
    }

    /// True when no patch fixes the value, so the level of the field is
    /// undetermined by its boundary conditions.
    pub fn needs_reference(&self) -> bool {
        !self.boundary.iter().any(|pf| pf.fixes_value())
    }

    /// Re-evaluate zero/fixed-gradient boundary values.
    pub fn correct_boundary_conditions(&mut self, mesh: &Mesh) {
        for (pi, patch) in mesh.patches().iter().enumerate() {
            let internal: Vec<T> = patch
                .faces()
                .map(|f| self.internal[mesh.owner()[f]])
                .collect();
            let delta = &mesh.delta_coeffs()[patch.faces()];
            self.boundary[pi].evaluate(&internal, delta);
        }
    }

    /// Replace internal values, keeping the boundary policy.
    pub fn assign_internal(&mut self, values: &[T]) -> FvmResult<()> {
        if values.len() != self.internal.len() {
            return Err(FvmError::SizeMismatch {
                what: format!("{} internal values", self.name),
                expected: self.internal.len(),
                got: values.len(),
            });
        }
        self.internal.copy_from_slice(values);
        Ok(())
    }

    pub fn store_prev_iter(&mut self) {
        match &mut self.prev_iter {
            Some(prev) => prev.copy_from_slice(&self.internal),
            None => self.prev_iter = Some(self.internal.clone()),
        }
    }

    pub fn prev_iter(&self) -> Option<&[T]> {
        self.prev_iter.as_deref()
    }

    /// Explicit relaxation toward the stored previous iterate:
    /// `psi = prev + alpha * (psi - prev)`. No-op without a stored iterate.
    pub fn relax(&mut self, mesh: &Mesh, alpha: f64) {
        if let Some(prev) = &self.prev_iter {
            for (v, p) in self.internal.iter_mut().zip(prev) {
                *v = *p + (*v - *p) * alpha;
            }
            self.correct_boundary_conditions(mesh);
        }
    }

    /// Largest cell magnitude.
    pub fn max_mag(&self) -> f64 {
        self.internal.iter().map(|v| v.mag()).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_mesh::{BlockPatches, BlockSpec, block_mesh};

    fn mesh_2d() -> Mesh {
        let mut spec = BlockSpec::unit_cube([3, 3, 1]);
        spec.patches = BlockPatches::two_dimensional("walls", "frontAndBack");
        block_mesh(&spec).unwrap()
    }

    #[test]
    fn zero_gradient_copies_cells() {
        let mesh = mesh_2d();
        let internal: Vec<f64> = (0..mesh.n_cells()).map(|i| i as f64).collect();
        let field = VolField::new(
            "p",
            &mesh,
            internal,
            vec![PatchField::zero_gradient(12), PatchField::empty(18)],
        )
        .unwrap();
        for f in mesh.patches()[0].faces() {
            assert_eq!(
                field.boundary_face_value(&mesh, f),
                field.internal()[mesh.owner()[f]]
            );
        }
        assert!(field.needs_reference());
    }

    #[test]
    fn fixed_gradient_extrapolates_half_cell() {
        let mesh = mesh_2d();
        let field = VolField::new(
            "T",
            &mesh,
            vec![1.0; mesh.n_cells()],
            vec![PatchField::fixed_gradient(vec![3.0; 12]), PatchField::empty(18)],
        )
        .unwrap();
        // half cell = 1/6
        let v = field.boundary()[0].values[0];
        assert!((v - 1.5).abs() < 1e-12);
    }

    #[test]
    fn empty_patch_must_match_mesh() {
        let mesh = mesh_2d();
        let err = VolField::new(
            "p",
            &mesh,
            vec![0.0; mesh.n_cells()],
            vec![PatchField::zero_gradient(12), PatchField::zero_gradient(18)],
        )
        .unwrap_err();
        assert!(matches!(err, FvmError::PatchKindMismatch { .. }));
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mesh = mesh_2d();
        let err = VolField::<f64>::new("p", &mesh, vec![0.0; 2], vec![]).unwrap_err();
        assert!(matches!(err, FvmError::SizeMismatch { .. }));
    }

    #[test]
    fn relax_blends_with_previous_iterate() {
        let mesh = mesh_2d();
        let mut p = VolField::uniform("p", &mesh, 0.0, |pa| PatchField::zero_gradient(pa.size))
            .unwrap();
        p.relax(&mesh, 0.5);
        assert!(p.internal().iter().all(|&v| v == 0.0));

        p.store_prev_iter();
        p.internal_mut().iter_mut().for_each(|v| *v = 4.0);
        p.relax(&mesh, 0.25);
        assert!(p.internal().iter().all(|&v| (v - 1.0).abs() < 1e-15));
        assert!((p.boundary()[0].values[0] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn calculated_field_copies_cells_to_boundary() {
        let mesh = mesh_2d();
        let cells: Vec<Vec3> = (0..mesh.n_cells())
            .map(|i| Vec3::new(i as f64, 0.0, 0.0))
            .collect();
        let u = VolField::calculated("U", &mesh, cells).unwrap();
        assert!(u.boundary()[1].is_empty_kind());
        assert_eq!(u.boundary()[0].kind, PatchFieldKind::Calculated);
        assert_eq!(u.max_mag(), (mesh.n_cells() - 1) as f64);
        assert_eq!(<Vec3 as FieldValue>::component_name("Urel", 1), "Urely");
        assert_eq!(<f64 as FieldValue>::component_name("p", 0), "p");
    }
}
