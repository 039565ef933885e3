//! Immutable finite-volume mesh.

use std::ops::Range;

use rf_core::{PatchId, Vec3};

use crate::error::{MeshError, MeshResult};
use crate::geometry::Geometry;

/// Physical role of a boundary patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Generic inlet/outlet style boundary.
    Patch,
    /// Solid wall.
    Wall,
    /// Collapsed direction of a 2-D case. Faces carry no flux and are
    /// skipped by every operator.
    Empty,
}

/// A contiguous range of boundary faces sharing a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub id: PatchId,
    pub name: String,
    pub kind: PatchKind,
    /// Global index of the first face.
    pub start: usize,
    pub size: usize,
}

impl Patch {
    pub fn faces(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    pub fn is_empty_kind(&self) -> bool {
        self.kind == PatchKind::Empty
    }
}

/// Polyhedral mesh with owner/neighbour addressing.
///
/// Faces `0..n_internal_faces()` are internal and ordered by owner, then
/// neighbour, with `owner < neighbour`. The remaining faces are boundary
/// faces, grouped per patch in patch order. Area vectors point from owner
/// to neighbour, or out of the domain on the boundary.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub(crate) cell_centres: Vec<Vec3>,
    pub(crate) cell_volumes: Vec<f64>,
    pub(crate) owner: Vec<usize>,
    pub(crate) neighbour: Vec<usize>,
    pub(crate) face_centres: Vec<Vec3>,
    pub(crate) face_areas: Vec<Vec3>,
    pub(crate) mag_face_areas: Vec<f64>,
    pub(crate) patches: Vec<Patch>,
    /// Patch index per boundary face (offset by `n_internal_faces`).
    pub(crate) boundary_patch: Vec<usize>,
    pub(crate) cell_face_offsets: Vec<usize>,
    pub(crate) cell_face_list: Vec<usize>,
    pub(crate) geometry: Geometry,
}

impl Mesh {
    pub fn n_cells(&self) -> usize {
        self.cell_centres.len()
    }

    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }

    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_internal_faces()
    }

    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    /// Neighbour cells of the internal faces.
    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    pub fn cell_centres(&self) -> &[Vec3] {
        &self.cell_centres
    }

    pub fn cell_volumes(&self) -> &[f64] {
        &self.cell_volumes
    }

    pub fn total_volume(&self) -> f64 {
        self.cell_volumes.iter().sum()
    }

    pub fn face_centres(&self) -> &[Vec3] {
        &self.face_centres
    }

    /// Face area vectors `Sf`.
    pub fn face_areas(&self) -> &[Vec3] {
        &self.face_areas
    }

    /// Face area magnitudes `|Sf|`.
    pub fn mag_face_areas(&self) -> &[f64] {
        &self.mag_face_areas
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(id.index())
    }

    pub fn patch_by_name(&self, name: &str) -> MeshResult<&Patch> {
        self.patches
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| MeshError::UnknownPatch {
                name: name.to_string(),
            })
    }

    /// Patch owning a boundary face, `None` for internal faces.
    pub fn patch_of_face(&self, face: usize) -> Option<&Patch> {
        let local = face.checked_sub(self.n_internal_faces())?;
        self.boundary_patch
            .get(local)
            .and_then(|&p| self.patches.get(p))
    }

    pub fn is_internal_face(&self, face: usize) -> bool {
        face < self.n_internal_faces()
    }

    /// Faces bounding `cell`, internal and boundary.
    pub fn cell_faces(&self, cell: usize) -> &[usize] {
        let start = self.cell_face_offsets[cell];
        let end = self.cell_face_offsets[cell + 1];
        &self.cell_face_list[start..end]
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Owner-side linear interpolation weight per face (1 on the boundary).
    pub fn weights(&self) -> &[f64] {
        &self.geometry.weights
    }

    pub fn delta_coeffs(&self) -> &[f64] {
        &self.geometry.delta_coeffs
    }

    pub fn non_orth_delta_coeffs(&self) -> &[f64] {
        &self.geometry.non_orth_delta_coeffs
    }

    pub fn non_orth_correction_vectors(&self) -> &[Vec3] {
        &self.geometry.non_orth_correction_vectors
    }

    /// True when any internal face is non-orthogonal beyond round-off.
    pub fn is_non_orthogonal(&self) -> bool {
        self.geometry.max_non_orthogonality > 1.0e-9
    }

    /// Axis-aligned bounds of the face centres.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut lo = Vec3::repeat(f64::INFINITY);
        let mut hi = Vec3::repeat(f64::NEG_INFINITY);
        for c in &self.face_centres {
            lo = lo.inf(c);
            hi = hi.sup(c);
        }
        (lo, hi)
    }

    /// Cell whose centre is nearest to `point`, `None` when the point lies
    /// outside the mesh bounds.
    pub fn find_cell(&self, point: &Vec3) -> Option<usize> {
        let (lo, hi) = self.bounds();
        let tol = 1.0e-9 * (hi - lo).norm().max(1.0);
        let inside = (0..3).all(|d| point[d] >= lo[d] - tol && point[d] <= hi[d] + tol);
        if !inside {
            return None;
        }
        self.cell_centres
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (c - point).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use crate::block::{BlockSpec, block_mesh};

    #[test]
    fn patch_lookup_and_face_ownership() {
        let mesh = block_mesh(&BlockSpec::unit_cube([2, 2, 1])).unwrap();
        let xmax = mesh.patch_by_name("xmax").unwrap();
        assert_eq!(xmax.size, 2);
        for face in xmax.faces() {
            assert_eq!(mesh.patch_of_face(face).unwrap().name, "xmax");
            assert!(!mesh.is_internal_face(face));
        }
        assert!(mesh.patch_of_face(0).is_none());
        assert!(mesh.patch_by_name("nope").is_err());
    }

    #[test]
    fn find_cell_inside_and_outside() {
        let mesh = block_mesh(&BlockSpec::unit_cube([4, 4, 1])).unwrap();
        let cell = mesh.find_cell(&rf_core::Vec3::new(0.9, 0.1, 0.5)).unwrap();
        let c = mesh.cell_centres()[cell];
        assert!((c.x - 0.875).abs() < 1e-12);
        assert!((c.y - 0.125).abs() < 1e-12);
        assert!(mesh.find_cell(&rf_core::Vec3::new(2.0, 0.5, 0.5)).is_none());
    }

    #[test]
    fn every_cell_lists_its_faces() {
        let mesh = block_mesh(&BlockSpec::unit_cube([3, 2, 2])).unwrap();
        for cell in 0..mesh.n_cells() {
            assert_eq!(mesh.cell_faces(cell).len(), 6);
        }
    }
}
