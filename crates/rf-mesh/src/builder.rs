//! Incremental mesh builder.

use rf_core::{PatchId, Vec3};

use crate::error::{MeshError, MeshResult};
use crate::geometry::Geometry;
use crate::mesh::{Mesh, Patch, PatchKind};
use crate::validate;

#[derive(Debug, Clone, Copy)]
struct FaceSpec {
    owner: usize,
    neighbour: usize,
    centre: Vec3,
    area: Vec3,
}

/// Builder for constructing a mesh from explicit cells and faces.
///
/// Faces may be added in any order and with either orientation; `build()`
/// reorders them into owner/neighbour upper-triangular order, groups
/// boundary faces per patch, validates and computes geometry.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    cell_centres: Vec<Vec3>,
    cell_volumes: Vec<f64>,
    internal: Vec<FaceSpec>,
    boundary: Vec<(usize, FaceSpec)>,
    patches: Vec<(String, PatchKind)>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell and return its index.
    pub fn add_cell(&mut self, centre: Vec3, volume: f64) -> usize {
        self.cell_centres.push(centre);
        self.cell_volumes.push(volume);
        self.cell_centres.len() - 1
    }

    /// Add a face shared by two cells. `area` points from `a` to `b`.
    pub fn add_internal_face(&mut self, a: usize, b: usize, centre: Vec3, area: Vec3) {
        let face = if a <= b {
            FaceSpec {
                owner: a,
                neighbour: b,
                centre,
                area,
            }
        } else {
            FaceSpec {
                owner: b,
                neighbour: a,
                centre,
                area: -area,
            }
        };
        self.internal.push(face);
    }

    /// Register a patch, or return the existing one with the same name.
    pub fn add_patch(&mut self, name: impl Into<String>, kind: PatchKind) -> MeshResult<PatchId> {
        let name = name.into();
        if let Some(i) = self.patches.iter().position(|(n, _)| *n == name) {
            if self.patches[i].1 != kind {
                return Err(MeshError::PatchKindConflict { name });
            }
            return Ok(PatchId::from_index(i));
        }
        self.patches.push((name, kind));
        Ok(PatchId::from_index(self.patches.len() - 1))
    }

    /// Add a boundary face. `area` points out of the domain.
    pub fn add_boundary_face(&mut self, patch: PatchId, owner: usize, centre: Vec3, area: Vec3) {
        self.boundary.push((
            patch.index(),
            FaceSpec {
                owner,
                neighbour: usize::MAX,
                centre,
                area,
            },
        ));
    }

    /// Validate and freeze into an immutable `Mesh`.
    pub fn build(self) -> MeshResult<Mesh> {
        let MeshBuilder {
            cell_centres,
            cell_volumes,
            mut internal,
            mut boundary,
            patches,
        } = self;

        if cell_centres.is_empty() {
            return Err(MeshError::NoCells);
        }
        if let Some(&(p, _)) = boundary.iter().find(|(p, _)| *p >= patches.len()) {
            return Err(MeshError::UnknownPatch {
                name: format!("#{p}"),
            });
        }

        internal.sort_by_key(|f| (f.owner, f.neighbour));
        boundary.sort_by_key(|(p, _)| *p);

        let n_faces = internal.len() + boundary.len();
        let mut owner = Vec::with_capacity(n_faces);
        let mut neighbour = Vec::with_capacity(internal.len());
        let mut face_centres = Vec::with_capacity(n_faces);
        let mut face_areas = Vec::with_capacity(n_faces);

        for f in &internal {
            owner.push(f.owner);
            neighbour.push(f.neighbour);
            face_centres.push(f.centre);
            face_areas.push(f.area);
        }

        let mut patch_table = Vec::with_capacity(patches.len());
        let mut boundary_patch = Vec::with_capacity(boundary.len());
        let mut cursor = internal.len();
        for (pi, (name, kind)) in patches.into_iter().enumerate() {
            let start = cursor;
            for (_, f) in boundary.iter().filter(|(p, _)| *p == pi) {
                owner.push(f.owner);
                face_centres.push(f.centre);
                face_areas.push(f.area);
                boundary_patch.push(pi);
                cursor += 1;
            }
            patch_table.push(Patch {
                id: PatchId::from_index(pi),
                name,
                kind,
                start,
                size: cursor - start,
            });
        }

        validate::validate_structure(
            &cell_volumes,
            &owner,
            &neighbour,
            &face_areas,
            &patch_table,
        )?;

        let (cell_face_offsets, cell_face_list) =
            cell_face_addressing(cell_centres.len(), &owner, &neighbour);
        validate::validate_closed(&cell_face_offsets, &cell_face_list, &owner, &face_areas)?;

        let mag_face_areas = face_areas.iter().map(|a| a.norm()).collect();
        let geometry = Geometry::compute(
            &cell_centres,
            &owner,
            &neighbour,
            &face_centres,
            &face_areas,
        );

        Ok(Mesh {
            cell_centres,
            cell_volumes,
            owner,
            neighbour,
            face_centres,
            face_areas,
            mag_face_areas,
            patches: patch_table,
            boundary_patch,
            cell_face_offsets,
            cell_face_list,
            geometry,
        })
    }
}

/// CSR cell -> faces table.
fn cell_face_addressing(
    n_cells: usize,
    owner: &[usize],
    neighbour: &[usize],
) -> (Vec<usize>, Vec<usize>) {
    let mut counts = vec![0usize; n_cells];
    for &o in owner {
        counts[o] += 1;
    }
    for &n in neighbour {
        counts[n] += 1;
    }

    let mut offsets = Vec::with_capacity(n_cells + 1);
    offsets.push(0);
    for c in &counts {
        let last = offsets[offsets.len() - 1];
        offsets.push(last + c);
    }

    let mut fill = offsets.clone();
    let mut list = vec![0usize; offsets[n_cells]];
    for (f, &o) in owner.iter().enumerate() {
        list[fill[o]] = f;
        fill[o] += 1;
    }
    for (f, &n) in neighbour.iter().enumerate() {
        list[fill[n]] = f;
        fill[n] += 1;
    }
    (offsets, list)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit cubes side by side along x.
    fn two_cell_builder() -> MeshBuilder {
        let mut b = MeshBuilder::new();
        let c0 = b.add_cell(Vec3::new(0.5, 0.5, 0.5), 1.0);
        let c1 = b.add_cell(Vec3::new(1.5, 0.5, 0.5), 1.0);
        // Reversed orientation on purpose: builder must flip it.
        b.add_internal_face(c1, c0, Vec3::new(1.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        let walls = b.add_patch("walls", PatchKind::Wall).unwrap();
        for (cell, x0) in [(c0, 0.0), (c1, 1.0)] {
            let cx = x0 + 0.5;
            b.add_boundary_face(walls, cell, Vec3::new(cx, 0.0, 0.5), Vec3::new(0.0, -1.0, 0.0));
            b.add_boundary_face(walls, cell, Vec3::new(cx, 1.0, 0.5), Vec3::new(0.0, 1.0, 0.0));
            b.add_boundary_face(walls, cell, Vec3::new(cx, 0.5, 0.0), Vec3::new(0.0, 0.0, -1.0));
            b.add_boundary_face(walls, cell, Vec3::new(cx, 0.5, 1.0), Vec3::new(0.0, 0.0, 1.0));
        }
        let ends = b.add_patch("ends", PatchKind::Patch).unwrap();
        b.add_boundary_face(ends, c0, Vec3::new(0.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        b.add_boundary_face(ends, c1, Vec3::new(2.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        b
    }

    #[test]
    fn build_orders_faces_and_patches() {
        let mesh = two_cell_builder().build().unwrap();
        assert_eq!(mesh.n_cells(), 2);
        assert_eq!(mesh.n_internal_faces(), 1);
        assert_eq!(mesh.n_faces(), 11);
        assert_eq!(mesh.owner()[0], 0);
        assert_eq!(mesh.neighbour()[0], 1);
        assert!(mesh.face_areas()[0].x > 0.0);
        assert_eq!(mesh.patches()[0].start, 1);
        assert_eq!(mesh.patches()[0].size, 8);
        assert_eq!(mesh.patches()[1].start, 9);
    }

    #[test]
    fn duplicate_patch_with_other_kind_is_rejected() {
        let mut b = two_cell_builder();
        assert!(matches!(
            b.add_patch("walls", PatchKind::Empty),
            Err(MeshError::PatchKindConflict { .. })
        ));
        assert_eq!(b.add_patch("walls", PatchKind::Wall).unwrap().index(), 0);
    }

    #[test]
    fn open_cell_is_rejected() {
        let mut b = MeshBuilder::new();
        let c = b.add_cell(Vec3::new(0.5, 0.5, 0.5), 1.0);
        let p = b.add_patch("side", PatchKind::Wall).unwrap();
        b.add_boundary_face(p, c, Vec3::new(0.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(matches!(b.build(), Err(MeshError::OpenCell { .. })));
    }

    #[test]
    fn empty_builder_fails() {
        assert_eq!(MeshBuilder::new().build().unwrap_err(), MeshError::NoCells);
    }
}
