//! Mesh validation logic.

use rf_core::Vec3;
use std::collections::HashSet;

use crate::error::{MeshError, MeshResult};
use crate::mesh::Patch;

/// Relative tolerance on the per-cell sum of outward area vectors.
const CLOSEDNESS_TOL: f64 = 1.0e-8;

/// Check references, volumes, face areas and patch names.
pub(crate) fn validate_structure(
    cell_volumes: &[f64],
    owner: &[usize],
    neighbour: &[usize],
    face_areas: &[Vec3],
    patches: &[Patch],
) -> MeshResult<()> {
    let n_cells = cell_volumes.len();

    for (cell, &v) in cell_volumes.iter().enumerate() {
        if !(v.is_finite() && v > 0.0) {
            return Err(MeshError::NonPositiveVolume { cell, volume: v });
        }
    }

    for (face, &o) in owner.iter().enumerate() {
        if o >= n_cells {
            return Err(MeshError::InvalidCellRef { face, cell: o });
        }
    }

    for (face, &n) in neighbour.iter().enumerate() {
        if n >= n_cells {
            return Err(MeshError::InvalidCellRef { face, cell: n });
        }
        if n == owner[face] {
            return Err(MeshError::SelfNeighbour { face });
        }
    }

    for (face, a) in face_areas.iter().enumerate() {
        let mag = a.norm();
        if !(mag.is_finite() && mag > 0.0) {
            return Err(MeshError::DegenerateFace { face });
        }
    }

    let mut names = HashSet::new();
    for patch in patches {
        if !names.insert(patch.name.as_str()) {
            return Err(MeshError::DuplicatePatch {
                name: patch.name.clone(),
            });
        }
    }

    Ok(())
}

/// Every cell must have faces and a vanishing sum of outward area vectors.
pub(crate) fn validate_closed(
    cell_face_offsets: &[usize],
    cell_face_list: &[usize],
    owner: &[usize],
    face_areas: &[Vec3],
) -> MeshResult<()> {
    for cell in 0..cell_face_offsets.len() - 1 {
        let faces = &cell_face_list[cell_face_offsets[cell]..cell_face_offsets[cell + 1]];
        if faces.is_empty() {
            return Err(MeshError::OrphanCell { cell });
        }

        let mut sum = Vec3::zeros();
        let mut mag = 0.0;
        for &f in faces {
            let a = face_areas[f];
            if owner[f] == cell {
                sum += a;
            } else {
                sum -= a;
            }
            mag += a.norm();
        }

        let imbalance = sum.norm() / mag;
        if imbalance > CLOSEDNESS_TOL {
            return Err(MeshError::OpenCell { cell, imbalance });
        }
    }
    Ok(())
}
