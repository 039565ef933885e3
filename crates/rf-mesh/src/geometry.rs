//! Derived face geometry used by the discretisation.

use rayon::prelude::*;
use rf_core::Vec3;

/// Lower bound on `nf . d / |d|` in the over-relaxed non-orthogonal split.
const NON_ORTH_LIMIT: f64 = 0.05;

/// Per-face interpolation and gradient coefficients.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Owner weight for linear interpolation, 1 on boundary faces.
    pub weights: Vec<f64>,
    /// `1 / |d|` internally, `1 / (nf . d)` on the boundary.
    pub delta_coeffs: Vec<f64>,
    /// `1 / max(nf . d, 0.05 |d|)`.
    pub non_orth_delta_coeffs: Vec<f64>,
    /// `nf - d * non_orth_delta`, zero on boundary faces.
    pub non_orth_correction_vectors: Vec<Vec3>,
    /// Largest `1 - nf . d / |d|` over internal faces.
    pub max_non_orthogonality: f64,
}

impl Geometry {
    pub(crate) fn compute(
        cell_centres: &[Vec3],
        owner: &[usize],
        neighbour: &[usize],
        face_centres: &[Vec3],
        face_areas: &[Vec3],
    ) -> Self {
        let n_internal = neighbour.len();

        let per_face: Vec<(f64, f64, f64, Vec3, f64)> = (0..owner.len())
            .into_par_iter()
            .map(|f| {
                let nf = face_areas[f] / face_areas[f].norm();
                let co = cell_centres[owner[f]];
                let cf = face_centres[f];
                if f < n_internal {
                    let cn = cell_centres[neighbour[f]];
                    let d = cn - co;
                    let d_own = nf.dot(&(cf - co)).abs();
                    let d_nei = nf.dot(&(cn - cf)).abs();
                    let w = d_nei / (d_own + d_nei);
                    let mag_d = d.norm();
                    let nf_d = nf.dot(&d);
                    let non_orth_delta = 1.0 / nf_d.max(NON_ORTH_LIMIT * mag_d);
                    let k = nf - d * non_orth_delta;
                    (w, 1.0 / mag_d, non_orth_delta, k, 1.0 - nf_d / mag_d)
                } else {
                    let delta = 1.0 / nf.dot(&(cf - co));
                    (1.0, delta, delta, Vec3::zeros(), 0.0)
                }
            })
            .collect();

        let mut geometry = Geometry {
            weights: Vec::with_capacity(per_face.len()),
            delta_coeffs: Vec::with_capacity(per_face.len()),
            non_orth_delta_coeffs: Vec::with_capacity(per_face.len()),
            non_orth_correction_vectors: Vec::with_capacity(per_face.len()),
            max_non_orthogonality: 0.0,
        };
        for (w, delta, nod, k, non_orth) in per_face {
            geometry.weights.push(w);
            geometry.delta_coeffs.push(delta);
            geometry.non_orth_delta_coeffs.push(nod);
            geometry.non_orth_correction_vectors.push(k);
            geometry.max_non_orthogonality = geometry.max_non_orthogonality.max(non_orth);
        }
        geometry
    }
}
