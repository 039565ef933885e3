//! Implicit operators: each returns the [`FvMatrix`] of one term.

use rf_mesh::Mesh;

use crate::error::{FvmError, FvmResult};
use crate::field::{FieldValue, VolField};
use crate::fvc;
use crate::matrix::FvMatrix;
use crate::schemes::ConvectionScheme;
use crate::surface::SurfaceScalarField;

/// Euler implicit time derivative, `(psi - psi_old) / dt`.
pub fn ddt<T: FieldValue>(
    mesh: &Mesh,
    psi: &VolField<T>,
    old: &[T],
    delta_t: f64,
) -> FvmResult<FvMatrix<T>> {
    if !(delta_t.is_finite() && delta_t > 0.0) {
        return Err(FvmError::InvalidArg {
            what: format!("time step {delta_t} for ddt({})", psi.name()),
        });
    }
    if old.len() != mesh.n_cells() {
        return Err(FvmError::SizeMismatch {
            what: format!("old-time values of {}", psi.name()),
            expected: mesh.n_cells(),
            got: old.len(),
        });
    }
    let rdt = 1.0 / delta_t;
    let mut m = FvMatrix::new(mesh, psi.name());
    for (c, v) in mesh.cell_volumes().iter().enumerate() {
        m.diag[c] = rdt * v;
        m.source[c] = old[c] * (rdt * v);
    }
    Ok(m)
}

/// Gauss convection `div(phi, psi)` with the given face interpolation.
pub fn div<T: FieldValue>(
    mesh: &Mesh,
    phi: &SurfaceScalarField,
    psi: &VolField<T>,
    scheme: ConvectionScheme,
) -> FvmResult<FvMatrix<T>> {
    let flux = phi.values();
    if flux.len() != mesh.n_faces() {
        return Err(FvmError::SizeMismatch {
            what: format!("flux for div({})", psi.name()),
            expected: mesh.n_faces(),
            got: flux.len(),
        });
    }

    let mut m = FvMatrix::new(mesh, psi.name());
    let weights = mesh.weights();
    for f in 0..mesh.n_internal_faces() {
        let w = scheme.weight(flux[f], weights[f]);
        m.lower[f] = -w * flux[f];
        m.upper[f] = m.lower[f] + flux[f];
    }
    m.neg_sum_diag(mesh);

    let n_internal = mesh.n_internal_faces();
    let delta = mesh.delta_coeffs();
    for (patch, pf) in mesh.patches().iter().zip(psi.boundary()) {
        if patch.is_empty_kind() {
            continue;
        }
        let ic = internal_coeff(psi, &patch.name, pf.value_internal_coeff())?;
        for (i, f) in patch.faces().enumerate() {
            m.internal_coeffs[f - n_internal] = flux[f] * ic;
            m.boundary_coeffs[f - n_internal] = -(pf.value_boundary_coeff(i, delta[f]) * flux[f]);
        }
    }
    Ok(m)
}

/// Gauss linear corrected `laplacian(gamma, psi)`, with `gamma` given per
/// face. The explicit non-orthogonal part is kept as the face-flux
/// correction so [`FvMatrix::flux`] reproduces the full diffusive flux.
pub fn laplacian<T: FieldValue>(
    mesh: &Mesh,
    gamma: &[f64],
    psi: &VolField<T>,
) -> FvmResult<FvMatrix<T>> {
    if gamma.len() != mesh.n_faces() {
        return Err(FvmError::SizeMismatch {
            what: format!("diffusivity for laplacian({})", psi.name()),
            expected: mesh.n_faces(),
            got: gamma.len(),
        });
    }

    let gamma_mag_sf: Vec<f64> = gamma
        .iter()
        .zip(mesh.mag_face_areas())
        .map(|(g, a)| g * a)
        .collect();

    let mut m = FvMatrix::new(mesh, psi.name());
    let non_orth_delta = mesh.non_orth_delta_coeffs();
    for f in 0..mesh.n_internal_faces() {
        m.upper[f] = non_orth_delta[f] * gamma_mag_sf[f];
        m.lower[f] = m.upper[f];
    }
    m.neg_sum_diag(mesh);

    let n_internal = mesh.n_internal_faces();
    let delta = mesh.delta_coeffs();
    for (patch, pf) in mesh.patches().iter().zip(psi.boundary()) {
        if patch.is_empty_kind() {
            continue;
        }
        for (i, f) in patch.faces().enumerate() {
            let ic = internal_coeff(psi, &patch.name, pf.gradient_internal_coeff(delta[f]))?;
            m.internal_coeffs[f - n_internal] = gamma_mag_sf[f] * ic;
            m.boundary_coeffs[f - n_internal] =
                -(pf.gradient_boundary_coeff(i, delta[f]) * gamma_mag_sf[f]);
        }
    }

    if mesh.is_non_orthogonal() {
        let correction = non_orthogonal_correction(mesh, &gamma_mag_sf, psi);
        let owner = mesh.owner();
        let neighbour = mesh.neighbour();
        for f in 0..n_internal {
            m.source[owner[f]] -= correction[f];
            m.source[neighbour[f]] += correction[f];
        }
        m.face_flux_correction = Some(correction);
    }
    Ok(m)
}

/// `gamma |Sf| (k . grad(psi)_f)` per face, per component.
fn non_orthogonal_correction<T: FieldValue>(
    mesh: &Mesh,
    gamma_mag_sf: &[f64],
    psi: &VolField<T>,
) -> Vec<T> {
    let k = mesh.non_orth_correction_vectors();
    let mut corr = vec![T::zero(); mesh.n_faces()];
    for d in 0..T::N_COMPONENTS {
        let grad = fvc::grad_component(mesh, psi, d);
        let grad_f = fvc::interpolate_cells(mesh, &grad);
        for f in 0..mesh.n_internal_faces() {
            corr[f].set_component(d, gamma_mag_sf[f] * k[f].dot(&grad_f[f]));
        }
    }
    corr
}

fn internal_coeff<T: FieldValue>(
    psi: &VolField<T>,
    patch: &str,
    coeff: Option<f64>,
) -> FvmResult<f64> {
    coeff.ok_or_else(|| FvmError::CalculatedPatchInMatrix {
        field: psi.name().to_string(),
        patch: patch.to_string(),
    })
}
