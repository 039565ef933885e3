//! Explicit operators evaluated from current field values.

use rf_core::{SMALL, Tensor, Vec3};
use rf_mesh::Mesh;

use crate::field::{FieldValue, VolField, VolVectorField};

/// Linear interpolation to faces. Boundary faces take the patch value,
/// faces on `empty` patches zero.
pub fn interpolate<T: FieldValue>(mesh: &Mesh, psi: &VolField<T>) -> Vec<T> {
    let mut face = interpolate_internal(mesh, psi.internal());
    for (patch, pf) in mesh.patches().iter().zip(psi.boundary()) {
        if patch.is_empty_kind() {
            continue;
        }
        for (i, f) in patch.faces().enumerate() {
            face[f] = pf.values[i];
        }
    }
    face
}

/// Linear interpolation of bare cell values; boundary faces take the
/// adjacent cell value.
pub fn interpolate_cells<T: FieldValue>(mesh: &Mesh, values: &[T]) -> Vec<T> {
    let mut face = interpolate_internal(mesh, values);
    let owner = mesh.owner();
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        face[f] = values[owner[f]];
    }
    face
}

fn interpolate_internal<T: FieldValue>(mesh: &Mesh, values: &[T]) -> Vec<T> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let w = mesh.weights();
    let mut face = vec![T::zero(); mesh.n_faces()];
    for f in 0..mesh.n_internal_faces() {
        face[f] = values[owner[f]] * w[f] + values[neighbour[f]] * (1.0 - w[f]);
    }
    face
}

/// Linear interpolation of cell tensors; boundary faces take the adjacent
/// cell value.
pub fn interpolate_tensors(mesh: &Mesh, values: &[Tensor]) -> Vec<Tensor> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let w = mesh.weights();
    let mut face = vec![Tensor::zeros(); mesh.n_faces()];
    for f in 0..mesh.n_internal_faces() {
        face[f] = values[owner[f]] * w[f] + values[neighbour[f]] * (1.0 - w[f]);
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        face[f] = values[owner[f]];
    }
    face
}

/// Volumetric face flux `U_f . Sf`.
pub fn flux(mesh: &Mesh, u: &VolVectorField) -> Vec<f64> {
    interpolate(mesh, u)
        .iter()
        .zip(mesh.face_areas())
        .map(|(uf, sf)| uf.dot(sf))
        .collect()
}

/// Gauss gradient of a scalar field.
pub fn grad(mesh: &Mesh, psi: &VolField<f64>) -> Vec<Vec3> {
    grad_component(mesh, psi, 0)
}

/// Gauss gradient of component `d` of a field.
pub fn grad_component<T: FieldValue>(mesh: &Mesh, psi: &VolField<T>, d: usize) -> Vec<Vec3> {
    let face = interpolate(mesh, psi);
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let sf = mesh.face_areas();

    let mut g = vec![Vec3::zeros(); mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        let contrib = sf[f] * face[f].component(d);
        g[owner[f]] += contrib;
        g[neighbour[f]] -= contrib;
    }
    for patch in mesh.patches() {
        if patch.is_empty_kind() {
            continue;
        }
        for f in patch.faces() {
            g[owner[f]] += sf[f] * face[f].component(d);
        }
    }
    for (gc, v) in g.iter_mut().zip(mesh.cell_volumes()) {
        *gc /= *v;
    }
    g
}

/// Gauss gradient of a vector field, `(grad U)_ij = d U_j / d x_i`.
pub fn grad_vector(mesh: &Mesh, u: &VolVectorField) -> Vec<Tensor> {
    let face = interpolate(mesh, u);
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let sf = mesh.face_areas();

    let mut g = vec![Tensor::zeros(); mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        let contrib = sf[f] * face[f].transpose();
        g[owner[f]] += contrib;
        g[neighbour[f]] -= contrib;
    }
    for patch in mesh.patches() {
        if patch.is_empty_kind() {
            continue;
        }
        for f in patch.faces() {
            g[owner[f]] += sf[f] * face[f].transpose();
        }
    }
    for (gc, v) in g.iter_mut().zip(mesh.cell_volumes()) {
        *gc /= *v;
    }
    g
}

/// Divergence of a face flux, per unit volume.
pub fn div(mesh: &Mesh, phi: &[f64]) -> Vec<f64> {
    let mut d = surface_integrate(mesh, phi);
    for (dc, v) in d.iter_mut().zip(mesh.cell_volumes()) {
        *dc /= v;
    }
    d
}

/// Net outflow per cell, not divided by volume.
pub fn surface_integrate(mesh: &Mesh, phi: &[f64]) -> Vec<f64> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let mut d = vec![0.0; mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        d[owner[f]] += phi[f];
        d[neighbour[f]] -= phi[f];
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        d[owner[f]] += phi[f];
    }
    d
}

/// Sum of `|phi|` over the faces of each cell.
pub fn surface_sum_mag(mesh: &Mesh, phi: &[f64]) -> Vec<f64> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let mut s = vec![0.0; mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        s[owner[f]] += phi[f].abs();
        s[neighbour[f]] += phi[f].abs();
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        s[owner[f]] += phi[f].abs();
    }
    s
}

/// Divergence of a tensor given on faces, `sum(Sf . T_f) / V`.
pub fn div_tensor_flux(mesh: &Mesh, t_faces: &[Tensor]) -> Vec<Vec3> {
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let sf = mesh.face_areas();

    let mut d = vec![Vec3::zeros(); mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        let contrib = t_faces[f].transpose() * sf[f];
        d[owner[f]] += contrib;
        d[neighbour[f]] -= contrib;
    }
    for patch in mesh.patches() {
        if patch.is_empty_kind() {
            continue;
        }
        for f in patch.faces() {
            d[owner[f]] += t_faces[f].transpose() * sf[f];
        }
    }
    for (dc, v) in d.iter_mut().zip(mesh.cell_volumes()) {
        *dc /= *v;
    }
    d
}

/// Flux correction coupling the face flux to its old-time value, so the
/// flux predictor does not decouple from the cell-centred pressure.
///
/// `coeff * (interp(rA/dt) phi_old - interp(rA U_old/dt) . Sf)` with
/// `coeff = 1 - min(|phi_old - Sf . U_old_f| / (|phi_old| + SMALL), 1)`,
/// zero on fixed-value velocity patches and `empty` patches.
pub fn ddt_phi_corr(
    mesh: &Mesh,
    r_a: &[f64],
    u_old: &VolVectorField,
    phi_old: &[f64],
    delta_t: f64,
) -> Vec<f64> {
    let rdt = 1.0 / delta_t;
    let sf = mesh.face_areas();
    let u_old_f = interpolate(mesh, u_old);

    let r_a_dt: Vec<f64> = r_a.iter().map(|r| r * rdt).collect();
    let r_a_u_dt: Vec<Vec3> = r_a_dt
        .iter()
        .zip(u_old.internal())
        .map(|(r, u)| u * *r)
        .collect();
    let r_a_dt_f = interpolate_cells(mesh, &r_a_dt);
    let mut r_a_u_dt_f = interpolate_cells(mesh, &r_a_u_dt);

    // boundary faces carry the owner rA with the patch velocity
    let owner = mesh.owner();
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        r_a_u_dt_f[f] = u_old_f[f] * r_a_dt[owner[f]];
    }

    let mut corr = vec![0.0; mesh.n_faces()];
    for f in 0..mesh.n_faces() {
        let coeff = coupling_coeff(phi_old[f], sf[f].dot(&u_old_f[f]));
        corr[f] = coeff * (r_a_dt_f[f] * phi_old[f] - r_a_u_dt_f[f].dot(&sf[f]));
    }
    for (patch, pf) in mesh.patches().iter().zip(u_old.boundary()) {
        if patch.is_empty_kind() || pf.fixes_value() {
            for f in patch.faces() {
                corr[f] = 0.0;
            }
        }
    }
    corr
}

fn coupling_coeff(phi: f64, u_dot_sf: f64) -> f64 {
    1.0 - ((phi - u_dot_sf).abs() / (phi.abs() + SMALL)).min(1.0)
}
