//! Global mass balance of the predicted flux.

use rf_core::{SMALL, VSMALL};
use rf_fvm::{VolScalarField, VolVectorField};
use rf_mesh::Mesh;

use crate::error::{PimpleError, PimpleResult};

/// Scale the outflow through non-fixed velocity patches so the boundary
/// flux balances. Only acts when `p` needs a reference, i.e. when the
/// pressure equation is only solvable for a balanced flux.
///
/// Returns true when the domain is closed (no boundary flux at all).
pub fn adjust_phi(
    mesh: &Mesh,
    phi: &mut [f64],
    u: &VolVectorField,
    p: &VolScalarField,
) -> PimpleResult<bool> {
    if !p.needs_reference() {
        return Ok(false);
    }

    let mut mass_in = 0.0;
    let mut fixed_out = 0.0;
    let mut adjustable_out = 0.0;
    for (patch, up) in mesh.patches().iter().zip(u.boundary()) {
        if patch.is_empty_kind() {
            continue;
        }
        for f in patch.faces() {
            if phi[f] < 0.0 {
                mass_in -= phi[f];
            } else if up.fixes_value() {
                fixed_out += phi[f];
            } else {
                adjustable_out += phi[f];
            }
        }
    }

    let total_flux = VSMALL + phi.iter().map(|v| v.abs()).sum::<f64>();
    let mut mass_corr = 1.0;
    if adjustable_out > VSMALL && adjustable_out / total_flux > SMALL {
        mass_corr = (mass_in - fixed_out) / adjustable_out;
    } else if (fixed_out - mass_in).abs() / total_flux > 1e-8 {
        return Err(PimpleError::AdjustPhi {
            total_flux,
            mass_in,
            fixed_out,
            adjustable_out,
        });
    }

    if mass_corr != 1.0 {
        tracing::debug!(mass_corr, "scaling adjustable outflow");
        for (patch, up) in mesh.patches().iter().zip(u.boundary()) {
            if patch.is_empty_kind() || up.fixes_value() {
                continue;
            }
            for f in patch.faces() {
                if phi[f] > 0.0 {
                    phi[f] *= mass_corr;
                }
            }
        }
    }

    Ok(mass_in / total_flux < SMALL
        && fixed_out / total_flux < SMALL
        && adjustable_out / total_flux < SMALL)
}
