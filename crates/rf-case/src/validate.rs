//! Case validation logic.

use std::collections::HashSet;

use crate::schema::{
    Case, ControlDef, FieldsDef, MeshDef, PatchKindDef, PimpleDef, PreconditionerDef, SelectionDef,
    SolverDef, SolverKindDef, SourceDef, TurbulenceDef, WriteControlDef,
};

/// Newest case file version this build reads.
pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive and finite"))
    }
}

fn fmt_vec(v: &[f64; 3]) -> String {
    format!("({} {} {})", v[0], v[1], v[2])
}

pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version == 0 || case.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    validate_mesh(&case.mesh)?;
    validate_control(&case.control)?;
    validate_fields(&case.fields, &case.mesh)?;
    validate_pimple(&case.pimple, &case.mesh)?;

    for field in ["p", "Urel"] {
        if !case.solvers.contains_key(field) {
            return Err(ValidationError::MissingReference {
                id: field.to_string(),
                context: "solvers".to_string(),
            });
        }
    }
    for (name, solver) in &case.solvers {
        validate_solver(name, solver)?;
    }

    for (name, &alpha) in case
        .relaxation
        .fields
        .iter()
        .chain(&case.relaxation.equations)
    {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(invalid(
                format!("relaxation {name}"),
                alpha,
                "must be in (0, 1]",
            ));
        }
    }

    positive("transport nu", case.transport.nu)?;
    if let TurbulenceDef::Smagorinsky { cs } = case.turbulence {
        positive("turbulence cs", cs)?;
    }

    if let Some(srf) = &case.srf {
        if srf.axis.iter().all(|a| *a == 0.0) || srf.axis.iter().any(|a| !a.is_finite()) {
            return Err(invalid("srf axis", fmt_vec(&srf.axis), "must be non-zero"));
        }
        if !srf.rpm.is_finite() {
            return Err(invalid("srf rpm", srf.rpm, "must be finite"));
        }
        if srf.origin.iter().any(|a| !a.is_finite()) {
            return Err(invalid("srf origin", fmt_vec(&srf.origin), "must be finite"));
        }
    }

    let mut source_names = HashSet::new();
    for source in &case.sources {
        if !source_names.insert(source.name()) {
            return Err(ValidationError::DuplicateId {
                id: source.name().to_string(),
                context: "sources".to_string(),
            });
        }
        validate_source(source)?;
    }

    positive(
        "diagnostics continuityWarning",
        case.diagnostics.continuity_warning,
    )?;
    Ok(())
}

fn validate_mesh(mesh: &MeshDef) -> Result<(), ValidationError> {
    if mesh.cells.contains(&0) {
        return Err(invalid(
            "mesh cells",
            format!("{:?}", mesh.cells),
            "cell counts must be positive",
        ));
    }
    for l in mesh.lengths {
        positive("mesh lengths", l)?;
    }
    if !mesh.shear.is_finite() {
        return Err(invalid("mesh shear", mesh.shear, "must be finite"));
    }

    let mut names = HashSet::new();
    let mut sides = HashSet::new();
    for patch in &mesh.patches {
        if !names.insert(patch.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: patch.name.clone(),
                context: "mesh patches".to_string(),
            });
        }
        if patch.sides.is_empty() {
            return Err(invalid(
                format!("mesh patch '{}' sides", patch.name),
                "[]",
                "a patch needs at least one side",
            ));
        }
        for side in &patch.sides {
            if !sides.insert(*side) {
                return Err(ValidationError::DuplicateId {
                    id: side.default_name().to_string(),
                    context: "mesh patch sides".to_string(),
                });
            }
        }
    }

    // a default side name must not collide with an explicit patch of
    // another kind
    let mut kinds = std::collections::HashMap::new();
    for (name, kind) in mesh.side_patches() {
        if let Some(prev) = kinds.insert(name.clone(), kind)
            && prev != kind
        {
            return Err(ValidationError::DuplicateId {
                id: name,
                context: "mesh patches with different kinds".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_control(control: &ControlDef) -> Result<(), ValidationError> {
    if !control.start_time.is_finite() {
        return Err(invalid("control startTime", control.start_time, "must be finite"));
    }
    if !(control.end_time.is_finite() && control.end_time >= control.start_time) {
        return Err(invalid(
            "control endTime",
            control.end_time,
            "must not be before startTime",
        ));
    }
    positive("control deltaT", control.delta_t)?;
    positive("control writeInterval", control.write_interval)?;
    if control.write_control == WriteControlDef::TimeStep && control.write_interval.fract() != 0.0
    {
        return Err(invalid(
            "control writeInterval",
            control.write_interval,
            "must be a whole number of steps for timeStep",
        ));
    }
    if control.adjust_time_step {
        positive("control maxCo", control.max_co)?;
    }
    if let Some(max_dt) = control.max_delta_t {
        positive("control maxDeltaT", max_dt)?;
    }
    Ok(())
}

fn validate_fields(fields: &FieldsDef, mesh: &MeshDef) -> Result<(), ValidationError> {
    let patches = mesh.patch_names();
    let known: HashSet<&str> = patches.iter().map(|(n, _)| n.as_str()).collect();

    let p_bcs: Vec<(&String, bool)> = fields
        .p
        .boundary
        .iter()
        .map(|(n, bc)| (n, bc.is_empty_kind()))
        .collect();
    let u_bcs: Vec<(&String, bool)> = fields
        .urel
        .boundary
        .iter()
        .map(|(n, bc)| (n, bc.is_empty_kind()))
        .collect();

    for (field, bcs) in [("p", &p_bcs), ("Urel", &u_bcs)] {
        for (name, is_empty) in bcs.iter() {
            if !known.contains(name.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: name.to_string(),
                    context: format!("fields.{field}.boundary"),
                });
            }
            let kind = patches
                .iter()
                .find(|(n, _)| n == *name)
                .map(|(_, k)| *k);
            if (kind == Some(PatchKindDef::Empty)) != *is_empty {
                return Err(invalid(
                    format!("fields.{field}.boundary.{name}"),
                    if *is_empty { "empty" } else { "non-empty" },
                    "empty conditions belong exactly on empty patches",
                ));
            }
        }
        for (name, kind) in &patches {
            if *kind != PatchKindDef::Empty && !bcs.iter().any(|(n, _)| *n == name) {
                return Err(ValidationError::MissingReference {
                    id: name.clone(),
                    context: format!("fields.{field}.boundary (no condition for patch)"),
                });
            }
        }
    }

    if !fields.p.internal.is_finite() {
        return Err(invalid("fields.p.internal", fields.p.internal, "must be finite"));
    }
    if fields.urel.internal.iter().any(|v| !v.is_finite()) {
        return Err(invalid(
            "fields.Urel.internal",
            fmt_vec(&fields.urel.internal),
            "must be finite",
        ));
    }
    Ok(())
}

fn validate_pimple(pimple: &PimpleDef, mesh: &MeshDef) -> Result<(), ValidationError> {
    if pimple.n_outer_correctors == 0 {
        return Err(invalid("pimple nOuterCorrectors", 0, "must be at least 1"));
    }
    if pimple.n_correctors == 0 {
        return Err(invalid("pimple nCorrectors", 0, "must be at least 1"));
    }
    if pimple.turbulence_interval == 0 {
        return Err(invalid("pimple turbulenceInterval", 0, "must be at least 1"));
    }
    if pimple.p_ref_cell.is_some() && pimple.p_ref_point.is_some() {
        return Err(invalid(
            "pimple pRefCell/pRefPoint",
            "both",
            "give one reference location",
        ));
    }
    if let Some(cell) = pimple.p_ref_cell
        && cell >= mesh.n_cells()
    {
        return Err(invalid(
            "pimple pRefCell",
            cell,
            "outside the mesh cell range",
        ));
    }
    if !pimple.p_ref_value.is_finite() {
        return Err(invalid("pimple pRefValue", pimple.p_ref_value, "must be finite"));
    }
    for (field, rc) in &pimple.residual_control {
        if !(rc.tolerance.is_finite() && rc.tolerance >= 0.0) {
            return Err(invalid(
                format!("pimple residualControl {field} tolerance"),
                rc.tolerance,
                "must be non-negative",
            ));
        }
        if !(rc.rel_tol.is_finite() && (0.0..1.0).contains(&rc.rel_tol)) {
            return Err(invalid(
                format!("pimple residualControl {field} relTol"),
                rc.rel_tol,
                "must be in [0, 1)",
            ));
        }
    }
    Ok(())
}

fn validate_solver(name: &str, solver: &SolverDef) -> Result<(), ValidationError> {
    if !(solver.tolerance.is_finite() && solver.tolerance >= 0.0) {
        return Err(invalid(
            format!("solvers {name} tolerance"),
            solver.tolerance,
            "must be non-negative",
        ));
    }
    if !(solver.rel_tol.is_finite() && (0.0..1.0).contains(&solver.rel_tol)) {
        return Err(invalid(
            format!("solvers {name} relTol"),
            solver.rel_tol,
            "must be in [0, 1)",
        ));
    }
    if solver.max_iter == 0 {
        return Err(invalid(format!("solvers {name} maxIter"), 0, "must be positive"));
    }
    if solver.solver == SolverKindDef::Pcg && solver.preconditioner == Some(PreconditionerDef::Dilu)
    {
        return Err(ValidationError::Unsupported {
            feature: format!("solvers {name}: PCG with DILU"),
            reason: "PCG needs a symmetric preconditioner (DIC or diagonal)".to_string(),
        });
    }
    Ok(())
}

fn validate_selection(name: &str, selection: &SelectionDef) -> Result<(), ValidationError> {
    if let SelectionDef::Box { min, max } = selection
        && min.iter().zip(max).any(|(a, b)| !(a < b))
    {
        return Err(invalid(
            format!("source '{name}' box"),
            format!("{} {}", fmt_vec(min), fmt_vec(max)),
            "min must be below max on every axis",
        ));
    }
    Ok(())
}

fn validate_source(source: &SourceDef) -> Result<(), ValidationError> {
    let name = source.name();
    validate_selection(name, source.selection())?;
    match source {
        SourceDef::Explicit { value, .. } | SourceDef::FixedVelocity { value, .. } => {
            if value.iter().any(|v| !v.is_finite()) {
                return Err(invalid(
                    format!("source '{name}' value"),
                    fmt_vec(value),
                    "must be finite",
                ));
            }
        }
        SourceDef::MeanVelocityForce {
            u_bar, relaxation, ..
        } => {
            let mag = u_bar.iter().map(|v| v * v).sum::<f64>().sqrt();
            if !(mag.is_finite() && mag > 0.0) {
                return Err(invalid(
                    format!("source '{name}' Ubar"),
                    fmt_vec(u_bar),
                    "must be non-zero",
                ));
            }
            if !(*relaxation > 0.0 && *relaxation <= 1.0) {
                return Err(invalid(
                    format!("source '{name}' relaxation"),
                    relaxation,
                    "must be in (0, 1]",
                ));
            }
        }
        SourceDef::VelocityLimit { max, .. } => {
            positive(&format!("source '{name}' max"), *max)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use std::collections::BTreeMap;

    fn base() -> Case {
        crate::templates::rotating_cavity()
    }

    #[test]
    fn template_is_valid() {
        validate_case(&base()).unwrap();
    }

    #[test]
    fn future_version_is_rejected() {
        let mut case = base();
        case.version = LATEST_VERSION + 1;
        assert_eq!(
            validate_case(&case),
            Err(ValidationError::UnsupportedVersion {
                version: LATEST_VERSION + 1
            })
        );
    }

    #[test]
    fn missing_pressure_solver() {
        let mut case = base();
        case.solvers.remove("p");
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::MissingReference { id, .. }) if id == "p"
        ));
    }

    #[test]
    fn boundary_on_unknown_patch() {
        let mut case = base();
        case.fields
            .p
            .boundary
            .insert("inlet".to_string(), ScalarBcDef::ZeroGradient);
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::MissingReference { id, .. }) if id == "inlet"
        ));
    }

    #[test]
    fn patch_without_condition() {
        let mut case = base();
        case.fields.urel.boundary.remove("lid");
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::MissingReference { id, .. }) if id == "lid"
        ));
    }

    #[test]
    fn empty_condition_on_wall_is_invalid() {
        let mut case = base();
        case.fields
            .p
            .boundary
            .insert("walls".to_string(), ScalarBcDef::Empty);
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn both_reference_locations_is_invalid() {
        let mut case = base();
        case.pimple.p_ref_cell = Some(0);
        case.pimple.p_ref_point = Some([0.5, 0.5, 0.05]);
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn reference_cell_out_of_range() {
        let mut case = base();
        case.pimple.p_ref_cell = Some(case.mesh.n_cells());
        assert!(validate_case(&case).is_err());
    }

    #[test]
    fn duplicate_source_names() {
        let mut case = base();
        let src = SourceDef::Explicit {
            name: "gravity".to_string(),
            selection: SelectionDef::All,
            value: [0.0, -9.81, 0.0],
            volume_mode: VolumeModeDef::Specific,
        };
        case.sources = vec![src.clone(), src];
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn pcg_with_dilu_is_unsupported() {
        let mut case = base();
        if let Some(p) = case.solvers.get_mut("p") {
            p.preconditioner = Some(PreconditionerDef::Dilu);
        }
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::Unsupported { .. })
        ));
    }

    #[test]
    fn side_in_two_patches() {
        let mut case = base();
        case.mesh.patches.push(PatchDef {
            name: "extra".to_string(),
            kind: PatchKindDef::Wall,
            sides: vec![SideDef::YMax],
        });
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn relaxation_outside_unit_interval() {
        let mut case = base();
        case.relaxation.fields = BTreeMap::from([("p".to_string(), 1.5)]);
        assert!(validate_case(&case).is_err());
    }

    #[test]
    fn zero_axis_is_invalid() {
        let mut case = base();
        if let Some(srf) = case.srf.as_mut() {
            srf.axis = [0.0; 3];
        }
        assert!(validate_case(&case).is_err());
    }

    #[test]
    fn bad_source_box() {
        let mut case = base();
        case.sources.push(SourceDef::VelocityLimit {
            name: "limit".to_string(),
            selection: SelectionDef::Box {
                min: [0.0, 0.0, 0.0],
                max: [1.0, 0.0, 1.0],
            },
            max: 3.0,
        });
        assert!(validate_case(&case).is_err());
    }
}
