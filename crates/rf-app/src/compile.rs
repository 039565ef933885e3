//! Compilation of a case definition into solver objects.

use std::collections::{BTreeMap, HashMap};

use rf_case::{
    Case, ControlDef, ConvectionDef, MeshDef, PatchKindDef, PreconditionerDef, ScalarBcDef,
    SelectionDef, SideDef, SolverDef, SolverKindDef, SourceDef, SrfDef, TurbulenceDef,
    VectorBcDef, VolumeModeDef, WriteControlDef,
};
use rf_core::{GREAT, Vec3, units::rpm};
use rf_fvm::{
    ConvectionScheme, PatchField, Preconditioner, RelaxationFactors, SolverControls, SolverDict,
    SolverKind, VolField, VolScalarField, VolVectorField,
};
use rf_mesh::{BlockPatches, BlockSide, BlockSpec, Mesh, PatchKind, block_mesh};
use rf_models::{
    CellSelection, ExplicitSource, FixedVelocity, FrameModel, Laminar, MeanVelocityForce,
    RotatingFrame, Smagorinsky, SourceList, StationaryFrame, TurbulenceModel, VelocityLimit,
    VolumeMode, srf_velocity_values,
};
use rf_pimple::{
    PimpleControls, PimpleModels, PimpleSettings, ReferenceLocation, ReferenceSpec,
    ResidualControl, TurbulenceCadence,
};
use rf_sim::{RunTimeConfig, WriteControl};

use crate::error::{AppError, AppResult};

/// Everything a run needs that can be built from the case alone.
pub struct CaseRuntime {
    pub case: Case,
    pub mesh: Mesh,
    pub settings: PimpleSettings,
    pub time: RunTimeConfig,
}

/// Compile a validated case.
pub fn compile_case(case: &Case) -> AppResult<CaseRuntime> {
    let mesh = build_mesh(&case.mesh)?;
    let settings = pimple_settings(case)?;
    let time = runtime_config(&case.control);
    tracing::info!(
        case = %case.name,
        cells = mesh.n_cells(),
        faces = mesh.n_faces(),
        patches = mesh.patches().len(),
        non_orthogonal = mesh.is_non_orthogonal(),
        "case compiled"
    );
    Ok(CaseRuntime {
        case: case.clone(),
        mesh,
        settings,
        time,
    })
}

impl CaseRuntime {
    pub fn frame(&self) -> AppResult<Box<dyn FrameModel>> {
        build_frame(self.case.srf.as_ref())
    }

    /// Fresh model instances; sources and turbulence carry per-run state.
    pub fn models(&self) -> AppResult<PimpleModels> {
        Ok(PimpleModels {
            turbulence: build_turbulence(&self.mesh, &self.case)?,
            frame: self.frame()?,
            sources: build_sources(&self.mesh, &self.case.sources)?,
        })
    }

    /// Initial `p` and `Urel` from the case definition.
    pub fn initial_fields(&self) -> AppResult<(VolScalarField, VolVectorField)> {
        let frame = self.frame()?;
        let p = initial_pressure(&self.mesh, &self.case)?;
        let urel = initial_velocity(&self.mesh, &self.case, frame.as_ref())?;
        Ok((p, urel))
    }
}

fn vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

pub fn build_mesh(def: &MeshDef) -> AppResult<Mesh> {
    let mut patches = BlockPatches::default();
    for (side, (name, kind)) in SideDef::ALL.iter().zip(def.side_patches()) {
        let side = match side {
            SideDef::XMin => BlockSide::XMin,
            SideDef::XMax => BlockSide::XMax,
            SideDef::YMin => BlockSide::YMin,
            SideDef::YMax => BlockSide::YMax,
            SideDef::ZMin => BlockSide::ZMin,
            SideDef::ZMax => BlockSide::ZMax,
        };
        let kind = match kind {
            PatchKindDef::Patch => PatchKind::Patch,
            PatchKindDef::Wall => PatchKind::Wall,
            PatchKindDef::Empty => PatchKind::Empty,
        };
        patches.set(side, name, kind);
    }
    let spec = BlockSpec {
        cells: def.cells,
        lengths: def.lengths,
        origin: vec3(def.origin),
        shear: def.shear,
        patches,
    };
    Ok(block_mesh(&spec)?)
}

pub fn build_frame(srf: Option<&SrfDef>) -> AppResult<Box<dyn FrameModel>> {
    Ok(match srf {
        Some(srf) => Box::new(RotatingFrame::new(
            vec3(srf.origin),
            vec3(srf.axis),
            rpm(srf.rpm),
        )?),
        None => Box::new(StationaryFrame),
    })
}

pub fn build_turbulence(mesh: &Mesh, case: &Case) -> AppResult<Box<dyn TurbulenceModel>> {
    let nu = case.transport.nu;
    Ok(match case.turbulence {
        TurbulenceDef::Laminar => Box::new(Laminar::new(mesh, nu)?),
        TurbulenceDef::Smagorinsky { cs } => Box::new(Smagorinsky::new(mesh, nu, cs)?),
    })
}

fn selection(def: &SelectionDef) -> CellSelection {
    match def {
        SelectionDef::All => CellSelection::All,
        SelectionDef::Box { min, max } => CellSelection::Box {
            min: vec3(*min),
            max: vec3(*max),
        },
    }
}

pub fn build_sources(mesh: &Mesh, defs: &[SourceDef]) -> AppResult<SourceList> {
    let mut list = SourceList::new();
    for def in defs {
        let cells = selection(def.selection());
        match def {
            SourceDef::Explicit {
                name,
                value,
                volume_mode,
                ..
            } => {
                let mode = match volume_mode {
                    VolumeModeDef::Specific => VolumeMode::Specific,
                    VolumeModeDef::Absolute => VolumeMode::Absolute,
                };
                list.push(Box::new(ExplicitSource::new(
                    name,
                    mesh,
                    &cells,
                    vec3(*value),
                    mode,
                )?));
            }
            SourceDef::MeanVelocityForce {
                name,
                u_bar,
                relaxation,
                grad_p_initial,
                ..
            } => list.push(Box::new(MeanVelocityForce::new(
                name,
                mesh,
                &cells,
                vec3(*u_bar),
                *relaxation,
                *grad_p_initial,
            )?)),
            SourceDef::FixedVelocity { name, value, .. } => list.push(Box::new(
                FixedVelocity::new(name, mesh, &cells, vec3(*value))?,
            )),
            SourceDef::VelocityLimit { name, max, .. } => {
                list.push(Box::new(VelocityLimit::new(name, mesh, &cells, *max)?))
            }
        }
    }
    Ok(list)
}

fn solver_controls(def: &SolverDef) -> SolverControls {
    let solver = match def.solver {
        SolverKindDef::Pcg => SolverKind::Pcg,
        SolverKindDef::PBiCgStab => SolverKind::PBiCgStab,
        SolverKindDef::SmoothSolver => SolverKind::SmoothSolver,
    };
    let preconditioner = match (def.preconditioner, solver) {
        (Some(PreconditionerDef::None), _) => Preconditioner::None,
        (Some(PreconditionerDef::Diagonal), _) => Preconditioner::Diagonal,
        (Some(PreconditionerDef::Dic), _) => Preconditioner::Dic,
        (Some(PreconditionerDef::Dilu), _) => Preconditioner::Dilu,
        (None, SolverKind::Pcg) => Preconditioner::Dic,
        (None, SolverKind::PBiCgStab) => Preconditioner::Dilu,
        (None, SolverKind::SmoothSolver) => Preconditioner::None,
    };
    SolverControls {
        solver,
        preconditioner,
        tolerance: def.tolerance,
        rel_tol: def.rel_tol,
        max_iter: def.max_iter,
        min_iter: def.min_iter,
    }
}

pub fn solver_dict(defs: &BTreeMap<String, SolverDef>) -> SolverDict {
    let mut dict = SolverDict::new();
    for (name, def) in defs {
        dict.insert(name.clone(), solver_controls(def));
    }
    dict
}

fn to_hash_map(map: &BTreeMap<String, f64>) -> HashMap<String, f64> {
    map.iter().map(|(k, v)| (k.clone(), *v)).collect()
}

pub fn pimple_settings(case: &Case) -> AppResult<PimpleSettings> {
    let pimple = &case.pimple;
    let location = match (pimple.p_ref_cell, pimple.p_ref_point) {
        (Some(_), Some(_)) => {
            return Err(AppError::InvalidInput(
                "pRefCell and pRefPoint are exclusive".to_string(),
            ));
        }
        (Some(cell), None) => ReferenceLocation::Cell(cell),
        (None, Some(point)) => ReferenceLocation::Point(vec3(point)),
        (None, None) => ReferenceLocation::None,
    };
    let turbulence = if pimple.turb_on_final_iter_only {
        TurbulenceCadence::FinalIterationOnly
    } else {
        TurbulenceCadence::Every(pimple.turbulence_interval)
    };
    let settings = PimpleSettings {
        controls: PimpleControls {
            n_outer: pimple.n_outer_correctors,
            n_corr: pimple.n_correctors,
            n_non_orth: pimple.n_non_orthogonal_correctors,
            momentum_predictor: pimple.momentum_predictor,
            turbulence,
            residual_control: pimple
                .residual_control
                .iter()
                .map(|(k, rc)| {
                    (
                        k.clone(),
                        ResidualControl {
                            tolerance: rc.tolerance,
                            rel_tol: rc.rel_tol,
                        },
                    )
                })
                .collect(),
        },
        solvers: solver_dict(&case.solvers),
        relaxation: RelaxationFactors {
            fields: to_hash_map(&case.relaxation.fields),
            equations: to_hash_map(&case.relaxation.equations),
        },
        convection: match case.schemes.convection {
            ConvectionDef::Upwind => ConvectionScheme::Upwind,
            ConvectionDef::Linear => ConvectionScheme::Linear,
        },
        reference: ReferenceSpec {
            location,
            value: pimple.p_ref_value,
        },
        continuity_warning: case.diagnostics.continuity_warning,
    };
    settings.validate()?;
    Ok(settings)
}

pub fn runtime_config(control: &ControlDef) -> RunTimeConfig {
    RunTimeConfig {
        start_time: control.start_time,
        end_time: control.end_time,
        delta_t: control.delta_t,
        write_control: match control.write_control {
            WriteControlDef::TimeStep => WriteControl::TimeStep,
            WriteControlDef::RunTime => WriteControl::RunTime,
            WriteControlDef::AdjustableRunTime => WriteControl::AdjustableRunTime,
        },
        write_interval: control.write_interval,
        adjust_time_step: control.adjust_time_step,
        max_co: control.max_co,
        max_delta_t: control.max_delta_t.unwrap_or(GREAT),
    }
}

fn missing_bc(field: &str, patch: &str) -> AppError {
    AppError::Compile(format!("no boundary condition for {field} on patch {patch}"))
}

pub fn initial_pressure(mesh: &Mesh, case: &Case) -> AppResult<VolScalarField> {
    let def = &case.fields.p;
    let mut boundary = Vec::with_capacity(mesh.patches().len());
    for patch in mesh.patches() {
        if patch.is_empty_kind() {
            boundary.push(PatchField::empty(patch.size));
            continue;
        }
        let bc = def
            .boundary
            .get(&patch.name)
            .ok_or_else(|| missing_bc("p", &patch.name))?;
        boundary.push(match bc {
            ScalarBcDef::FixedValue { value } => PatchField::uniform_fixed_value(*value, patch.size),
            ScalarBcDef::ZeroGradient => PatchField::zero_gradient(patch.size),
            ScalarBcDef::FixedGradient { gradient } => {
                PatchField::fixed_gradient(vec![*gradient; patch.size])
            }
            ScalarBcDef::Empty => {
                return Err(AppError::Compile(format!(
                    "empty condition for p on non-empty patch {}",
                    patch.name
                )));
            }
        });
    }
    Ok(VolField::new(
        "p",
        mesh,
        vec![def.internal; mesh.n_cells()],
        boundary,
    )?)
}

/// Initial relative velocity; `srfVelocity` patches are resolved against
/// the frame here.
pub fn initial_velocity(
    mesh: &Mesh,
    case: &Case,
    frame: &dyn FrameModel,
) -> AppResult<VolVectorField> {
    let def = &case.fields.urel;
    let mut boundary = Vec::with_capacity(mesh.patches().len());
    for (i, patch) in mesh.patches().iter().enumerate() {
        if patch.is_empty_kind() {
            boundary.push(PatchField::empty(patch.size));
            continue;
        }
        let bc = def
            .boundary
            .get(&patch.name)
            .ok_or_else(|| missing_bc("Urel", &patch.name))?;
        boundary.push(match bc {
            VectorBcDef::FixedValue { value } => {
                PatchField::uniform_fixed_value(vec3(*value), patch.size)
            }
            VectorBcDef::NoSlip => PatchField::uniform_fixed_value(Vec3::zeros(), patch.size),
            VectorBcDef::ZeroGradient => PatchField::zero_gradient(patch.size),
            VectorBcDef::FixedGradient { gradient } => {
                PatchField::fixed_gradient(vec![vec3(*gradient); patch.size])
            }
            VectorBcDef::SrfVelocity { value, relative } => {
                srf_velocity_values(frame, mesh, i, vec3(*value), *relative)
            }
            VectorBcDef::Empty => {
                return Err(AppError::Compile(format!(
                    "empty condition for Urel on non-empty patch {}",
                    patch.name
                )));
            }
        });
    }
    Ok(VolField::new(
        "Urel",
        mesh,
        vec![vec3(def.internal); mesh.n_cells()],
        boundary,
    )?)
}
