//! Case file schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub version: u32,
    pub name: String,
    pub mesh: MeshDef,
    pub control: ControlDef,
    pub fields: FieldsDef,
    #[serde(default)]
    pub pimple: PimpleDef,
    pub solvers: BTreeMap<String, SolverDef>,
    #[serde(default)]
    pub relaxation: RelaxationDef,
    #[serde(default)]
    pub schemes: SchemesDef,
    pub transport: TransportDef,
    #[serde(default)]
    pub turbulence: TurbulenceDef,
    /// Rotating frame; absent means a stationary frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srf: Option<SrfDef>,
    #[serde(default)]
    pub sources: Vec<SourceDef>,
    #[serde(default)]
    pub diagnostics: DiagnosticsDef,
}

// ---------------------------------------------------------------- mesh

/// Structured block mesh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeshDef {
    pub cells: [usize; 3],
    pub lengths: [f64; 3],
    #[serde(default)]
    pub origin: [f64; 3],
    /// x-offset per unit y.
    #[serde(default)]
    pub shear: f64,
    /// Named patches; sides not listed become walls named after the side.
    #[serde(default)]
    pub patches: Vec<PatchDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchDef {
    pub name: String,
    pub kind: PatchKindDef,
    pub sides: Vec<SideDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PatchKindDef {
    Patch,
    Wall,
    Empty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SideDef {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl SideDef {
    pub const ALL: [SideDef; 6] = [
        SideDef::XMin,
        SideDef::XMax,
        SideDef::YMin,
        SideDef::YMax,
        SideDef::ZMin,
        SideDef::ZMax,
    ];

    pub fn default_name(self) -> &'static str {
        match self {
            SideDef::XMin => "xmin",
            SideDef::XMax => "xmax",
            SideDef::YMin => "ymin",
            SideDef::YMax => "ymax",
            SideDef::ZMin => "zmin",
            SideDef::ZMax => "zmax",
        }
    }
}

impl MeshDef {
    /// Patch name and kind of every side, defaults filled in.
    pub fn side_patches(&self) -> [(String, PatchKindDef); 6] {
        SideDef::ALL.map(|side| {
            self.patches
                .iter()
                .find(|p| p.sides.contains(&side))
                .map(|p| (p.name.clone(), p.kind))
                .unwrap_or_else(|| (side.default_name().to_string(), PatchKindDef::Wall))
        })
    }

    /// Distinct patch names with their kinds, in side order.
    pub fn patch_names(&self) -> Vec<(String, PatchKindDef)> {
        let mut out: Vec<(String, PatchKindDef)> = Vec::new();
        for (name, kind) in self.side_patches() {
            if !out.iter().any(|(n, _)| *n == name) {
                out.push((name, kind));
            }
        }
        out
    }

    pub fn n_cells(&self) -> usize {
        self.cells.iter().product()
    }
}

// ------------------------------------------------------------- control

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlDef {
    #[serde(default)]
    pub start_time: f64,
    pub end_time: f64,
    pub delta_t: f64,
    #[serde(default)]
    pub write_control: WriteControlDef,
    pub write_interval: f64,
    #[serde(default)]
    pub adjust_time_step: bool,
    #[serde(default = "default_max_co")]
    pub max_co: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delta_t: Option<f64>,
}

fn default_max_co() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum WriteControlDef {
    #[default]
    TimeStep,
    RunTime,
    AdjustableRunTime,
}

// -------------------------------------------------------------- fields

/// Initial values and boundary conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldsDef {
    pub p: ScalarFieldDef,
    #[serde(rename = "Urel")]
    pub urel: VectorFieldDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalarFieldDef {
    #[serde(default)]
    pub internal: f64,
    /// Boundary condition per patch name; empty patches may be omitted.
    #[serde(default)]
    pub boundary: BTreeMap<String, ScalarBcDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorFieldDef {
    #[serde(default)]
    pub internal: [f64; 3],
    #[serde(default)]
    pub boundary: BTreeMap<String, VectorBcDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScalarBcDef {
    FixedValue { value: f64 },
    ZeroGradient,
    FixedGradient { gradient: f64 },
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VectorBcDef {
    FixedValue {
        value: [f64; 3],
    },
    /// Fixed zero velocity.
    NoSlip,
    ZeroGradient,
    FixedGradient {
        gradient: [f64; 3],
    },
    /// Velocity given in the inertial frame (`relative: false`) or
    /// directly for `Urel`.
    SrfVelocity {
        value: [f64; 3],
        #[serde(default)]
        relative: bool,
    },
    Empty,
}

impl ScalarBcDef {
    pub fn is_empty_kind(&self) -> bool {
        matches!(self, ScalarBcDef::Empty)
    }
}

impl VectorBcDef {
    pub fn is_empty_kind(&self) -> bool {
        matches!(self, VectorBcDef::Empty)
    }
}

// -------------------------------------------------------------- pimple

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PimpleDef {
    #[serde(default = "one")]
    pub n_outer_correctors: usize,
    #[serde(default = "one")]
    pub n_correctors: usize,
    #[serde(default)]
    pub n_non_orthogonal_correctors: usize,
    #[serde(default = "yes")]
    pub momentum_predictor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_ref_cell: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_ref_point: Option<[f64; 3]>,
    #[serde(default)]
    pub p_ref_value: f64,
    #[serde(default = "yes")]
    pub turb_on_final_iter_only: bool,
    /// Outer iterations between turbulence corrections when not only on
    /// the final iteration.
    #[serde(default = "one")]
    pub turbulence_interval: usize,
    #[serde(default)]
    pub residual_control: BTreeMap<String, ResidualControlDef>,
}

impl Default for PimpleDef {
    fn default() -> Self {
        Self {
            n_outer_correctors: 1,
            n_correctors: 1,
            n_non_orthogonal_correctors: 0,
            momentum_predictor: true,
            p_ref_cell: None,
            p_ref_point: None,
            p_ref_value: 0.0,
            turb_on_final_iter_only: true,
            turbulence_interval: 1,
            residual_control: BTreeMap::new(),
        }
    }
}

fn one() -> usize {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResidualControlDef {
    pub tolerance: f64,
    #[serde(default)]
    pub rel_tol: f64,
}

// ------------------------------------------------------------- solvers

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SolverDef {
    pub solver: SolverKindDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditioner: Option<PreconditionerDef>,
    pub tolerance: f64,
    #[serde(default)]
    pub rel_tol: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default)]
    pub min_iter: usize,
}

fn default_max_iter() -> usize {
    1000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolverKindDef {
    #[serde(rename = "PCG")]
    Pcg,
    #[serde(rename = "PBiCGStab")]
    PBiCgStab,
    #[serde(rename = "smoothSolver")]
    SmoothSolver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PreconditionerDef {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "diagonal")]
    Diagonal,
    #[serde(rename = "DIC")]
    Dic,
    #[serde(rename = "DILU")]
    Dilu,
}

/// Under-relaxation factors keyed by field name, `<name>Final` allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RelaxationDef {
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
    #[serde(default)]
    pub equations: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SchemesDef {
    #[serde(default)]
    pub convection: ConvectionDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConvectionDef {
    #[default]
    Upwind,
    Linear,
}

// -------------------------------------------------------------- models

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportDef {
    /// Kinematic viscosity (m^2/s).
    pub nu: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurbulenceDef {
    #[default]
    Laminar,
    Smagorinsky {
        #[serde(default = "default_cs")]
        cs: f64,
    },
}

fn default_cs() -> f64 {
    0.17
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SrfDef {
    pub origin: [f64; 3],
    pub axis: [f64; 3],
    pub rpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SelectionDef {
    #[default]
    All,
    Box {
        min: [f64; 3],
        max: [f64; 3],
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum VolumeModeDef {
    #[default]
    Specific,
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceDef {
    /// Constant volumetric force.
    #[serde(rename_all = "camelCase")]
    Explicit {
        name: String,
        #[serde(default)]
        selection: SelectionDef,
        value: [f64; 3],
        #[serde(default)]
        volume_mode: VolumeModeDef,
    },
    /// Pressure-gradient driven flow-rate control.
    #[serde(rename_all = "camelCase")]
    MeanVelocityForce {
        name: String,
        #[serde(default)]
        selection: SelectionDef,
        u_bar: [f64; 3],
        #[serde(default = "default_relaxation")]
        relaxation: f64,
        #[serde(default)]
        grad_p_initial: f64,
    },
    #[serde(rename_all = "camelCase")]
    FixedVelocity {
        name: String,
        #[serde(default)]
        selection: SelectionDef,
        value: [f64; 3],
    },
    #[serde(rename_all = "camelCase")]
    VelocityLimit {
        name: String,
        #[serde(default)]
        selection: SelectionDef,
        max: f64,
    },
}

fn default_relaxation() -> f64 {
    1.0
}

impl SourceDef {
    pub fn name(&self) -> &str {
        match self {
            SourceDef::Explicit { name, .. }
            | SourceDef::MeanVelocityForce { name, .. }
            | SourceDef::FixedVelocity { name, .. }
            | SourceDef::VelocityLimit { name, .. } => name,
        }
    }

    pub fn selection(&self) -> &SelectionDef {
        match self {
            SourceDef::Explicit { selection, .. }
            | SourceDef::MeanVelocityForce { selection, .. }
            | SourceDef::FixedVelocity { selection, .. }
            | SourceDef::VelocityLimit { selection, .. } => selection,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsDef {
    /// Global continuity error above which a step is flagged.
    #[serde(default = "default_continuity_warning")]
    pub continuity_warning: f64,
}

impl Default for DiagnosticsDef {
    fn default() -> Self {
        Self {
            continuity_warning: default_continuity_warning(),
        }
    }
}

fn default_continuity_warning() -> f64 {
    1e-6
}
