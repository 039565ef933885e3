//! Ready-made cases.

use std::collections::BTreeMap;

use crate::schema::*;
use crate::validate::LATEST_VERSION;

/// 2-D lid-driven cavity in a slowly rotating frame. Walls and lid are
/// specified in the inertial frame.
pub fn rotating_cavity() -> Case {
    let p_boundary = BTreeMap::from([
        ("lid".to_string(), ScalarBcDef::ZeroGradient),
        ("walls".to_string(), ScalarBcDef::ZeroGradient),
    ]);
    let u_boundary = BTreeMap::from([
        (
            "lid".to_string(),
            VectorBcDef::SrfVelocity {
                value: [1.0, 0.0, 0.0],
                relative: false,
            },
        ),
        (
            "walls".to_string(),
            VectorBcDef::SrfVelocity {
                value: [0.0; 3],
                relative: false,
            },
        ),
    ]);

    Case {
        version: LATEST_VERSION,
        name: "rotatingCavity".to_string(),
        mesh: MeshDef {
            cells: [16, 16, 1],
            lengths: [1.0, 1.0, 0.1],
            origin: [0.0; 3],
            shear: 0.0,
            patches: vec![
                PatchDef {
                    name: "lid".to_string(),
                    kind: PatchKindDef::Wall,
                    sides: vec![SideDef::YMax],
                },
                PatchDef {
                    name: "walls".to_string(),
                    kind: PatchKindDef::Wall,
                    sides: vec![SideDef::XMin, SideDef::XMax, SideDef::YMin],
                },
                PatchDef {
                    name: "frontAndBack".to_string(),
                    kind: PatchKindDef::Empty,
                    sides: vec![SideDef::ZMin, SideDef::ZMax],
                },
            ],
        },
        control: ControlDef {
            start_time: 0.0,
            end_time: 0.5,
            delta_t: 0.005,
            write_control: WriteControlDef::TimeStep,
            write_interval: 20.0,
            adjust_time_step: false,
            max_co: 1.0,
            max_delta_t: None,
        },
        fields: FieldsDef {
            p: ScalarFieldDef {
                internal: 0.0,
                boundary: p_boundary,
            },
            urel: VectorFieldDef {
                internal: [0.0; 3],
                boundary: u_boundary,
            },
        },
        pimple: PimpleDef {
            n_correctors: 2,
            p_ref_cell: Some(0),
            ..Default::default()
        },
        solvers: BTreeMap::from([
            (
                "p".to_string(),
                SolverDef {
                    solver: SolverKindDef::Pcg,
                    preconditioner: Some(PreconditionerDef::Dic),
                    tolerance: 1e-6,
                    rel_tol: 0.05,
                    max_iter: 1000,
                    min_iter: 0,
                },
            ),
            (
                "pFinal".to_string(),
                SolverDef {
                    solver: SolverKindDef::Pcg,
                    preconditioner: Some(PreconditionerDef::Dic),
                    tolerance: 1e-6,
                    rel_tol: 0.0,
                    max_iter: 1000,
                    min_iter: 0,
                },
            ),
            (
                "Urel".to_string(),
                SolverDef {
                    solver: SolverKindDef::PBiCgStab,
                    preconditioner: Some(PreconditionerDef::Dilu),
                    tolerance: 1e-5,
                    rel_tol: 0.0,
                    max_iter: 1000,
                    min_iter: 0,
                },
            ),
        ]),
        relaxation: RelaxationDef::default(),
        schemes: SchemesDef::default(),
        transport: TransportDef { nu: 0.01 },
        turbulence: TurbulenceDef::Laminar,
        srf: Some(SrfDef {
            origin: [0.5, 0.5, 0.0],
            axis: [0.0, 0.0, 1.0],
            rpm: 10.0,
        }),
        sources: Vec::new(),
        diagnostics: DiagnosticsDef::default(),
    }
}
