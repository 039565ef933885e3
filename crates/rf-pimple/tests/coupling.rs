//! Whole-step behaviour of the coupled solver on small cavities.

use rf_core::Vec3;
use rf_fvm::{
    PatchField, Preconditioner, RelaxationFactors, SolverControls, SolverDict, SolverKind,
    VolField, fvc,
};
use rf_mesh::{BlockPatches, BlockSide, BlockSpec, Mesh, PatchKind, block_mesh};
use rf_models::{
    CellSelection, ExplicitSource, FrameModel, Laminar, RotatingFrame, SourceList,
    StationaryFrame, VolumeMode,
};
use rf_pimple::{
    FlowState, PimpleControls, PimpleModels, PimpleSettings, PimpleSolver, ReferenceLocation,
    ReferenceSpec, StepReport,
};

fn cavity(n: usize, shear: f64) -> Mesh {
    let mut spec = BlockSpec::unit_cube([n, n, 1]);
    spec.shear = shear;
    spec.patches = BlockPatches::two_dimensional("walls", "frontAndBack");
    spec.patches.set(BlockSide::YMax, "lid", PatchKind::Wall);
    block_mesh(&spec).unwrap()
}

fn solvers() -> SolverDict {
    SolverDict::new()
        .with("p", SolverControls::pcg(1e-10, 0.0))
        .with("pFinal", SolverControls::pcg(1e-12, 0.0))
        .with("Urel", SolverControls::pbicgstab(1e-10, 0.0))
}

fn settings(n_outer: usize, n_corr: usize, n_non_orth: usize) -> PimpleSettings {
    PimpleSettings {
        controls: PimpleControls {
            n_outer,
            n_corr,
            n_non_orth,
            ..Default::default()
        },
        solvers: solvers(),
        reference: ReferenceSpec {
            location: ReferenceLocation::Cell(0),
            value: 0.0,
        },
        ..Default::default()
    }
}

fn initial_state(mesh: &Mesh, lid_speed: f64, frame: &dyn FrameModel) -> FlowState {
    let p = VolField::uniform("p", mesh, 0.0, |p| PatchField::zero_gradient(p.size)).unwrap();
    let urel = VolField::uniform("Urel", mesh, Vec3::zeros(), |p| {
        let value = if p.name == "lid" {
            Vec3::new(lid_speed, 0.0, 0.0)
        } else {
            Vec3::zeros()
        };
        PatchField::uniform_fixed_value(value, p.size)
    })
    .unwrap();
    FlowState::new(mesh, p, urel, None, frame).unwrap()
}

fn solver(
    mesh: &Mesh,
    state: &FlowState,
    settings: PimpleSettings,
    frame: Box<dyn FrameModel>,
    sources: SourceList,
) -> PimpleSolver {
    let models = PimpleModels {
        turbulence: Box::new(Laminar::new(mesh, 0.01).unwrap()),
        frame,
        sources,
    };
    PimpleSolver::new(mesh, state, settings, models).unwrap()
}

fn run(
    mesh: &Mesh,
    state: &mut FlowState,
    solver: &mut PimpleSolver,
    steps: usize,
    dt: f64,
) -> Vec<StepReport> {
    (1..=steps)
        .map(|i| solver.step(mesh, state, i as f64 * dt, dt).unwrap())
        .collect()
}

fn max_cell_imbalance(mesh: &Mesh, phi: &[f64]) -> f64 {
    fvc::surface_integrate(mesh, phi)
        .iter()
        .fold(0.0, |m, v| m.max(v.abs()))
}

#[test]
fn corrected_flux_conserves_mass_in_every_cell() {
    let mesh = cavity(8, 0.0);
    let frame = RotatingFrame::from_rpm(Vec3::new(0.5, 0.5, 0.0), Vec3::z(), 30.0).unwrap();
    let mut state = initial_state(&mesh, 1.0, &frame);
    let mut s = solver(&mesh, &state, settings(2, 2, 0), Box::new(frame), SourceList::new());
    let reports = run(&mesh, &mut state, &mut s, 3, 0.01);

    assert!(max_cell_imbalance(&mesh, state.phi.values()) < 1e-9);
    let phi_max = state.phi.values().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    assert!(phi_max > 1e-3, "the lid should drive a flow");
    for r in &reports {
        assert_eq!(r.n_outer(), 2);
        assert!(r.continuity.sum_local < 1e-9);
        assert!(!r.continuity_warning);
    }
}

#[test]
fn non_orthogonal_correction_keeps_conservation() {
    let mesh = cavity(6, 0.3);
    assert!(mesh.is_non_orthogonal());
    let mut state = initial_state(&mesh, 1.0, &StationaryFrame);
    let mut s = solver(
        &mesh,
        &state,
        settings(1, 2, 2),
        Box::new(StationaryFrame),
        SourceList::new(),
    );
    let reports = run(&mesh, &mut state, &mut s, 2, 0.01);

    // (nNonOrth + 1) pressure solves per corrector
    assert_eq!(reports[0].outer[0].pressure.len(), 2 * 3);
    assert!(max_cell_imbalance(&mesh, state.phi.values()) < 1e-9);
}

#[test]
fn single_non_orthogonal_pass_when_none_requested() {
    let mesh = cavity(4, 0.0);
    let mut state = initial_state(&mesh, 1.0, &StationaryFrame);
    let mut s = solver(
        &mesh,
        &state,
        settings(1, 1, 0),
        Box::new(StationaryFrame),
        SourceList::new(),
    );
    let report = s.step(&mesh, &mut state, 0.01, 0.01).unwrap();
    assert_eq!(report.outer.len(), 1);
    assert_eq!(report.outer[0].pressure.len(), 1);
    assert_eq!(report.outer[0].momentum.len(), 3);
    assert!(report.outer[0].final_iteration);
    assert!(report.outer[0].turbulence_corrected);
    assert!(max_cell_imbalance(&mesh, state.phi.values()) < 1e-9);
}

#[test]
fn reference_cell_holds_its_value() {
    let mesh = cavity(8, 0.0);
    let frame = RotatingFrame::from_rpm(Vec3::new(0.5, 0.5, 0.0), Vec3::z(), 60.0).unwrap();
    let mut state = initial_state(&mesh, 0.0, &frame);
    let mut cfg = settings(2, 1, 0);
    cfg.reference = ReferenceSpec {
        location: ReferenceLocation::Cell(0),
        value: 5.0,
    };
    let mut s = solver(&mesh, &state, cfg, Box::new(frame), SourceList::new());
    run(&mesh, &mut state, &mut s, 2, 0.01);

    assert!((state.p.internal()[0] - 5.0).abs() < 1e-6);
    // the centrifugal load raises the pressure away from the axis
    let centre = mesh.find_cell(&Vec3::new(0.45, 0.45, 0.5)).unwrap();
    let corner = mesh.find_cell(&Vec3::new(0.95, 0.95, 0.5)).unwrap();
    assert!(state.p.internal()[corner] > state.p.internal()[centre]);
}

#[test]
fn absolute_velocity_adds_frame_motion() {
    let mesh = cavity(6, 0.0);
    let origin = Vec3::new(0.5, 0.5, 0.0);
    let frame = RotatingFrame::from_rpm(origin, Vec3::z(), 120.0).unwrap();
    let omega = frame.omega();
    let mut state = initial_state(&mesh, 1.0, &frame);
    let mut s = solver(&mesh, &state, settings(1, 2, 0), Box::new(frame), SourceList::new());
    run(&mesh, &mut state, &mut s, 2, 0.005);

    for (c, centre) in mesh.cell_centres().iter().enumerate() {
        let expected = state.urel.internal()[c] + omega.cross(&(centre - origin));
        assert!((state.u.internal()[c] - expected).norm() < 1e-12);
        // rotation about z keeps the motion in plane
        assert!(state.urel.internal()[c].z.abs() < 1e-14);
    }
}

#[test]
fn rotation_about_x_gives_out_of_plane_absolute_velocity() {
    let mut spec = BlockSpec::unit_cube([3, 3, 3]);
    for side in BlockSide::ALL {
        spec.patches.set(side, "walls", PatchKind::Wall);
    }
    let mesh = block_mesh(&spec).unwrap();
    let frame = RotatingFrame::from_rpm(Vec3::new(0.0, 0.5, 0.5), Vec3::x(), 60.0).unwrap();
    let mut state = initial_state(&mesh, 0.0, &frame);
    let mut s = solver(&mesh, &state, settings(1, 1, 0), Box::new(frame), SourceList::new());
    run(&mesh, &mut state, &mut s, 1, 0.01);

    let uz_max = state.u.internal().iter().fold(0.0f64, |m, u| m.max(u.z.abs()));
    assert!(uz_max > 0.1);
}

/// Sum of the z velocity over the cell layer under the lid.
fn lid_layer_w(mesh: &Mesh, state: &FlowState) -> f64 {
    mesh.cell_centres()
        .iter()
        .zip(state.urel.internal())
        .filter(|(c, _)| c.y > 0.75)
        .map(|(_, u)| u.z)
        .sum()
}

#[test]
fn coriolis_deflects_lid_flow_out_of_plane() {
    let mut spec = BlockSpec::unit_cube([4, 4, 4]);
    for side in BlockSide::ALL {
        spec.patches.set(side, "walls", PatchKind::Wall);
    }
    spec.patches.set(BlockSide::YMax, "lid", PatchKind::Wall);
    let mesh = block_mesh(&spec).unwrap();

    let mut still = initial_state(&mesh, 1.0, &StationaryFrame);
    let mut s = solver(
        &mesh,
        &still,
        settings(2, 2, 0),
        Box::new(StationaryFrame),
        SourceList::new(),
    );
    run(&mesh, &mut still, &mut s, 5, 0.01);

    // the lid moves along x, the axis is y: 2 Omega x Urel points along z
    let frame = RotatingFrame::from_rpm(Vec3::new(0.5, 0.5, 0.5), Vec3::y(), 60.0).unwrap();
    let mut rotating = initial_state(&mesh, 1.0, &frame);
    let mut s = solver(&mesh, &rotating, settings(2, 2, 0), Box::new(frame), SourceList::new());
    run(&mesh, &mut rotating, &mut s, 5, 0.01);

    let w_still = lid_layer_w(&mesh, &still);
    let w_rotating = lid_layer_w(&mesh, &rotating);
    assert!(w_still.abs() < 1e-6, "symmetric control drifted: {w_still}");
    assert!(w_rotating.abs() > 1e-3, "no deflection: {w_rotating}");
    assert!(max_cell_imbalance(&mesh, rotating.phi.values()) < 1e-9);
}

#[test]
fn stationary_frame_matches_zero_speed_rotation() {
    let mesh = cavity(5, 0.0);
    let still = StationaryFrame;
    let zero = RotatingFrame::from_rpm(Vec3::zeros(), Vec3::z(), 0.0).unwrap();

    let mut a = initial_state(&mesh, 1.0, &still);
    let mut sa = solver(&mesh, &a, settings(2, 2, 0), Box::new(still), SourceList::new());
    run(&mesh, &mut a, &mut sa, 2, 0.01);

    let mut b = initial_state(&mesh, 1.0, &zero);
    let mut sb = solver(&mesh, &b, settings(2, 2, 0), Box::new(zero), SourceList::new());
    run(&mesh, &mut b, &mut sb, 2, 0.01);

    assert_eq!(a.urel.internal(), b.urel.internal());
    assert_eq!(a.p.internal(), b.p.internal());
    assert_eq!(a.phi.values(), b.phi.values());
    assert_eq!(a.u.internal(), b.urel.internal());
}

#[test]
fn final_pressure_solve_uses_final_controls() {
    let mesh = cavity(5, 0.0);
    let mut state = initial_state(&mesh, 1.0, &StationaryFrame);
    let mut cfg = settings(2, 2, 1);
    cfg.solvers.insert(
        "pFinal",
        SolverControls {
            solver: SolverKind::SmoothSolver,
            preconditioner: Preconditioner::None,
            tolerance: 1e-8,
            rel_tol: 0.0,
            ..Default::default()
        },
    );
    let mut s = solver(&mesh, &state, cfg, Box::new(StationaryFrame), SourceList::new());
    let report = s.step(&mesh, &mut state, 0.01, 0.01).unwrap();

    let labels: Vec<&str> = report
        .outer
        .iter()
        .flat_map(|o| o.pressure.iter().map(|p| p.solver.as_str()))
        .collect();
    assert_eq!(labels.len(), 2 * 2 * 2);
    assert_eq!(labels.last(), Some(&"smoothSolver"));
    assert!(labels[..labels.len() - 1].iter().all(|l| *l == "DICPCG"));
}

#[test]
fn relaxed_pressure_settles_monotonically() {
    let mesh = cavity(6, 0.0);
    let gravity = ExplicitSource::new(
        "gravity",
        &mesh,
        &CellSelection::All,
        Vec3::new(0.0, -9.81, 0.0),
        VolumeMode::Specific,
    )
    .unwrap();
    let sources = SourceList::new().with(Box::new(gravity));

    let mut cfg = settings(8, 1, 0);
    let mut relaxation = RelaxationFactors::default();
    relaxation.fields.insert("p".into(), 0.3);
    relaxation.fields.insert("pFinal".into(), 0.3);
    cfg.relaxation = relaxation;

    let mut state = initial_state(&mesh, 0.0, &StationaryFrame);
    let mut s = solver(&mesh, &state, cfg, Box::new(StationaryFrame), sources);
    let report = s.step(&mesh, &mut state, 0.01, 0.01).unwrap();

    let changes: Vec<f64> = report.outer.iter().map(|o| o.p_change).collect();
    assert_eq!(changes.len(), 8);
    assert!(changes[0] > 0.0);
    for w in changes.windows(2) {
        assert!(w[1] < w[0], "pressure change grew: {changes:?}");
    }
    let urel_changes: Vec<f64> = report.outer.iter().map(|o| o.urel_change).collect();
    assert!(urel_changes[0] > 0.0);
    for w in urel_changes.windows(2) {
        assert!(
            w[1] <= w[0] * (1.0 + 1e-9) + 1e-14,
            "velocity change grew: {urel_changes:?}"
        );
    }
    // hydrostatic: pressure falls with height
    let bottom = mesh.find_cell(&Vec3::new(0.5, 0.05, 0.5)).unwrap();
    let top = mesh.find_cell(&Vec3::new(0.5, 0.95, 0.5)).unwrap();
    assert!(state.p.internal()[bottom] > state.p.internal()[top]);
}

#[test]
fn invalid_settings_are_rejected() {
    let mesh = cavity(3, 0.0);
    let state = initial_state(&mesh, 0.0, &StationaryFrame);
    let models = || PimpleModels {
        turbulence: Box::new(Laminar::new(&mesh, 0.01).unwrap()),
        frame: Box::new(StationaryFrame),
        sources: SourceList::new(),
    };

    let mut no_p = settings(1, 1, 0);
    no_p.solvers = SolverDict::new().with("Urel", SolverControls::pbicgstab(1e-8, 0.0));
    assert!(PimpleSolver::new(&mesh, &state, no_p, models()).is_err());

    let mut no_ref = settings(1, 1, 0);
    no_ref.reference = ReferenceSpec::default();
    assert!(PimpleSolver::new(&mesh, &state, no_ref, models()).is_err());

    let mut s = PimpleSolver::new(&mesh, &state, settings(1, 1, 0), models()).unwrap();
    let mut st = state.clone();
    assert!(s.step(&mesh, &mut st, 0.0, 0.0).is_err());
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn any_lid_and_speed_conserves_mass(lid in -2.0f64..2.0, speed in -90.0f64..90.0) {
            let mesh = cavity(4, 0.0);
            let frame = RotatingFrame::from_rpm(Vec3::new(0.5, 0.5, 0.0), Vec3::z(), speed).unwrap();
            let mut state = initial_state(&mesh, lid, &frame);
            let mut s = solver(&mesh, &state, settings(2, 1, 0), Box::new(frame), SourceList::new());
            run(&mesh, &mut state, &mut s, 1, 0.01);
            prop_assert!(max_cell_imbalance(&mesh, state.phi.values()) < 1e-9);
            prop_assert!(state.urel.internal().iter().all(|u| u.norm().is_finite()));
        }
    }
}
