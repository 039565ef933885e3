use std::path::Path;

use rf_case::{SourceDef, TurbulenceDef, WriteControlDef, load_case_dir};

fn cases_root() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../cases")
}

#[test]
fn bundled_cases_load_and_validate() {
    for name in ["rotatingCavity", "rotatingBox"] {
        let dir = cases_root().join(name);
        let case = load_case_dir(&dir).unwrap_or_else(|e| panic!("failed to load {name}: {e}"));
        assert_eq!(case.name, name);
    }
}

#[test]
fn rotating_cavity_matches_template() {
    let case = load_case_dir(&cases_root().join("rotatingCavity")).unwrap();
    assert_eq!(case, rf_case::templates::rotating_cavity());
}

#[test]
fn rotating_box_sections() {
    let case = load_case_dir(&cases_root().join("rotatingBox")).unwrap();
    assert_eq!(case.control.write_control, WriteControlDef::AdjustableRunTime);
    assert!(case.control.adjust_time_step);
    assert_eq!(case.pimple.n_outer_correctors, 3);
    assert_eq!(case.pimple.residual_control.len(), 2);
    assert_eq!(case.turbulence, TurbulenceDef::Smagorinsky { cs: 0.17 });
    assert!(matches!(&case.sources[..], [SourceDef::Explicit { name, .. }] if name == "gravity"));
    assert_eq!(case.relaxation.equations["UrelFinal"], 1.0);
}
