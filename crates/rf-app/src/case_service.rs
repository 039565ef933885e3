//! Case loading, validation and creation.

use std::path::Path;

use rf_case::Case;
use rf_mesh::PatchKind;

use crate::compile::compile_case;
use crate::error::{AppError, AppResult};

/// Summary of a case for listing and validation output.
#[derive(Debug, Clone)]
pub struct CaseSummary {
    pub name: String,
    pub n_cells: usize,
    pub n_faces: usize,
    pub non_orthogonal: bool,
    pub patches: Vec<(String, PatchKind, usize)>,
    pub frame: String,
    pub turbulence: String,
    pub sources: Vec<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub delta_t: f64,
}

/// Load and validate the case definition in `case_dir`.
pub fn load_case(case_dir: &Path) -> AppResult<Case> {
    if !case_dir.is_dir() {
        return Err(AppError::CaseDirMissing {
            path: case_dir.to_path_buf(),
        });
    }
    Ok(rf_case::load_case_dir(case_dir)?)
}

/// Validate a case end to end: schema checks, then mesh and model
/// construction.
pub fn validate_case_dir(case_dir: &Path) -> AppResult<CaseSummary> {
    let case = load_case(case_dir)?;
    let rt = compile_case(&case)?;
    let models = rt.models()?;
    // boundary conditions are only checked against the mesh here
    rt.initial_fields()?;

    Ok(CaseSummary {
        name: case.name.clone(),
        n_cells: rt.mesh.n_cells(),
        n_faces: rt.mesh.n_faces(),
        non_orthogonal: rt.mesh.is_non_orthogonal(),
        patches: rt
            .mesh
            .patches()
            .iter()
            .map(|p| (p.name.clone(), p.kind, p.size))
            .collect(),
        frame: models.frame.name().to_string(),
        turbulence: models.turbulence.name().to_string(),
        sources: models.sources.names().iter().map(|s| s.to_string()).collect(),
        start_time: rt.time.start_time,
        end_time: rt.time.end_time,
        delta_t: rt.time.delta_t,
    })
}

/// Write the rotating cavity template to `case_dir/case.yaml`.
pub fn create_from_template(case_dir: &Path, name: &str) -> AppResult<()> {
    let path = case_dir.join(rf_case::CASE_FILE_NAMES[0]);
    if path.exists() {
        return Err(AppError::InvalidInput(format!(
            "{} already exists",
            path.display()
        )));
    }
    std::fs::create_dir_all(case_dir)?;
    let mut case = rf_case::templates::rotating_cavity();
    case.name = name.to_string();
    rf_case::save_yaml(&path, &case)?;
    Ok(())
}
