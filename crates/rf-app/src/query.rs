//! Query helpers for written results.

use std::path::Path;

use rf_results::{FieldStore, FieldSummary, ReadPolicy, RunManifest, StepRecord};

use crate::error::{AppError, AppResult};

fn store(case_dir: &Path) -> AppResult<FieldStore> {
    if !case_dir.is_dir() {
        return Err(AppError::CaseDirMissing {
            path: case_dir.to_path_buf(),
        });
    }
    Ok(FieldStore::new(case_dir.to_path_buf())?)
}

/// Time directory names, ascending.
pub fn list_times(case_dir: &Path) -> AppResult<Vec<String>> {
    Ok(store(case_dir)?
        .list_times()?
        .into_iter()
        .map(|(_, name)| name)
        .collect())
}

/// Min, max and mean magnitude of a stored field's cell values.
pub fn field_summary(case_dir: &Path, time: &str, field: &str) -> AppResult<FieldSummary> {
    let file = store(case_dir)?
        .read_field(time, field, ReadPolicy::MustRead)?
        .ok_or_else(|| AppError::InvalidInput(format!("{field} was not read")))?;
    file.summary()
        .ok_or_else(|| AppError::InvalidInput(format!("{field} at {time} has no values")))
}

pub fn load_steps(case_dir: &Path) -> AppResult<Vec<StepRecord>> {
    Ok(store(case_dir)?.load_steps()?)
}

pub fn load_manifest(case_dir: &Path) -> AppResult<RunManifest> {
    Ok(store(case_dir)?.load_manifest()?)
}

/// Steps whose outer loop did not converge or whose continuity error was
/// flagged.
pub fn troubled_steps(records: &[StepRecord]) -> Vec<&StepRecord> {
    records
        .iter()
        .filter(|r| !r.converged || r.continuity_warning)
        .collect()
}

/// Time series of one field's first-iteration initial residual.
pub fn residual_series(records: &[StepRecord], field: &str) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| r.initial_residuals.get(field).map(|v| (r.time, *v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(time: f64, converged: bool, warning: bool, p: Option<f64>) -> StepRecord {
        StepRecord {
            time,
            delta_t: 0.01,
            courant: None,
            n_outer: 1,
            converged,
            initial_residuals: p
                .map(|v| BTreeMap::from([("p".to_string(), v)]))
                .unwrap_or_default(),
            unconverged_solves: 0,
            continuity_sum_local: 0.0,
            continuity_global: 0.0,
            continuity_cumulative: 0.0,
            continuity_warning: warning,
        }
    }

    #[test]
    fn filters_and_series() {
        let records = vec![
            record(0.01, true, false, Some(1.0)),
            record(0.02, false, false, None),
            record(0.03, true, true, Some(0.1)),
        ];
        let troubled: Vec<f64> = troubled_steps(&records).iter().map(|r| r.time).collect();
        assert_eq!(troubled, [0.02, 0.03]);
        assert_eq!(residual_series(&records, "p"), [(0.01, 1.0), (0.03, 0.1)]);
    }

    #[test]
    fn missing_case_dir() {
        let dir = std::env::temp_dir().join("rf_app_query_missing_dir_does_not_exist");
        assert!(matches!(
            list_times(&dir),
            Err(AppError::CaseDirMissing { .. })
        ));
    }
}
