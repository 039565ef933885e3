//! Field I/O between the solver state and time directories.

use rf_mesh::Mesh;
use rf_models::FrameModel;
use rf_pimple::FlowState;
use rf_results::{FieldFile, FieldStore, ReadPolicy, ResultsError, WritePolicy};
use rf_sim::time_name;

use crate::compile::{CaseRuntime, compile_case};
use crate::error::{AppError, AppResult};

/// Read and write behaviour of one solution field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIo {
    pub name: &'static str,
    pub read: ReadPolicy,
    pub write: WritePolicy,
}

/// `p` and `Urel` are required, the flux is reused when present and the
/// absolute velocity is always derived.
pub const FIELD_IO: [FieldIo; 4] = [
    FieldIo {
        name: "p",
        read: ReadPolicy::MustRead,
        write: WritePolicy::AutoWrite,
    },
    FieldIo {
        name: "Urel",
        read: ReadPolicy::MustRead,
        write: WritePolicy::AutoWrite,
    },
    FieldIo {
        name: "phi",
        read: ReadPolicy::ReadIfPresent,
        write: WritePolicy::AutoWrite,
    },
    FieldIo {
        name: "U",
        read: ReadPolicy::NoRead,
        write: WritePolicy::AutoWrite,
    },
];

fn policy(name: &str) -> ReadPolicy {
    FIELD_IO
        .iter()
        .find(|io| io.name == name)
        .map(|io| io.read)
        .unwrap_or(ReadPolicy::NoRead)
}

fn writes(name: &str) -> bool {
    FIELD_IO
        .iter()
        .any(|io| io.name == name && io.write == WritePolicy::AutoWrite)
}

fn missing(time: &str, err: ResultsError) -> AppError {
    match err {
        ResultsError::FieldNotFound { .. } => AppError::FieldsMissing {
            time: time.to_string(),
            message: err.to_string(),
        },
        other => other.into(),
    }
}

/// Load the solution state stored under `time`.
pub fn read_state(
    store: &FieldStore,
    mesh: &Mesh,
    time: &str,
    frame: &dyn FrameModel,
) -> AppResult<FlowState> {
    let read = |name: &str| {
        store
            .read_field(time, name, policy(name))
            .map_err(|e| missing(time, e))
    };
    let p = read("p")?
        .ok_or_else(|| AppError::InvalidInput("p is never read".to_string()))?
        .to_vol::<f64>(mesh)?;
    let urel = read("Urel")?
        .ok_or_else(|| AppError::InvalidInput("Urel is never read".to_string()))?
        .to_vol::<rf_core::Vec3>(mesh)?;
    let phi = match read("phi")? {
        Some(file) => Some(file.to_surface(mesh)?),
        None => None,
    };
    tracing::info!(time, reused_flux = phi.is_some(), "fields read");
    Ok(FlowState::new(mesh, p, urel, phi, frame)?)
}

/// Write every auto-written field of `state` under `time`.
pub fn write_state(
    store: &FieldStore,
    mesh: &Mesh,
    state: &FlowState,
    time: &str,
) -> AppResult<()> {
    let files = [
        FieldFile::from_vol(&state.p, mesh, time),
        FieldFile::from_vol(&state.urel, mesh, time),
        FieldFile::from_surface(&state.phi, time),
        FieldFile::from_vol(&state.u, mesh, time),
    ];
    for file in files.iter().filter(|f| writes(&f.name)) {
        store.write_field(file)?;
    }
    Ok(())
}

/// Outcome of [`init_case`].
#[derive(Debug, Clone)]
pub struct InitReport {
    pub time: String,
    pub fields: Vec<String>,
    pub n_cells: usize,
}

/// Write the initial fields of the case in `case_dir` to its start time
/// directory.
pub fn init_case(case_dir: &std::path::Path) -> AppResult<InitReport> {
    let case = crate::load_case(case_dir)?;
    let rt = compile_case(&case)?;
    init_runtime(case_dir, &rt)
}

pub(crate) fn init_runtime(case_dir: &std::path::Path, rt: &CaseRuntime) -> AppResult<InitReport> {
    let frame = rt.frame()?;
    let (p, urel) = rt.initial_fields()?;
    let state = FlowState::new(&rt.mesh, p, urel, None, frame.as_ref())?;
    let store = FieldStore::new(case_dir.to_path_buf())?;
    let time = time_name(rt.time.start_time);
    write_state(&store, &rt.mesh, &state, &time)?;
    let fields = FIELD_IO
        .iter()
        .filter(|io| io.write == WritePolicy::AutoWrite)
        .map(|io| io.name.to_string())
        .collect();
    tracing::info!(case = %rt.case.name, time = %time, "initial fields written");
    Ok(InitReport {
        time,
        fields,
        n_cells: rt.mesh.n_cells(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_table_policies() {
        assert_eq!(policy("p"), ReadPolicy::MustRead);
        assert_eq!(policy("Urel"), ReadPolicy::MustRead);
        assert_eq!(policy("phi"), ReadPolicy::ReadIfPresent);
        assert_eq!(policy("U"), ReadPolicy::NoRead);
        assert_eq!(policy("k"), ReadPolicy::NoRead);
        assert!(FIELD_IO.iter().all(|io| writes(io.name)));
    }
}
