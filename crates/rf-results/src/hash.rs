//! Content hash of a case definition.

use rf_case::Case;
use sha2::{Digest, Sha256};

pub fn compute_case_hash(case: &Case, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let case_json = serde_json::to_string(case).unwrap_or_default();
    hasher.update(case_json.as_bytes());
    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_case::templates::rotating_cavity;

    #[test]
    fn hash_stability() {
        let case = rotating_cavity();
        assert_eq!(
            compute_case_hash(&case, "v1"),
            compute_case_hash(&case, "v1")
        );
        assert_eq!(compute_case_hash(&case, "v1").len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let case = rotating_cavity();
        let mut faster = case.clone();
        if let Some(srf) = faster.srf.as_mut() {
            srf.rpm = 20.0;
        }
        assert_ne!(
            compute_case_hash(&case, "v1"),
            compute_case_hash(&faster, "v1")
        );
        assert_ne!(
            compute_case_hash(&case, "v1"),
            compute_case_hash(&case, "v2")
        );
    }
}
