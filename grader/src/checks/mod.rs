//! Every grading check, as a method on [`Grader`](crate::Grader).
//!
//! Each check builds its reference, builds the candidate artefact, compares the
//! two and reports a [`Verdict`](crate::Verdict) carrying the course's messages.

mod data;
mod ghz;
mod mitigation;
mod phase;
mod portfolio;
mod qec;
mod qkd;
mod qml;
mod trotter;

pub use data::{GLOBAL_HAMILTONIAN_FILE, LOCAL_HAMILTONIAN_FILE};
pub use ghz::ghz_reference;
pub use phase::PHASE;
pub use trotter::heisenberg_chain;

/// What a check grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// A single circuit, gradable from an OpenQASM file.
    Circuit,
    /// A function, operator or data set supplied from Rust.
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: CandidateKind,
}

const fn check(id: &'static str, name: &'static str, kind: CandidateKind) -> CheckInfo {
    CheckInfo { id, name, kind }
}

pub const CHECKS: &[CheckInfo] = &[
    check("1a", "ghz_state", CandidateKind::Circuit),
    check("1b", "ghz_on_device", CandidateKind::Circuit),
    check("2a", "folding", CandidateKind::Code),
    check("2b", "pauli_observable", CandidateKind::Code),
    check("2c", "zero_noise_extrapolation", CandidateKind::Code),
    check("3a", "fourier_transform", CandidateKind::Code),
    check("3b", "controlled_power", CandidateKind::Code),
    check("3c", "phase_estimation", CandidateKind::Code),
    check("4a", "measurement_bases", CandidateKind::Code),
    check("4b", "trit_operations", CandidateKind::Code),
    check("4c", "key_distribution", CandidateKind::Code),
    check("5", "trotterization", CandidateKind::Code),
    check("6a", "asset_operator", CandidateKind::Code),
    check("6b", "cost_hamiltonian", CandidateKind::Code),
    check("6c", "constraint_hamiltonian", CandidateKind::Code),
    check("6d", "initial_state", CandidateKind::Circuit),
    check("7a", "ansatz", CandidateKind::Code),
    check("7b", "kernel_element", CandidateKind::Code),
    check("7c", "classifier", CandidateKind::Code),
    check("8a", "data_encoding", CandidateKind::Circuit),
    check("8b", "hamiltonians_from_data", CandidateKind::Code),
    check("9a", "bit_flip_code", CandidateKind::Circuit),
    check("9b", "shor_code_cx", CandidateKind::Circuit),
    check("9c", "shor_code_layout", CandidateKind::Code),
];

/// Looks a check up by id (`"1a"`) or name (`"ghz_state"`).
pub fn find(key: &str) -> Option<&'static CheckInfo> {
    CHECKS.iter().find(|c| c.id == key || c.name == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_and_names_are_unique() {
        let ids: HashSet<_> = CHECKS.iter().map(|c| c.id).collect();
        let names: HashSet<_> = CHECKS.iter().map(|c| c.name).collect();
        assert_eq!(ids.len(), CHECKS.len());
        assert_eq!(names.len(), CHECKS.len());
        assert_eq!(find("ghz_state").map(|c| c.id), Some("1a"));
        assert!(find("10a").is_none());
    }
}
