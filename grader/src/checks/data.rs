use crate::context::Grader;
use crate::error::GradeError;
use crate::npy::read_npy;
use crate::tolerance::{allclose, isclose_complex};
use crate::verdict::Verdict;
use hamiltonian::Observable;
use num_complex::Complex64;
use qsim::{Circuit, StateVector};
use tracing::debug;

pub const GLOBAL_HAMILTONIAN_FILE: &str = "test8_H_global_matrix.npy";
pub const LOCAL_HAMILTONIAN_FILE: &str = "test8_H_local_matrix.npy";

impl Grader {
    /// 8a: amplitude encoding, checked at basis states 0 and 519.
    pub fn data_encoding(&mut self, circuit: &Circuit) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("8a");
        let state = StateVector::from_circuit(circuit)?;
        let amplitude = |k: usize| state.amplitudes.get(k).copied();
        debug!(first = ?amplitude(0), last = ?amplitude(519), "encoded amplitudes");
        let correct = amplitude(0).is_some_and(|a| isclose_complex(a, Complex64::new(0.91287093, 0.0)))
            && amplitude(519).is_some_and(|a| isclose_complex(a, Complex64::new(0.4082482904638631, 0.0)));
        if correct {
            verdict.say("Felicidades, tu circuito esta correcto!!");
        } else {
            verdict.fail("Tu circuito esta incorrecto");
        }
        Ok(verdict.finish())
    }

    /// 8b: global and local Hamiltonians against the matrices stored in `data_dir`.
    pub fn hamiltonians_from_data(
        &mut self,
        global: impl Fn() -> Result<Observable, GradeError>,
        local: impl Fn() -> Result<Observable, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("8b");
        let global_matrix = global()?.to_matrix();
        let global_ref = read_npy(&self.config.data_dir.join(GLOBAL_HAMILTONIAN_FILE))?;
        let local_matrix = local()?.to_matrix();
        let local_ref = read_npy(&self.config.data_dir.join(LOCAL_HAMILTONIAN_FILE))?;

        let global_ok = allclose(&global_matrix, &global_ref);
        let local_ok = allclose(&local_matrix, &local_ref);
        debug!(global_ok, local_ok, "data hamiltonians");
        if global_ok && local_ok {
            verdict.say("Tus Hamiltonianos están correctos!!");
        } else {
            verdict.fail("Tus Hamiltonianos están equivocados!!");
        }
        Ok(verdict.finish())
    }
}
