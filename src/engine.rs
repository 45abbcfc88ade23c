//! # Engine Abstraction
//!
//! The boundary to the external SAT solving engine. The engine is treated as
//! an opaque collaborator: it owns the variable space and the model, accepts
//! clauses and XOR clauses over already-decoded literals, and answers
//! blocking solve calls with a three-valued result. Everything above this
//! trait ([`crate::solver::Solver`]) is marshalling; everything below it is
//! search.
//!
//! The crate ships one implementation, [`DpllEngine`], mainly for tests and
//! out-of-the-box usability. Real workloads are expected to plug in a
//! full CDCL backend behind the same trait.

use crate::types::{Lit, TernaryVal, Var};

pub mod dpll;

pub use dpll::DpllEngine;

/// Three-valued outcome of a blocking engine solve call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineResult {
    /// The instance is satisfiable under the given assumptions; a model is
    /// available
    Sat,
    /// The instance is unsatisfiable under the given assumptions
    Unsat,
    /// The search was aborted before reaching a conclusion, e.g., because a
    /// time or conflict limit ran out
    Unknown,
}

/// The contract of an external SAT solving engine
///
/// Callers must uphold two conventions that implementations may rely on:
/// every [`Lit`] and [`Var`] passed in references a variable index strictly
/// below [`Engine::n_vars`], and [`Engine::model`] is only read after a solve
/// call returned [`EngineResult::Sat`] and before the next mutating call.
/// The front-end layer enforces both.
pub trait Engine {
    /// The number of variables currently known to the engine
    fn n_vars(&self) -> u32;

    /// The number of clauses added to the engine
    fn n_clauses(&self) -> usize;

    /// Grows the variable space by `n` fresh variables
    fn new_vars(&mut self, n: u32);

    /// Grows the variable space by a single fresh variable
    fn new_var(&mut self) {
        self.new_vars(1);
    }

    /// Adds a clause over already-allocated variables
    fn add_clause(&mut self, lits: &[Lit]);

    /// Adds an XOR constraint `vars[0] ^ ... ^ vars[k-1] = rhs` over
    /// already-allocated variables
    fn add_xor_clause(&mut self, vars: &[Var], rhs: bool);

    /// Solves the current instance under the given temporary assumptions
    ///
    /// Blocks until the search concludes or a configured limit runs out.
    /// Assumptions hold for this call only.
    fn solve(&mut self, assumps: &[Lit]) -> EngineResult;

    /// The per-variable assignment found by the last satisfiable solve call
    fn model(&self) -> &[TernaryVal];

    /// Limits the wall-clock time of subsequent solve calls, in seconds
    fn set_max_time(&mut self, secs: f64);

    /// Limits the number of conflicts of subsequent solve calls
    fn set_max_conflicts(&mut self, limit: u64);

    /// Sets the verbosity of the engine; `0` is silent
    fn set_verbosity(&mut self, level: u32);

    /// Sets the number of worker threads the engine may use during a single
    /// solve call
    fn set_num_threads(&mut self, threads: u32);

    /// Begins a streaming session over short learnt clauses, filtered by
    /// maximum length and maximum glue (LBD) score
    fn start_small_clauses(&mut self, max_len: usize, max_glue: u32);

    /// Writes the next matching learnt clause into `out` and returns true, or
    /// returns false if no further clause is currently available
    ///
    /// Behavior outside an active streaming session is implementation
    /// defined.
    fn next_small_clause(&mut self, out: &mut Vec<Lit>) -> bool;

    /// Ends the streaming session started by
    /// [`Engine::start_small_clauses`]
    fn end_small_clauses(&mut self);
}
