//! # Solver Front-End
//!
//! [`Solver`] wraps an [`Engine`] and implements the marshalling core:
//! decoding signed integer literals, growing the engine's variable space on
//! demand, clause and XOR clause ingestion (including the flat zero
//! terminated buffer form), assumption-based solving, solution extraction in
//! dense and raw form, multi-solution enumeration via blocking clauses, and
//! the learnt-clause stream.
//!
//! All fallible operations return [`anyhow::Result`]; the concrete error can
//! be recovered via [`anyhow::Error::downcast`]. Recoverable input errors are
//! [`MarshalError`]; [`EnumerationAborted`] is fatal. Every rejected call
//! leaves the solver in a well-defined, still-usable state: previously
//! committed clauses and variables stay committed and further calls are fine.

use std::{cmp, ops::Index, time::Duration};

use cpu_time::ProcessTime;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    engine::{Engine, EngineResult},
    types::{Lit, LitError, TernaryVal},
};

/// Default glue (LBD) filter for the learnt-clause stream
pub const DEFAULT_MAX_GLUE: u32 = 1000;

/// Errors raised when rejecting input at a call boundary
///
/// All of these abort only the offending call; the solver stays usable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalError {
    /// A literal failed to decode
    #[error(transparent)]
    Lit(#[from] LitError),
    /// An XOR clause contained a negated literal
    #[error("XOR clause must contain only positive variables (not inverted literals)")]
    NegatedXorLiteral,
    /// An assumption referenced a variable (one-based) the solver does not
    /// know
    #[error("variable '{0}' not used in clauses")]
    UnknownVariable(i64),
    /// A non-empty flat clause buffer did not end in the zero sentinel
    #[error("last clause not terminated by zero")]
    NotZeroTerminated,
    /// The declared element width of a flat clause buffer is unsupported
    #[error("invalid clause array: invalid itemsize '{0}'")]
    InvalidItemSize(usize),
    /// The byte length of a flat clause buffer is not a multiple of the
    /// declared element width
    #[error("invalid clause array: buffer length not a multiple of itemsize '{0}'")]
    MisalignedBuffer(usize),
    /// The configured time limit is negative or not finite
    #[error("time_limit must be at least 0")]
    InvalidTimeLimit,
    /// The configured thread count is zero
    #[error("number of threads must be at least 1")]
    InvalidThreadCount,
}

/// Fatal error: the engine gave up mid-enumeration
///
/// Unlike [`MarshalError`] this signals that a solve call inside
/// [`Solver::msolve_selected`] returned an unknown outcome, so the
/// enumeration result would be meaningless. It must not be converted into an
/// empty solution list.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("engine aborted without a conclusion during solution enumeration")]
pub struct EnumerationAborted;

/// Construction-time solver configuration, forwarded to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Engine verbosity; `0` (the default) is silent
    pub verbose: u32,
    /// Abort the search after this many seconds; `0.0` (the default)
    /// disables the limit
    pub time_limit: f64,
    /// Abort the search after this many conflicts; `0` (the default)
    /// disables the limit
    pub confl_limit: u64,
    /// Number of worker threads the engine may use; defaults to `1`
    pub threads: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            verbose: 0,
            time_limit: 0.0,
            confl_limit: 0,
            threads: 1,
        }
    }
}

/// A positionally-indexed solution: slot `0` is an unassigned sentinel, slot
/// `i` (`i >= 1`) holds the value of variable `i`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseSolution {
    slots: Vec<TernaryVal>,
}

impl DenseSolution {
    /// The number of variables covered by the solution
    #[must_use]
    pub fn n_vars(&self) -> usize {
        self.slots.len() - 1
    }

    /// The underlying slots, including the sentinel at position `0`
    #[must_use]
    pub fn as_slice(&self) -> &[TernaryVal] {
        &self.slots
    }
}

impl Index<usize> for DenseSolution {
    type Output = TernaryVal;

    fn index(&self, var: usize) -> &TernaryVal {
        &self.slots[var]
    }
}

/// A compact solution: one signed literal per variable that received a
/// definite truth value, `i` for true, `-i` for false; unassigned variables
/// are absent
pub type RawSolution = Vec<i32>;

/// A solution in the format requested from [`Solver::msolve_selected`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    /// Positionally-indexed form
    Dense(DenseSolution),
    /// Compact signed-literal form
    Raw(RawSolution),
}

/// Which form [`Solver::msolve_selected`] renders solutions in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolutionFormat {
    /// Positionally-indexed tuples, indexable by variable number
    Dense,
    /// Signed-literal lists, skipping unassigned variables
    #[default]
    Raw,
}

/// Outcome of a single solve call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Satisfiable; carries the solution snapshot
    Sat(DenseSolution),
    /// Unsatisfiable under the given assumptions
    Unsat,
    /// The engine gave up before reaching a conclusion
    Unknown,
}

/// Statistics tracked by the front-end across the lifetime of a solver
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverStats {
    /// Number of satisfiable solve calls
    pub n_sat: usize,
    /// Number of unsatisfiable solve calls
    pub n_unsat: usize,
    /// Number of solve calls that ran into a limit
    pub n_terminated: usize,
    /// Number of clauses committed through this front-end
    pub n_clauses: usize,
    /// Average length of committed clauses
    pub avg_clause_len: f32,
    /// Accumulated CPU time spent in solve calls
    pub cpu_solve_time: Duration,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// Machine integer types accepted as elements of a flat clause buffer
///
/// Implemented for `i16`, `i32` and `i64`; the trait is sealed.
pub trait FlatLit: sealed::Sealed + Copy {
    /// Widens the element to `i64` for decoding
    fn widen(self) -> i64;
}

impl FlatLit for i16 {
    fn widen(self) -> i64 {
        i64::from(self)
    }
}

impl FlatLit for i32 {
    fn widen(self) -> i64 {
        i64::from(self)
    }
}

impl FlatLit for i64 {
    fn widen(self) -> i64 {
        self
    }
}

/// Incremental SAT solver front-end over an [`Engine`]
///
/// The solver owns the engine exclusively; a single caller thread drives it
/// through `&mut self` calls. Solve calls block for their full duration.
#[derive(Debug)]
pub struct Solver<E> {
    engine: E,
    /// Scratch buffer for staging a clause's literals before submission
    buf_lits: Vec<Lit>,
    stats: SolverStats,
}

impl<E: Engine> Solver<E> {
    /// Creates a solver over the given engine with the default
    /// [`SolverConfig`]
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, SolverConfig::default())
            .expect("default configuration is valid")
    }

    /// Creates a solver over the given engine, forwarding the configuration
    ///
    /// Limits left at their defaults are not forwarded, so the engine's own
    /// defaults stay in effect.
    ///
    /// # Errors
    ///
    /// [`MarshalError::InvalidTimeLimit`] if the time limit is negative or
    /// not finite, [`MarshalError::InvalidThreadCount`] if the thread count
    /// is zero.
    pub fn with_config(mut engine: E, config: SolverConfig) -> anyhow::Result<Self> {
        if config.time_limit < 0.0 || !config.time_limit.is_finite() {
            return Err(MarshalError::InvalidTimeLimit.into());
        }
        if config.threads == 0 {
            return Err(MarshalError::InvalidThreadCount.into());
        }
        if config.time_limit > 0.0 {
            engine.set_max_time(config.time_limit);
        }
        if config.confl_limit > 0 {
            engine.set_max_conflicts(config.confl_limit);
        }
        if config.verbose > 0 {
            engine.set_verbosity(config.verbose);
        }
        engine.set_num_threads(config.threads);
        Ok(Solver {
            engine,
            buf_lits: Vec::new(),
            stats: SolverStats::default(),
        })
    }

    /// Gets a reference to the wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Gets a mutable reference to the wrapped engine
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The number of variables currently known to the engine
    pub fn nb_vars(&self) -> u32 {
        self.engine.n_vars()
    }

    /// The number of clauses in the engine
    pub fn nb_clauses(&self) -> usize {
        self.engine.n_clauses()
    }

    /// The front-end solve and clause statistics
    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Grows the variable space so that `max_idx` is a valid zero-based
    /// index; grows by exactly the deficit, never shrinks
    fn reserve_vars(&mut self, max_idx: usize) {
        let n_vars = self.engine.n_vars() as usize;
        if max_idx >= n_vars {
            let n_new = max_idx - n_vars + 1;
            trace!("growing variable space by {n_new} to {}", max_idx + 1);
            self.engine
                .new_vars(u32::try_from(n_new).expect("codec bounds variable indices"));
        }
    }

    /// Decodes a clause into the scratch buffer and grows the variable space
    /// to the maximum referenced variable (only if the clause is non-empty)
    fn parse_clause(&mut self, clause: &[i64]) -> Result<(), MarshalError> {
        self.buf_lits.clear();
        self.buf_lits.reserve(clause.len());
        let mut max_idx = 0;
        for &val in clause {
            let lit = Lit::from_dimacs(val)?;
            max_idx = cmp::max(max_idx, lit.var().idx());
            self.buf_lits.push(lit);
        }
        if !self.buf_lits.is_empty() {
            self.reserve_vars(max_idx);
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn note_committed_clause(&mut self, len: usize) {
        self.stats.n_clauses += 1;
        self.stats.avg_clause_len = (self.stats.avg_clause_len
            * ((self.stats.n_clauses - 1) as f32)
            + len as f32)
            / self.stats.n_clauses as f32;
    }

    /// Commits the scratch buffer as a clause
    fn commit_clause(&mut self) {
        self.note_committed_clause(self.buf_lits.len());
        self.engine.add_clause(&self.buf_lits);
    }

    /// Adds a clause given as signed integer literals
    ///
    /// Referenced variables are allocated on demand. An empty slice commits
    /// an empty clause, making the instance unsatisfiable.
    ///
    /// # Errors
    ///
    /// [`MarshalError::Lit`] if a literal fails to decode; nothing is
    /// committed in that case.
    pub fn add_clause(&mut self, clause: &[i64]) -> anyhow::Result<()> {
        self.parse_clause(clause)?;
        self.commit_clause();
        Ok(())
    }

    /// Adds a sequence of clauses
    ///
    /// Clauses are ingested independently, in order; an error on clause `k`
    /// stops processing but leaves clauses `0..k` committed (no rollback).
    /// `max_var` optionally pre-grows the variable space to the given
    /// variable count before ingestion starts; this is an optimization only
    /// and does not change the final state.
    ///
    /// # Errors
    ///
    /// [`MarshalError::Lit`] if a literal of any clause fails to decode.
    pub fn add_clauses<I>(&mut self, clauses: I, max_var: Option<u32>) -> anyhow::Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<[i64]>,
    {
        if let Some(max_var) = max_var {
            let n_vars = self.engine.n_vars();
            if max_var > n_vars {
                self.engine.new_vars(max_var - n_vars);
            }
        }
        for clause in clauses {
            self.parse_clause(clause.as_ref())?;
            self.commit_clause();
        }
        Ok(())
    }

    /// Adds clauses from a flat buffer of zero-separated, zero-terminated
    /// integer literals
    ///
    /// Each run of non-zero elements between sentinels becomes one clause.
    /// A zero-length run (adjacent sentinels, or a buffer starting with `0`)
    /// is skipped; it does *not* commit an empty clause, unlike
    /// [`Solver::add_clause`] with an empty slice. An empty buffer is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// - [`MarshalError::NotZeroTerminated`] if a non-empty buffer does not
    ///   end in `0`; nothing is committed in that case
    /// - [`MarshalError::Lit`] if an element is out of range; clauses before
    ///   the offending one stay committed
    pub fn add_clauses_from_array<T: FlatLit>(&mut self, array: &[T]) -> anyhow::Result<()> {
        if array.is_empty() {
            return Ok(());
        }
        if array[array.len() - 1].widen() != 0 {
            return Err(MarshalError::NotZeroTerminated.into());
        }
        for run in array.split(|v| v.widen() == 0) {
            if run.is_empty() {
                continue;
            }
            self.buf_lits.clear();
            self.buf_lits.reserve(run.len());
            let mut max_idx = 0;
            for &val in run {
                let lit = Lit::from_dimacs(val.widen()).map_err(MarshalError::from)?;
                max_idx = cmp::max(max_idx, lit.var().idx());
                self.buf_lits.push(lit);
            }
            self.reserve_vars(max_idx);
            self.commit_clause();
        }
        Ok(())
    }

    /// Adds clauses from a flat zero-terminated buffer given as raw bytes
    /// with a caller-declared element width
    ///
    /// Supported widths are `2`, `4` and `8` bytes (`i16`/`i32`/`i64`,
    /// native byte order); the buffer semantics are those of
    /// [`Solver::add_clauses_from_array`].
    ///
    /// # Errors
    ///
    /// - [`MarshalError::InvalidItemSize`] for any other width
    /// - [`MarshalError::MisalignedBuffer`] if the byte length is not a
    ///   multiple of the width
    /// - everything [`Solver::add_clauses_from_array`] can raise
    pub fn add_clauses_from_raw(&mut self, bytes: &[u8], itemsize: usize) -> anyhow::Result<()> {
        fn gather<const N: usize, T>(bytes: &[u8], decode: impl Fn([u8; N]) -> T) -> Option<Vec<T>> {
            let chunks = bytes.chunks_exact(N);
            if !chunks.remainder().is_empty() {
                return None;
            }
            Some(
                chunks
                    .map(|c| decode(c.try_into().expect("chunks_exact yields exact chunks")))
                    .collect(),
            )
        }

        match itemsize {
            2 => {
                let vals = gather(bytes, i16::from_ne_bytes)
                    .ok_or(MarshalError::MisalignedBuffer(itemsize))?;
                self.add_clauses_from_array(&vals)
            }
            4 => {
                let vals = gather(bytes, i32::from_ne_bytes)
                    .ok_or(MarshalError::MisalignedBuffer(itemsize))?;
                self.add_clauses_from_array(&vals)
            }
            8 => {
                let vals = gather(bytes, i64::from_ne_bytes)
                    .ok_or(MarshalError::MisalignedBuffer(itemsize))?;
                self.add_clauses_from_array(&vals)
            }
            _ => Err(MarshalError::InvalidItemSize(itemsize).into()),
        }
    }

    /// Adds an XOR constraint `vars[0] ^ ... ^ vars[k-1] = rhs`
    ///
    /// Elements are decoded like clause literals but must all be positive:
    /// XOR ingestion takes bare variable references, not inverted literals.
    /// Referenced variables are allocated on demand, one at a time.
    ///
    /// # Errors
    ///
    /// [`MarshalError::Lit`] on a decode failure,
    /// [`MarshalError::NegatedXorLiteral`] on a negative element.
    pub fn add_xor_clause(&mut self, vars: &[i64], rhs: bool) -> anyhow::Result<()> {
        let mut xor_vars = Vec::with_capacity(vars.len());
        for &val in vars {
            let lit = Lit::from_dimacs(val).map_err(MarshalError::from)?;
            if lit.is_neg() {
                return Err(MarshalError::NegatedXorLiteral.into());
            }
            let var = lit.var();
            while var.idx() >= self.engine.n_vars() as usize {
                self.engine.new_var();
            }
            xor_vars.push(var);
        }
        self.engine.add_xor_clause(&xor_vars, rhs);
        Ok(())
    }

    /// Decodes assumptions; assumptions never grow the variable space
    #[allow(clippy::cast_possible_wrap)]
    fn parse_assumptions(&self, assumps: &[i64]) -> Result<Vec<Lit>, MarshalError> {
        let n_vars = self.engine.n_vars() as usize;
        let mut lits = Vec::with_capacity(assumps.len());
        for &val in assumps {
            let lit = Lit::from_dimacs(val)?;
            if lit.var().idx() >= n_vars {
                return Err(MarshalError::UnknownVariable(lit.var().idx() as i64 + 1));
            }
            lits.push(lit);
        }
        Ok(lits)
    }

    /// Snapshots the engine's model in dense form; only called after a
    /// satisfiable solve
    fn dense_solution(&self) -> DenseSolution {
        let model = self.engine.model();
        let n_vars = self.engine.n_vars() as usize;
        let mut slots = Vec::with_capacity(n_vars + 1);
        slots.push(TernaryVal::DontCare);
        for idx in 0..n_vars {
            slots.push(model.get(idx).copied().unwrap_or_default());
        }
        DenseSolution { slots }
    }

    /// Snapshots the engine's model in raw signed-literal form
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn raw_solution(&self) -> RawSolution {
        self.engine
            .model()
            .iter()
            .enumerate()
            .filter_map(|(idx, val)| match val {
                TernaryVal::True => Some(idx as i32 + 1),
                TernaryVal::False => Some(-(idx as i32 + 1)),
                TernaryVal::DontCare => None,
            })
            .collect()
    }

    fn solve_engine(&mut self, assumps: &[Lit]) -> EngineResult {
        let start = ProcessTime::now();
        let res = self.engine.solve(assumps);
        self.stats.cpu_solve_time += start.elapsed();
        match res {
            EngineResult::Sat => self.stats.n_sat += 1,
            EngineResult::Unsat => self.stats.n_unsat += 1,
            EngineResult::Unknown => self.stats.n_terminated += 1,
        }
        res
    }

    /// Solves the instance with no assumptions
    ///
    /// # Errors
    ///
    /// None currently; kept fallible for parity with
    /// [`Solver::solve_assumps`].
    pub fn solve(&mut self) -> anyhow::Result<SolveOutcome> {
        self.solve_assumps(&[])
    }

    /// Solves the instance under temporary assumptions
    ///
    /// Assumptions pin literals for this call only; a later call without
    /// them sees the unmodified instance. Unlike clause ingestion this path
    /// never grows the variable space.
    ///
    /// # Errors
    ///
    /// [`MarshalError::Lit`] on a decode failure,
    /// [`MarshalError::UnknownVariable`] if an assumption references a
    /// variable the solver has never seen.
    pub fn solve_assumps(&mut self, assumps: &[i64]) -> anyhow::Result<SolveOutcome> {
        let assumption_lits = self.parse_assumptions(assumps)?;
        Ok(match self.solve_engine(&assumption_lits) {
            EngineResult::Sat => SolveOutcome::Sat(self.dense_solution()),
            EngineResult::Unsat => SolveOutcome::Unsat,
            EngineResult::Unknown => SolveOutcome::Unknown,
        })
    }

    /// Solves with no assumptions and reports only satisfiability
    ///
    /// [`TernaryVal::DontCare`] means the engine gave up before reaching a
    /// conclusion.
    pub fn is_satisfiable(&mut self) -> TernaryVal {
        match self.solve_engine(&[]) {
            EngineResult::Sat => TernaryVal::True,
            EngineResult::Unsat => TernaryVal::False,
            EngineResult::Unknown => TernaryVal::DontCare,
        }
    }

    /// Enumerates up to `max_solutions` solutions that differ on the
    /// selected variables
    ///
    /// `selected` names the variables over which solutions must be distinct,
    /// as signed integer literals. Entries given negative are decoded (and
    /// may grow the variable space) but are excluded when blocking clauses
    /// are built; only positively-given variables constrain distinctness.
    ///
    /// After each satisfiable solve the found assignment, restricted to the
    /// selected variables with a definite value, is forbidden by a blocking
    /// clause, so no later solution repeats it. Blocking clauses persist in
    /// the engine beyond this call.
    ///
    /// Enumeration stops early when the engine reports unsatisfiable; the
    /// solutions gathered so far are returned. `max_solutions == 0` returns
    /// an empty list without ever invoking the engine.
    ///
    /// # Errors
    ///
    /// - [`MarshalError::Lit`] if a selected literal fails to decode
    /// - [`EnumerationAborted`] (fatal) if the engine gives up mid-way
    pub fn msolve_selected(
        &mut self,
        max_solutions: usize,
        selected: &[i64],
        format: SolutionFormat,
    ) -> anyhow::Result<Vec<Solution>> {
        self.parse_clause(selected)?;
        let selected_lits = self.buf_lits.clone();
        let mut solutions = Vec::new();
        for round in 0..max_solutions {
            match self.solve_engine(&[]) {
                EngineResult::Sat => {
                    solutions.push(match format {
                        SolutionFormat::Dense => Solution::Dense(self.dense_solution()),
                        SolutionFormat::Raw => Solution::Raw(self.raw_solution()),
                    });
                    if round + 1 >= max_solutions {
                        break;
                    }
                    // forbid the projection of the current model
                    let blocking: Vec<Lit> = {
                        let model = self.engine.model();
                        selected_lits
                            .iter()
                            .filter(|l| l.is_pos())
                            .filter_map(|l| match model.get(l.var().idx()) {
                                Some(TernaryVal::True) => Some(l.var().neg_lit()),
                                Some(TernaryVal::False) => Some(l.var().pos_lit()),
                                _ => None,
                            })
                            .collect()
                    };
                    debug!(
                        "banning solution {} with clause over {} vars",
                        solutions.len(),
                        blocking.len()
                    );
                    self.note_committed_clause(blocking.len());
                    self.engine.add_clause(&blocking);
                }
                EngineResult::Unsat => break,
                EngineResult::Unknown => return Err(EnumerationAborted.into()),
            }
        }
        Ok(solutions)
    }

    /// Begins streaming learnt clauses of at most `max_len` literals and a
    /// glue (LBD) score of at most `max_glue` out of the engine
    ///
    /// Use [`DEFAULT_MAX_GLUE`] when no glue filtering is wanted. Starting a
    /// second session without an intervening
    /// [`Solver::end_getting_small_clauses`] is left to the engine's own
    /// contract, as is calling [`Solver::get_next_small_clause`] outside a
    /// session.
    pub fn start_getting_small_clauses(&mut self, max_len: usize, max_glue: u32) {
        self.engine.start_small_clauses(max_len, max_glue);
    }

    /// The next matching learnt clause as signed integer literals, or `None`
    /// when no further clause is currently available
    pub fn get_next_small_clause(&mut self) -> Option<Vec<i32>> {
        if self.engine.next_small_clause(&mut self.buf_lits) {
            Some(self.buf_lits.iter().map(|l| l.to_dimacs()).collect())
        } else {
            None
        }
    }

    /// Ends the learnt-clause streaming session
    pub fn end_getting_small_clauses(&mut self) {
        self.engine.end_small_clauses();
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use super::{
        EnumerationAborted, MarshalError, Solution, SolutionFormat, SolveOutcome, Solver,
        SolverConfig, DEFAULT_MAX_GLUE,
    };
    use crate::{
        engine::{Engine, EngineResult},
        lit,
        types::{Lit, LitError, TernaryVal, Var},
        var,
    };

    /// Scripted engine: replays pre-programmed solve results and models and
    /// records everything the front-end does to it
    #[derive(Debug, Default)]
    struct MockEngine {
        n_vars: u32,
        clauses: Vec<Vec<Lit>>,
        xors: Vec<(Vec<Var>, bool)>,
        results: VecDeque<EngineResult>,
        models: VecDeque<Vec<TernaryVal>>,
        model: Vec<TernaryVal>,
        n_solves: usize,
        learnts: Vec<Vec<Lit>>,
        stream_pos: Option<usize>,
        max_time: Option<f64>,
        max_conflicts: Option<u64>,
        verbosity: Option<u32>,
        threads: Option<u32>,
    }

    impl MockEngine {
        fn script(results: Vec<EngineResult>, models: Vec<Vec<TernaryVal>>) -> Self {
            MockEngine {
                results: results.into(),
                models: models.into(),
                ..Default::default()
            }
        }
    }

    impl Engine for MockEngine {
        fn n_vars(&self) -> u32 {
            self.n_vars
        }

        fn n_clauses(&self) -> usize {
            self.clauses.len()
        }

        fn new_vars(&mut self, n: u32) {
            self.n_vars += n;
        }

        fn add_clause(&mut self, lits: &[Lit]) {
            self.clauses.push(lits.to_vec());
        }

        fn add_xor_clause(&mut self, vars: &[Var], rhs: bool) {
            self.xors.push((vars.to_vec(), rhs));
        }

        fn solve(&mut self, _assumps: &[Lit]) -> EngineResult {
            self.n_solves += 1;
            let res = self.results.pop_front().unwrap_or(EngineResult::Unsat);
            if res == EngineResult::Sat {
                self.model = self.models.pop_front().unwrap_or_default();
            }
            res
        }

        fn model(&self) -> &[TernaryVal] {
            &self.model
        }

        fn set_max_time(&mut self, secs: f64) {
            self.max_time = Some(secs);
        }

        fn set_max_conflicts(&mut self, limit: u64) {
            self.max_conflicts = Some(limit);
        }

        fn set_verbosity(&mut self, level: u32) {
            self.verbosity = Some(level);
        }

        fn set_num_threads(&mut self, threads: u32) {
            self.threads = Some(threads);
        }

        fn start_small_clauses(&mut self, _max_len: usize, _max_glue: u32) {
            self.stream_pos = Some(0);
        }

        fn next_small_clause(&mut self, out: &mut Vec<Lit>) -> bool {
            let Some(pos) = &mut self.stream_pos else {
                return false;
            };
            if *pos < self.learnts.len() {
                out.clear();
                out.extend_from_slice(&self.learnts[*pos]);
                *pos += 1;
                true
            } else {
                false
            }
        }

        fn end_small_clauses(&mut self) {
            self.stream_pos = None;
        }
    }

    fn marshal_err(err: &anyhow::Error) -> MarshalError {
        *err.downcast_ref::<MarshalError>().expect("marshal error")
    }

    #[test]
    fn config_defaults_forwarded() {
        let solver = Solver::new(MockEngine::default());
        // disabled limits are not forwarded
        assert_eq!(solver.engine().max_time, None);
        assert_eq!(solver.engine().max_conflicts, None);
        assert_eq!(solver.engine().verbosity, None);
        assert_eq!(solver.engine().threads, Some(1));
    }

    #[test]
    fn config_limits_forwarded() {
        let config = SolverConfig {
            verbose: 2,
            time_limit: 5.0,
            confl_limit: 1000,
            threads: 4,
        };
        let solver = Solver::with_config(MockEngine::default(), config).unwrap();
        assert_eq!(solver.engine().max_time, Some(5.0));
        assert_eq!(solver.engine().max_conflicts, Some(1000));
        assert_eq!(solver.engine().verbosity, Some(2));
        assert_eq!(solver.engine().threads, Some(4));
    }

    #[test]
    fn config_rejects_invalid() {
        let config = SolverConfig {
            time_limit: -1.0,
            ..SolverConfig::default()
        };
        let err = Solver::with_config(MockEngine::default(), config).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::InvalidTimeLimit);

        let config = SolverConfig {
            time_limit: f64::NAN,
            ..SolverConfig::default()
        };
        let err = Solver::with_config(MockEngine::default(), config).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::InvalidTimeLimit);

        let config = SolverConfig {
            threads: 0,
            ..SolverConfig::default()
        };
        let err = Solver::with_config(MockEngine::default(), config).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::InvalidThreadCount);
    }

    #[test]
    fn clause_grows_variable_space() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clause(&[5]).unwrap();
        assert_eq!(solver.nb_vars(), 5);
        // referencing only known variables leaves the space unchanged
        solver.add_clause(&[1, -2]).unwrap();
        assert_eq!(solver.nb_vars(), 5);
        solver.add_clause(&[-6, 6]).unwrap();
        assert_eq!(solver.nb_vars(), 6);
        assert_eq!(solver.nb_clauses(), 3);
    }

    #[test]
    fn empty_clause_is_committed() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clause(&[]).unwrap();
        assert_eq!(solver.engine().clauses, vec![Vec::<Lit>::new()]);
        assert_eq!(solver.nb_vars(), 0);
    }

    #[test]
    fn clause_decode_failure_commits_nothing() {
        let mut solver = Solver::new(MockEngine::default());
        let err = solver.add_clause(&[1, 0, 2]).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::Lit(LitError::Zero));
        assert_eq!(solver.nb_clauses(), 0);
        assert_eq!(solver.nb_vars(), 0);
    }

    #[test]
    fn bulk_ingestion_is_per_clause_atomic() {
        let mut solver = Solver::new(MockEngine::default());
        let clauses: Vec<Vec<i64>> = vec![vec![1], vec![0], vec![2]];
        let err = solver.add_clauses(&clauses, None).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::Lit(LitError::Zero));
        // the clause before the failing one stays committed
        assert_eq!(solver.engine().clauses, vec![vec![lit![0]]]);
    }

    #[test]
    fn bulk_ingestion_pre_grows() {
        let mut solver = Solver::new(MockEngine::default());
        let clauses: Vec<Vec<i64>> = vec![vec![1, 2], vec![3]];
        solver.add_clauses(&clauses, Some(10)).unwrap();
        assert_eq!(solver.nb_vars(), 10);
        assert_eq!(solver.nb_clauses(), 2);
    }

    #[test]
    fn flat_array_ingestion() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clauses_from_array(&[1i32, -2, 0, 3, 0]).unwrap();
        assert_eq!(
            solver.engine().clauses,
            vec![vec![lit![0], !lit![1]], vec![lit![2]]]
        );
        assert_eq!(solver.nb_vars(), 3);
    }

    #[test]
    fn flat_array_not_terminated() {
        let mut solver = Solver::new(MockEngine::default());
        let err = solver.add_clauses_from_array(&[1i32, -2, 3]).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::NotZeroTerminated);
        assert_eq!(solver.nb_clauses(), 0);
        assert_eq!(solver.nb_vars(), 0);
    }

    #[test]
    fn flat_array_skips_empty_runs() {
        let mut solver = Solver::new(MockEngine::default());
        // leading and doubled sentinels never commit an empty clause
        solver.add_clauses_from_array(&[0i32, 0, 1, 0, 0, 2, 0]).unwrap();
        assert_eq!(
            solver.engine().clauses,
            vec![vec![lit![0]], vec![lit![1]]]
        );
    }

    #[test]
    fn flat_array_widths() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clauses_from_array(&[1i16, 0]).unwrap();
        solver.add_clauses_from_array(&[2i64, 0]).unwrap();
        assert_eq!(solver.engine().clauses, vec![vec![lit![0]], vec![lit![1]]]);
    }

    #[test]
    fn flat_array_empty_is_noop() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clauses_from_array::<i32>(&[]).unwrap();
        assert_eq!(solver.nb_clauses(), 0);
    }

    #[test]
    fn raw_buffer_ingestion() {
        let mut solver = Solver::new(MockEngine::default());
        let vals = [1i32, -2, 0, 3, 0];
        let mut bytes = Vec::new();
        for v in vals {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        solver.add_clauses_from_raw(&bytes, 4).unwrap();
        assert_eq!(
            solver.engine().clauses,
            vec![vec![lit![0], !lit![1]], vec![lit![2]]]
        );
    }

    #[test]
    fn raw_buffer_rejects_bad_widths() {
        let mut solver = Solver::new(MockEngine::default());
        let err = solver.add_clauses_from_raw(&[0; 12], 3).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::InvalidItemSize(3));
        let err = solver.add_clauses_from_raw(&[0; 7], 4).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::MisalignedBuffer(4));
        assert_eq!(solver.nb_clauses(), 0);
    }

    #[test]
    fn xor_ingestion() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_xor_clause(&[1, 2], true).unwrap();
        assert_eq!(solver.nb_vars(), 2);
        assert_eq!(solver.engine().xors, vec![(vec![var![0], var![1]], true)]);
    }

    #[test]
    fn xor_rejects_negated_literals() {
        let mut solver = Solver::new(MockEngine::default());
        let err = solver.add_xor_clause(&[1, -2], true).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::NegatedXorLiteral);
        assert!(solver.engine().xors.is_empty());
    }

    #[test]
    fn assumptions_must_reference_known_variables() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clause(&[1, 2]).unwrap();
        let err = solver.solve_assumps(&[-3]).unwrap_err();
        assert_eq!(marshal_err(&err), MarshalError::UnknownVariable(3));
        // assumptions never grow the space
        assert_eq!(solver.nb_vars(), 2);
        assert_eq!(solver.engine().n_solves, 0);
    }

    #[test]
    fn solve_outcome_mapping() {
        let engine = MockEngine::script(
            vec![
                EngineResult::Sat,
                EngineResult::Unsat,
                EngineResult::Unknown,
            ],
            vec![vec![TernaryVal::True, TernaryVal::False]],
        );
        let mut solver = Solver::new(engine);
        solver.add_clause(&[1, 2]).unwrap();

        match solver.solve().unwrap() {
            SolveOutcome::Sat(sol) => {
                assert_eq!(sol.n_vars(), 2);
                // slot 0 is the sentinel
                assert_eq!(sol[0], TernaryVal::DontCare);
                assert_eq!(sol[1], TernaryVal::True);
                assert_eq!(sol[2], TernaryVal::False);
            }
            other => panic!("expected sat, got {other:?}"),
        }
        assert_eq!(solver.solve().unwrap(), SolveOutcome::Unsat);
        assert_eq!(solver.solve().unwrap(), SolveOutcome::Unknown);

        let stats = solver.stats();
        assert_eq!(stats.n_sat, 1);
        assert_eq!(stats.n_unsat, 1);
        assert_eq!(stats.n_terminated, 1);
    }

    #[test]
    fn is_satisfiable_three_valued() {
        let engine = MockEngine::script(
            vec![EngineResult::Sat, EngineResult::Unknown],
            vec![vec![TernaryVal::True]],
        );
        let mut solver = Solver::new(engine);
        solver.add_clause(&[1]).unwrap();
        assert_eq!(solver.is_satisfiable(), TernaryVal::True);
        assert_eq!(solver.is_satisfiable(), TernaryVal::DontCare);
    }

    #[test]
    fn msolve_zero_cap_never_solves() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clause(&[1]).unwrap();
        let solutions = solver
            .msolve_selected(0, &[1], SolutionFormat::Raw)
            .unwrap();
        assert!(solutions.is_empty());
        assert_eq!(solver.engine().n_solves, 0);
    }

    #[test]
    fn msolve_blocks_previous_solutions() {
        let engine = MockEngine::script(
            vec![EngineResult::Sat, EngineResult::Sat, EngineResult::Unsat],
            vec![
                vec![TernaryVal::True, TernaryVal::True],
                vec![TernaryVal::False, TernaryVal::True],
            ],
        );
        let mut solver = Solver::new(engine);
        solver.add_clause(&[1, 2]).unwrap();

        // -2 is decoded but excluded from blocking clauses
        let solutions = solver
            .msolve_selected(5, &[1, -2], SolutionFormat::Raw)
            .unwrap();
        assert_eq!(
            solutions,
            vec![Solution::Raw(vec![1, 2]), Solution::Raw(vec![-1, 2])]
        );
        // original clause plus one blocking clause per non-final solution
        assert_eq!(
            solver.engine().clauses,
            vec![vec![lit![0], lit![1]], vec![!lit![0]], vec![lit![0]]]
        );
    }

    #[test]
    fn msolve_blocking_skips_unassigned() {
        let engine = MockEngine::script(
            vec![EngineResult::Sat, EngineResult::Unsat],
            vec![vec![TernaryVal::DontCare, TernaryVal::True]],
        );
        let mut solver = Solver::new(engine);
        solver.add_clause(&[1, 2]).unwrap();
        let solutions = solver
            .msolve_selected(5, &[1, 2], SolutionFormat::Raw)
            .unwrap();
        assert_eq!(solutions, vec![Solution::Raw(vec![2])]);
        assert_eq!(solver.engine().clauses[1], vec![!lit![1]]);
    }

    #[test]
    fn msolve_no_blocking_clause_after_final_round() {
        let engine = MockEngine::script(
            vec![EngineResult::Sat],
            vec![vec![TernaryVal::True]],
        );
        let mut solver = Solver::new(engine);
        solver.add_clause(&[1]).unwrap();
        let solutions = solver
            .msolve_selected(1, &[1], SolutionFormat::Dense)
            .unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solver.nb_clauses(), 1);
    }

    #[test]
    fn msolve_aborts_on_unknown() {
        let engine = MockEngine::script(vec![EngineResult::Unknown], vec![]);
        let mut solver = Solver::new(engine);
        solver.add_clause(&[1]).unwrap();
        let err = solver
            .msolve_selected(5, &[1], SolutionFormat::Raw)
            .unwrap_err();
        assert!(err.downcast_ref::<EnumerationAborted>().is_some());
    }

    #[test]
    fn msolve_selection_grows_variable_space() {
        let engine = MockEngine::script(vec![EngineResult::Unsat], vec![]);
        let mut solver = Solver::new(engine);
        let solutions = solver
            .msolve_selected(3, &[5], SolutionFormat::Raw)
            .unwrap();
        assert!(solutions.is_empty());
        assert_eq!(solver.nb_vars(), 5);
    }

    #[test]
    fn small_clause_stream_reencodes() {
        let mut engine = MockEngine::default();
        engine.learnts = vec![vec![lit![0], !lit![1]], vec![lit![2]]];
        let mut solver = Solver::new(engine);
        solver.start_getting_small_clauses(10, DEFAULT_MAX_GLUE);
        assert_eq!(solver.get_next_small_clause(), Some(vec![1, -2]));
        assert_eq!(solver.get_next_small_clause(), Some(vec![3]));
        assert_eq!(solver.get_next_small_clause(), None);
        solver.end_getting_small_clauses();
        assert_eq!(solver.get_next_small_clause(), None);
    }

    #[test]
    fn stats_track_clauses() {
        let mut solver = Solver::new(MockEngine::default());
        solver.add_clause(&[1, 2]).unwrap();
        solver.add_clause(&[3, 4, 5, 6]).unwrap();
        let stats = solver.stats();
        assert_eq!(stats.n_clauses, 2);
        assert!((stats.avg_clause_len - 3.0).abs() < f32::EPSILON);
    }
}
