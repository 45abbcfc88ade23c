//! # A Self-Contained Reference Engine
//!
//! [`DpllEngine`] is a small backtracking (DPLL) engine with unit and XOR
//! parity propagation. It exists so the front-end layer is usable and
//! testable without an external backend; it is not a competitive solver.
//!
//! Search notes:
//!
//! - Only variables occurring in at least one constraint are branched on;
//!   everything else stays [`TernaryVal::DontCare`] in the model.
//! - On every conflict the negation of the current assumption and decision
//!   literals is recorded as a learnt clause. These clauses feed the
//!   small-clause stream; glue is approximated by clause length since this
//!   engine does not track implication levels.

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::types::{Lit, TernaryVal, Var};

use super::{Engine, EngineResult};

/// Learnt clauses longer than this are not worth streaming and are dropped.
const MAX_LEARNT_LEN: usize = 32;

#[derive(Debug, Clone)]
struct XorClause {
    vars: Vec<Var>,
    rhs: bool,
}

#[derive(Debug, Clone, Copy)]
struct StreamCursor {
    next: usize,
    max_len: usize,
    max_glue: u32,
}

/// A small DPLL engine implementing [`Engine`]
#[derive(Debug, Default)]
pub struct DpllEngine {
    n_vars: u32,
    clauses: Vec<Vec<Lit>>,
    xors: Vec<XorClause>,
    learnts: Vec<Vec<Lit>>,
    model: Vec<TernaryVal>,
    max_time: Option<Duration>,
    max_conflicts: Option<u64>,
    verbosity: u32,
    threads: u32,
    stream: Option<StreamCursor>,
}

impl DpllEngine {
    /// Creates an engine with `n_vars` variables pre-allocated
    #[must_use]
    pub fn with_vars(n_vars: u32) -> Self {
        DpllEngine {
            n_vars,
            ..Default::default()
        }
    }

    /// The number of learnt clauses currently retained
    #[must_use]
    pub fn n_learnts(&self) -> usize {
        self.learnts.len()
    }
}

enum Outcome {
    Sat(Vec<TernaryVal>),
    Unsat,
    Abort,
}

struct Search<'e> {
    clauses: &'e [Vec<Lit>],
    xors: &'e [XorClause],
    branch_vars: Vec<Var>,
    decisions: Vec<Lit>,
    /// Negated assumptions, prefixed to every learnt clause
    prefix: Vec<Lit>,
    learnt: Vec<Vec<Lit>>,
    conflicts: u64,
    max_conflicts: Option<u64>,
    deadline: Option<Instant>,
}

fn lit_value(assign: &[TernaryVal], lit: Lit) -> TernaryVal {
    let val = assign[lit.var().idx()];
    if lit.is_neg() {
        val.negate()
    } else {
        val
    }
}

impl Search<'_> {
    /// Unit and XOR parity propagation to fixpoint; false on conflict
    fn propagate(&self, assign: &mut [TernaryVal]) -> bool {
        loop {
            let mut changed = false;
            for clause in self.clauses {
                let mut satisfied = false;
                let mut unassigned = 0;
                let mut last = None;
                for &lit in clause {
                    match lit_value(assign, lit) {
                        TernaryVal::True => {
                            satisfied = true;
                            break;
                        }
                        TernaryVal::False => {}
                        TernaryVal::DontCare => {
                            unassigned += 1;
                            last = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match unassigned {
                    0 => return false,
                    1 => {
                        let lit = last.expect("counted an unassigned literal");
                        assign[lit.var().idx()] = TernaryVal::from(lit.is_pos());
                        changed = true;
                    }
                    _ => {}
                }
            }
            for xor in self.xors {
                let mut acc = false;
                let mut unassigned = 0;
                let mut last = None;
                for &var in &xor.vars {
                    match assign[var.idx()] {
                        TernaryVal::True => acc = !acc,
                        TernaryVal::False => {}
                        TernaryVal::DontCare => {
                            unassigned += 1;
                            last = Some(var);
                        }
                    }
                }
                match unassigned {
                    0 => {
                        if acc != xor.rhs {
                            return false;
                        }
                    }
                    1 => {
                        let var = last.expect("counted an unassigned variable");
                        assign[var.idx()] = TernaryVal::from(acc != xor.rhs);
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                return true;
            }
        }
    }

    fn record_conflict(&mut self) {
        self.conflicts += 1;
        let len = self.prefix.len() + self.decisions.len();
        if len == 0 || len > MAX_LEARNT_LEN {
            return;
        }
        let clause: Vec<Lit> = self
            .prefix
            .iter()
            .copied()
            .chain(self.decisions.iter().map(|&l| !l))
            .collect();
        trace!("learnt clause {clause:?}");
        self.learnt.push(clause);
    }

    fn out_of_budget(&self) -> bool {
        if let Some(max) = self.max_conflicts {
            if self.conflicts > max {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return true;
            }
        }
        false
    }

    fn pick_branch(&self, assign: &[TernaryVal]) -> Option<Var> {
        self.branch_vars
            .iter()
            .copied()
            .find(|v| assign[v.idx()] == TernaryVal::DontCare)
    }

    fn run(&mut self, mut assign: Vec<TernaryVal>) -> Outcome {
        if !self.propagate(&mut assign) {
            self.record_conflict();
            if self.out_of_budget() {
                return Outcome::Abort;
            }
            return Outcome::Unsat;
        }
        if self.out_of_budget() {
            return Outcome::Abort;
        }
        let Some(var) = self.pick_branch(&assign) else {
            return Outcome::Sat(assign);
        };
        for negated in [false, true] {
            let mut child = assign.clone();
            child[var.idx()] = TernaryVal::from(!negated);
            self.decisions.push(var.lit(negated));
            let res = self.run(child);
            self.decisions.pop();
            match res {
                Outcome::Unsat => {}
                done => return done,
            }
        }
        Outcome::Unsat
    }
}

impl Engine for DpllEngine {
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
        self.xors.push(XorClause {
            vars: vars.to_vec(),
            rhs,
        });
    }

    fn solve(&mut self, assumps: &[Lit]) -> EngineResult {
        if self.verbosity > 0 {
            debug!(
                "solving {} clauses / {} xors over {} vars ({} threads requested)",
                self.clauses.len(),
                self.xors.len(),
                self.n_vars,
                self.threads
            );
        }
        let mut assign = vec![TernaryVal::DontCare; self.n_vars as usize];
        for &a in assumps {
            let val = TernaryVal::from(a.is_pos());
            let slot = &mut assign[a.var().idx()];
            if *slot == val.negate() {
                // contradictory assumptions
                return EngineResult::Unsat;
            }
            *slot = val;
        }
        let mut branch_vars: Vec<Var> = self
            .clauses
            .iter()
            .flatten()
            .map(|l| l.var())
            .chain(self.xors.iter().flat_map(|x| x.vars.iter().copied()))
            .collect();
        branch_vars.sort_unstable();
        branch_vars.dedup();
        let mut search = Search {
            clauses: &self.clauses,
            xors: &self.xors,
            branch_vars,
            decisions: Vec::new(),
            prefix: assumps.iter().map(|&l| !l).collect(),
            learnt: Vec::new(),
            conflicts: 0,
            max_conflicts: self.max_conflicts,
            deadline: self.max_time.map(|t| Instant::now() + t),
        };
        let outcome = search.run(assign);
        let conflicts = search.conflicts;
        self.learnts.append(&mut search.learnt);
        match outcome {
            Outcome::Sat(model) => {
                debug!("sat after {conflicts} conflicts");
                self.model = model;
                EngineResult::Sat
            }
            Outcome::Unsat => {
                debug!("unsat after {conflicts} conflicts");
                EngineResult::Unsat
            }
            Outcome::Abort => {
                debug!("aborted after {conflicts} conflicts");
                EngineResult::Unknown
            }
        }
    }

    fn model(&self) -> &[TernaryVal] {
        &self.model
    }

    fn set_max_time(&mut self, secs: f64) {
        self.max_time = if secs > 0.0 {
            Some(Duration::from_secs_f64(secs))
        } else {
            None
        };
    }

    fn set_max_conflicts(&mut self, limit: u64) {
        self.max_conflicts = Some(limit);
    }

    fn set_verbosity(&mut self, level: u32) {
        self.verbosity = level;
    }

    fn set_num_threads(&mut self, threads: u32) {
        // single-threaded engine, recorded for logging only
        self.threads = threads;
    }

    fn start_small_clauses(&mut self, max_len: usize, max_glue: u32) {
        self.stream = Some(StreamCursor {
            next: 0,
            max_len,
            max_glue,
        });
    }

    fn next_small_clause(&mut self, out: &mut Vec<Lit>) -> bool {
        let Some(cursor) = &mut self.stream else {
            return false;
        };
        while cursor.next < self.learnts.len() {
            let clause = &self.learnts[cursor.next];
            cursor.next += 1;
            let glue = u32::try_from(clause.len()).expect("learnt clause length bounded");
            if clause.len() <= cursor.max_len && glue <= cursor.max_glue {
                out.clear();
                out.extend_from_slice(clause);
                return true;
            }
        }
        false
    }

    fn end_small_clauses(&mut self) {
        self.stream = None;
    }
}
