//! # satfront - An Incremental SAT Solving Front-End
//!
//! `satfront` is a marshalling layer for driving an external SAT solving
//! engine incrementally: it translates between human-facing signed integer
//! literals and the engine's `(variable, polarity)` representation, grows the
//! engine's variable space on demand, ingests clauses and XOR clauses (both
//! as literal sequences and as flat zero-terminated buffers), orchestrates
//! assumption-based solve calls, renders solutions in dense and raw form,
//! enumerates multiple distinct solutions via blocking clauses, and streams
//! short learnt clauses out of the engine.
//!
//! The search algorithm itself is an opaque collaborator behind the
//! [`engine::Engine`] trait. The crate ships [`engine::DpllEngine`], a small
//! self-contained backtracking engine, so everything works out of the box;
//! any backend implementing the trait can be dropped in instead.
//!
//! ## Example
//!
//! ```
//! use satfront::{engine::DpllEngine, solver::{SolveOutcome, Solver}, types::TernaryVal};
//!
//! let mut solver = Solver::new(DpllEngine::default());
//! solver.add_clause(&[1]).unwrap();
//! solver.add_clause(&[-2]).unwrap();
//! solver.add_clause(&[-1, 2, 3]).unwrap();
//! match solver.solve().unwrap() {
//!     SolveOutcome::Sat(sol) => {
//!         assert_eq!(sol[1], TernaryVal::True);
//!         assert_eq!(sol[2], TernaryVal::False);
//!         assert_eq!(sol[3], TernaryVal::True);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

#![warn(clippy::pedantic)]
#![warn(missing_docs)]

pub mod engine;
pub mod solver;
pub mod types;

/// Creates a variable from a zero-based index
///
/// ```
/// let var = satfront::var![5];
/// assert_eq!(var.idx(), 5);
/// ```
#[macro_export]
macro_rules! var {
    ($idx:expr) => {
        $crate::types::Var::new($idx)
    };
}

/// Creates a positive literal over the variable with the given zero-based
/// index
///
/// ```
/// let lit = satfront::lit![42];
/// assert!(lit.is_pos());
/// ```
#[macro_export]
macro_rules! lit {
    ($idx:expr) => {
        $crate::types::Lit::new($idx, false)
    };
}
