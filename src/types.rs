//! # Basic Types
//!
//! Variables, literals and three-valued assignments, together with the codec
//! between signed integer (DIMACS-style) literals and the engine's
//! `(variable index, polarity)` representation.
//!
//! Variable indices are zero-based internally and one-based at the integer
//! boundary: the literal `3` references variable index `2`, the literal `-3`
//! its negation.

use std::{fmt, ops::Not};

use thiserror::Error;

/// The maximum magnitude accepted for an integer literal
///
/// Half of `i32::MAX` so that negating and doubling a literal internally can
/// never overflow.
pub const MAX_LIT_MAGNITUDE: u64 = (i32::MAX / 2) as u64;

/// Errors of the literal codec
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitError {
    /// The integer literal was zero
    #[error("non-zero integer expected")]
    Zero,
    /// The magnitude of the integer literal exceeds [`MAX_LIT_MAGNITUDE`]
    #[error("integer '{0}' is too small or too large")]
    OutOfRange(i64),
}

/// Type representing a Boolean variable, indexed from zero
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy)]
pub struct Var {
    idx: u32,
}

impl Var {
    /// Creates a variable from its zero-based index
    #[must_use]
    pub fn new(idx: u32) -> Var {
        Var { idx }
    }

    /// The zero-based index of the variable
    #[must_use]
    pub fn idx(self) -> usize {
        self.idx as usize
    }

    /// The positive literal over this variable
    #[must_use]
    pub fn pos_lit(self) -> Lit {
        Lit {
            v: self,
            negated: false,
        }
    }

    /// The negative literal over this variable
    #[must_use]
    pub fn neg_lit(self) -> Lit {
        Lit {
            v: self,
            negated: true,
        }
    }

    /// The literal over this variable with the given polarity
    #[must_use]
    pub fn lit(self, negated: bool) -> Lit {
        Lit { v: self, negated }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.idx)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.idx)
    }
}

/// Type representing a literal, a possibly negated reference to a variable
#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy)]
pub struct Lit {
    v: Var,
    negated: bool,
}

impl Lit {
    /// Creates a literal from a zero-based variable index and a polarity
    #[must_use]
    pub fn new(idx: u32, negated: bool) -> Lit {
        Lit {
            v: Var::new(idx),
            negated,
        }
    }

    /// The variable the literal references
    #[must_use]
    pub fn var(self) -> Var {
        self.v
    }

    /// True iff the literal is positive
    #[must_use]
    pub fn is_pos(self) -> bool {
        !self.negated
    }

    /// True iff the literal is negated
    #[must_use]
    pub fn is_neg(self) -> bool {
        self.negated
    }

    /// Decodes a signed non-zero integer literal
    ///
    /// The variable index is `|val| - 1`, the polarity the sign of `val`.
    ///
    /// # Errors
    ///
    /// - [`LitError::Zero`] if `val` is zero
    /// - [`LitError::OutOfRange`] if `|val|` exceeds [`MAX_LIT_MAGNITUDE`]
    pub fn from_dimacs(val: i64) -> Result<Lit, LitError> {
        if val == 0 {
            return Err(LitError::Zero);
        }
        if val.unsigned_abs() > MAX_LIT_MAGNITUDE {
            return Err(LitError::OutOfRange(val));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Lit::new((val.unsigned_abs() - 1) as u32, val < 0))
    }

    /// Re-encodes the literal as a signed integer, the exact inverse of
    /// [`Lit::from_dimacs`]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn to_dimacs(self) -> i32 {
        // the codec bounds variable indices below i32::MAX / 2
        let val = (self.v.idx + 1) as i32;
        if self.negated {
            -val
        } else {
            val
        }
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit {
            v: self.v,
            negated: !self.negated,
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~{}", self.v)
        } else {
            write!(f, "{}", self.v)
        }
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Ternary value assigned to a variable: true, false, or unassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TernaryVal {
    /// The variable is assigned true
    True,
    /// The variable is assigned false
    False,
    /// The variable is unassigned
    #[default]
    DontCare,
}

impl TernaryVal {
    /// True iff the value is a definite truth value
    #[must_use]
    pub fn is_assigned(self) -> bool {
        self != TernaryVal::DontCare
    }

    /// Negates a definite value, leaves [`TernaryVal::DontCare`] untouched
    #[must_use]
    pub fn negate(self) -> TernaryVal {
        match self {
            TernaryVal::True => TernaryVal::False,
            TernaryVal::False => TernaryVal::True,
            TernaryVal::DontCare => TernaryVal::DontCare,
        }
    }
}

impl From<bool> for TernaryVal {
    fn from(b: bool) -> Self {
        if b {
            TernaryVal::True
        } else {
            TernaryVal::False
        }
    }
}

impl fmt::Display for TernaryVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TernaryVal::True => write!(f, "true"),
            TernaryVal::False => write!(f, "false"),
            TernaryVal::DontCare => write!(f, "undef"),
        }
    }
}
