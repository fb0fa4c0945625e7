//! Integrands
//!
//! The partitioner and reducer never look at the function being integrated; they
//! only need something that maps `f64 -> f64` and can be shared across threads.
//! Any `Fn(f64) -> f64 + Send + Sync` closure qualifies, and the compiled
//! [`BuiltinIntegrand`] set is what the binaries (and remote ranks) select by name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pure real-valued function of one real variable
pub trait Integrand: Send + Sync {
    /// Evaluate the function at `x`
    fn eval(&self, x: f64) -> f64;
}

impl<F> Integrand for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[inline]
    fn eval(&self, x: f64) -> f64 {
        self(x)
    }
}

/// Compiled integrands selectable from the command line or a config file
///
/// Every rank of a distributed run links the same set, so only the name travels
/// over the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinIntegrand {
    /// `x²`
    #[default]
    Square,
    /// `2x³`
    DoubleCube,
    /// `sin x`
    Sine,
}

impl BuiltinIntegrand {
    /// Antiderivative, used by tests to check against closed forms
    pub fn antiderivative(&self, x: f64) -> f64 {
        match self {
            Self::Square => x * x * x / 3.0,
            Self::DoubleCube => x * x * x * x / 2.0,
            Self::Sine => -x.cos(),
        }
    }

    /// Exact value of the integral over `[a, b]`
    pub fn exact(&self, a: f64, b: f64) -> f64 {
        self.antiderivative(b) - self.antiderivative(a)
    }
}

impl Integrand for BuiltinIntegrand {
    #[inline]
    fn eval(&self, x: f64) -> f64 {
        match self {
            Self::Square => x * x,
            Self::DoubleCube => 2.0 * x * x * x,
            Self::Sine => x.sin(),
        }
    }
}

impl fmt::Display for BuiltinIntegrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Square => write!(f, "x^2"),
            Self::DoubleCube => write!(f, "2x^3"),
            Self::Sine => write!(f, "sin(x)"),
        }
    }
}
