//! Diagnostic verbosity ladder shared across the evaluator (SPEC_FULL §0).

use std::fmt::{Display, Formatter};

/// A leveled diagnostic payload, ordered `None < Default < Success < Result <
/// Verbose`. Callers that want tick-by-tick tracing of node evaluation wrap
/// their message in the level they want and compare [`Log::order`] against a
/// configured threshold before printing, the same pattern the parser uses for
/// lexeme tracing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{s}")
            }
        }
    }
}

impl<T> Log<T> {
    /// Numeric rank of this level, used to compare against a configured
    /// verbosity threshold.
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<T: Display> Log<T> {
    /// Print `self` if its level meets or exceeds `threshold`'s. Compiled
    /// out of release builds, matching the parser's `debug_assertions`-gated
    /// tracing.
    pub fn emit(&self, threshold: &Log<()>) {
        #[cfg(debug_assertions)]
        if self.order() >= threshold.order() {
            println!("[{self}]");
        }
        #[cfg(not(debug_assertions))]
        let _ = threshold;
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn order_is_monotone_by_variant() {
        assert!(Log::None::<()>.order() < Log::Default(()).order());
        assert!(Log::Default(()).order() < Log::Success(()).order());
        assert!(Log::Success(()).order() < Log::Result(()).order());
        assert!(Log::Result(()).order() < Log::Verbose(()).order());
    }

    #[test]
    fn emit_never_panics_regardless_of_threshold() {
        let threshold = Log::Verbose(());
        Log::Default("below threshold, stays quiet".to_string()).emit(&threshold);
        Log::Verbose("at threshold, prints in debug builds".to_string()).emit(&threshold);
    }
}
