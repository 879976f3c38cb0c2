//! Well Constants
//!
//! Fixed-point scale, solver budgets and parameter bounds. The solver budgets
//! are part of the public contract: they bound how far an iterative well
//! function may search before failing with `InvariantDidNotConverge`.

/// Fixed-point constants
pub mod fixed {
    /// 1.0 in 18-decimal fixed point
    pub const ONE: u128 = 1_000_000_000_000_000_000;

    /// Width of an encoded parameter word (big-endian, left padded)
    pub const PARAM_WORD_BYTES: usize = 32;
}

/// Iterative solver budgets
pub mod solver {
    /// Newton iterations allowed when computing an invariant numerically
    pub const MAX_NEWTON_ITERATIONS: u32 = 255;

    /// Newton stops once two successive estimates differ by at most this many units
    pub const NEWTON_TOLERANCE: u32 = 1;

    /// Doublings allowed while bracketing a reserve from above
    pub const MAX_BRACKET_DOUBLINGS: u32 = 128;

    /// Halvings allowed once a bracket is found. A u128 bracket closes in 128.
    pub const MAX_BISECTION_STEPS: u32 = 256;
}

/// Pump parameters
pub mod pumps {
    /// Default EMA smoothing factor per second (~0.99944, a half-life of about 20 minutes)
    pub const DEFAULT_EMA_ALPHA: u128 = 999_444_598_700_000_000;
}

/// StableSwap parameters
pub mod stable {
    pub const MIN_AMPLIFICATION: u128 = 1;
    pub const MAX_AMPLIFICATION: u128 = 1_000_000;
}

/// LP token naming
pub mod lp {
    /// Appended to the colon-joined token symbols, e.g. "USDC:BEAN Well"
    pub const NAME_SUFFIX: &str = " Well";

    /// Appended to the concatenated token symbols, e.g. "USDCBEANwl"
    pub const SYMBOL_SUFFIX: &str = "wl";
}
