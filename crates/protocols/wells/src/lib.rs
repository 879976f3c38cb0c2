//! Basin Wells
//!
//! N-token constant-function market maker. A well holds reserves of two or
//! more tokens, prices swaps and liquidity changes through a pluggable well
//! function, issues LP shares against the invariant, and keeps time-weighted
//! reserve oracles (pumps).

pub mod calculator;
pub mod constants;
pub mod ledger;
pub mod math;
pub mod pump;
pub mod state;
pub mod well;
pub mod well_function;

// Re-exports
pub use calculator::Outcome;
pub use constants::{fixed, lp, pumps, solver, stable};
pub use ledger::{
    CollaboratorError, LpLedger, MemoryAccount, MemoryLpLedger, Settlement, SettlementStep,
    TokenCustody,
};
pub use math::Rounding;
pub use pump::{Pump, PumpConfig, PumpKind, PumpState, PumpStrategy};
pub use state::{BuildWellParams, Execution, WellConfig, WellError, WellEvent, WellState};
pub use well::Well;
pub use well_function::{
    ConstantProduct, ConstantProduct2, Stable, WellFunction, WellFunctionKind, WellFunctionSpec,
    WellFunctionStrategy,
};
