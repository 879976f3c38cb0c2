//! Well Engine
//!
//! A built [`Well`] is immutable: tokens, well function and pumps are fixed at
//! build time. Every operation reads a [`WellState`] and, for state-changing
//! operations, returns the next state inside an [`Execution`]. The caller owns
//! the state and decides when to commit.
//!
//! State-changing operations follow one sequence:
//!
//! 1. advance every pump with the pre-operation reserves
//! 2. price the operation and check the caller's bound
//! 3. apply the settlement through the custody and LP collaborators
//! 4. return the next state
//!
//! Any failure before step 4 leaves the caller's state and collaborators as
//! they were.

use basin_core::{BlockContext, TokenId, WellId};
use blake2::digest::{consts::U32, Digest};
use blake2::Blake2b;

use crate::calculator::{self, Outcome};
use crate::constants::lp::{NAME_SUFFIX, SYMBOL_SUFFIX};
use crate::ledger::{LpLedger, Settlement, TokenCustody};
use crate::pump::{Pump, PumpState, PumpStrategy};
use crate::state::{BuildWellParams, Execution, WellConfig, WellError, WellEvent, WellState};
use crate::well_function::{WellFunction, WellFunctionStrategy};

/// A built well
#[derive(Debug, Clone)]
pub struct Well {
    id: WellId,
    config: WellConfig,
    function: WellFunctionStrategy,
    pumps: Vec<PumpStrategy>,
}

impl Well {
    /// Validate parameters and build a well
    pub fn build(params: BuildWellParams, max_tokens: usize) -> Result<Self, WellError> {
        let n = params.tokens.len();
        if n < 2 || n > max_tokens {
            return Err(WellError::InvalidTokenCount {
                count: n,
                max: max_tokens,
            });
        }
        if params.tokens.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(WellError::TokensNotOrdered);
        }
        if params.decimals.len() != n {
            return Err(WellError::MetadataMismatch(format!(
                "{} decimals for {} tokens",
                params.decimals.len(),
                n
            )));
        }
        if params.symbols.len() != n {
            return Err(WellError::MetadataMismatch(format!(
                "{} symbols for {} tokens",
                params.symbols.len(),
                n
            )));
        }

        let function = params.well_function.build(n)?;
        let pumps = params
            .pumps
            .iter()
            .map(|p| p.build())
            .collect::<Result<Vec<_>, _>>()?;

        let config = WellConfig {
            tokens: params.tokens,
            symbols: params.symbols,
            decimals: params.decimals,
            well_function: params.well_function,
            pumps: params.pumps,
        };
        let id = well_id(&config)?;

        tracing::debug!(
            "Built well {} ({} tokens, {}, {} pumps)",
            id.short(),
            n,
            function.name(),
            pumps.len()
        );

        Ok(Self {
            id,
            config,
            function,
            pumps,
        })
    }

    pub fn id(&self) -> &WellId {
        &self.id
    }

    pub fn config(&self) -> &WellConfig {
        &self.config
    }

    pub fn tokens(&self) -> &[TokenId] {
        &self.config.tokens
    }

    pub fn function(&self) -> &WellFunctionStrategy {
        &self.function
    }

    pub fn pumps(&self) -> &[PumpStrategy] {
        &self.pumps
    }

    /// LP token name, e.g. "USDC:BEAN Well"
    pub fn lp_name(&self) -> String {
        format!("{}{}", self.config.symbols.join(":"), NAME_SUFFIX)
    }

    /// LP token symbol, e.g. "USDCBEANwl"
    pub fn lp_symbol(&self) -> String {
        format!("{}{}", self.config.symbols.concat(), SYMBOL_SUFFIX)
    }

    /// Empty state for a freshly built well
    pub fn initial_state(&self) -> WellState {
        WellState::new(self.config.n_tokens(), &self.pumps)
    }

    pub fn token_index(&self, token: &TokenId) -> Result<usize, WellError> {
        self.config
            .tokens
            .binary_search(token)
            .map_err(|_| WellError::UnknownToken(token.clone()))
    }

    pub fn invariant(&self, state: &WellState) -> Result<u128, WellError> {
        self.function.invariant(&state.reserves)
    }

    // --- Oracle ---

    /// Advance every pump to `ctx` using the current reserves.
    ///
    /// A timestamp earlier than the last advance counts as zero elapsed time.
    pub fn advance_oracle(&self, state: &WellState, ctx: BlockContext) -> Result<WellState, WellError> {
        let elapsed = match ctx.timestamp.checked_sub(state.last_timestamp) {
            Some(elapsed) => elapsed,
            None => {
                tracing::warn!(
                    "Well {} clock went backwards ({} -> {}), treating as zero elapsed",
                    self.id.short(),
                    state.last_timestamp,
                    ctx.timestamp
                );
                0
            }
        };

        let pumps = self
            .pumps
            .iter()
            .zip(&state.pumps)
            .map(|(pump, prev)| pump.advance(prev, &state.reserves, elapsed))
            .collect::<Result<Vec<_>, _>>()?;

        if elapsed > 0 && !pumps.is_empty() {
            tracing::debug!("Well {} advanced {} pumps by {}s", self.id.short(), pumps.len(), elapsed);
        }

        Ok(WellState {
            reserves: state.reserves.clone(),
            lp_supply: state.lp_supply,
            last_timestamp: state.last_timestamp.max(ctx.timestamp),
            last_block: state.last_block.max(ctx.block_number),
            pumps,
        })
    }

    fn pump_state<'a>(&self, state: &'a WellState, pump: usize) -> Result<&'a PumpState, WellError> {
        if pump >= self.pumps.len() {
            return Err(WellError::PumpNotFound(pump));
        }
        state.pumps.get(pump).ok_or(WellError::PumpNotFound(pump))
    }

    /// Pump state as it would be after advancing to `ctx`, without committing anything
    pub fn read_updated_pump(&self, state: &WellState, pump: usize, ctx: BlockContext) -> Result<PumpState, WellError> {
        let advanced = self.advance_oracle(state, ctx)?;
        Ok(self.pump_state(&advanced, pump)?.clone())
    }

    pub fn cumulative_reserves(&self, state: &WellState, pump: usize) -> Result<Vec<u128>, WellError> {
        Ok(self.pump_state(state, pump)?.cumulative.clone())
    }

    pub fn ema_reserves(&self, state: &WellState, pump: usize) -> Result<Vec<u128>, WellError> {
        let pump_state = self.pump_state(state, pump)?;
        if !self.pumps[pump].tracks_ema() {
            return Err(WellError::PumpUntracked(pump));
        }
        Ok(pump_state.ema.clone())
    }

    // --- Quotes ---

    pub fn get_swap_out(
        &self,
        state: &WellState,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: u128,
    ) -> Result<u128, WellError> {
        Ok(self.price_swap_out(state, token_in, token_out, amount_in)?.value)
    }

    pub fn get_swap_in(
        &self,
        state: &WellState,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_out: u128,
    ) -> Result<u128, WellError> {
        Ok(self.price_swap_in(state, token_in, token_out, amount_out)?.value)
    }

    pub fn get_add_liquidity_out(&self, state: &WellState, amounts: &[u128]) -> Result<u128, WellError> {
        Ok(calculator::add_liquidity_out(&self.function, &state.reserves, state.lp_supply, amounts)?.value)
    }

    pub fn get_remove_liquidity_out(&self, state: &WellState, lp_in: u128) -> Result<Vec<u128>, WellError> {
        Ok(calculator::remove_liquidity_out(&state.reserves, state.lp_supply, lp_in)?.value)
    }

    pub fn get_remove_liquidity_one_token_out(
        &self,
        state: &WellState,
        lp_in: u128,
        token: &TokenId,
    ) -> Result<u128, WellError> {
        let j = self.token_index(token)?;
        Ok(calculator::remove_liquidity_one_token_out(&self.function, &state.reserves, state.lp_supply, lp_in, j)?.value)
    }

    pub fn get_remove_liquidity_imbalanced_in(&self, state: &WellState, amounts: &[u128]) -> Result<u128, WellError> {
        Ok(calculator::remove_liquidity_imbalanced_in(&self.function, &state.reserves, state.lp_supply, amounts)?.value)
    }

    fn price_swap_out(
        &self,
        state: &WellState,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: u128,
    ) -> Result<Outcome<u128>, WellError> {
        let (i, j) = self.swap_indices(token_in, token_out)?;
        calculator::swap_out(&self.function, &state.reserves, state.lp_supply, i, j, amount_in)
    }

    fn price_swap_in(
        &self,
        state: &WellState,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_out: u128,
    ) -> Result<Outcome<u128>, WellError> {
        let (i, j) = self.swap_indices(token_in, token_out)?;
        calculator::swap_in(&self.function, &state.reserves, state.lp_supply, i, j, amount_out)
    }

    fn swap_indices(&self, token_in: &TokenId, token_out: &TokenId) -> Result<(usize, usize), WellError> {
        if token_in == token_out {
            return Err(WellError::SameToken);
        }
        Ok((self.token_index(token_in)?, self.token_index(token_out)?))
    }

    // --- State-changing operations ---

    /// Swap an exact `amount_in` for at least `min_amount_out`
    #[allow(clippy::too_many_arguments)]
    pub fn swap_from(
        &self,
        state: &WellState,
        ctx: BlockContext,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: u128,
        min_amount_out: u128,
        custody: &mut dyn TokenCustody,
    ) -> Result<Execution<u128>, WellError> {
        let advanced = self.advance_oracle(state, ctx)?;
        let outcome = self.price_swap_out(&advanced, token_in, token_out, amount_in)?;
        if outcome.value < min_amount_out {
            return Err(WellError::SlippageExceeded {
                amount: outcome.value,
                bound: min_amount_out,
            });
        }

        Settlement::new()
            .debit(token_in, amount_in)
            .credit(token_out, outcome.value)
            .apply(custody, None)?;

        let event = WellEvent::Swap {
            well_id: self.id.clone(),
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in,
            amount_out: outcome.value,
        };
        Ok(commit(advanced, outcome, event))
    }

    /// Swap at most `max_amount_in` for an exact `amount_out`
    #[allow(clippy::too_many_arguments)]
    pub fn swap_to(
        &self,
        state: &WellState,
        ctx: BlockContext,
        token_in: &TokenId,
        token_out: &TokenId,
        max_amount_in: u128,
        amount_out: u128,
        custody: &mut dyn TokenCustody,
    ) -> Result<Execution<u128>, WellError> {
        let advanced = self.advance_oracle(state, ctx)?;
        let outcome = self.price_swap_in(&advanced, token_in, token_out, amount_out)?;
        if outcome.value > max_amount_in {
            return Err(WellError::SlippageExceeded {
                amount: outcome.value,
                bound: max_amount_in,
            });
        }

        Settlement::new()
            .debit(token_in, outcome.value)
            .credit(token_out, amount_out)
            .apply(custody, None)?;

        let event = WellEvent::Swap {
            well_id: self.id.clone(),
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in: outcome.value,
            amount_out,
        };
        Ok(commit(advanced, outcome, event))
    }

    /// Deposit `amounts` for at least `min_lp_out` LP
    pub fn add_liquidity(
        &self,
        state: &WellState,
        ctx: BlockContext,
        amounts: &[u128],
        min_lp_out: u128,
        custody: &mut dyn TokenCustody,
        ledger: &mut dyn LpLedger,
    ) -> Result<Execution<u128>, WellError> {
        let advanced = self.advance_oracle(state, ctx)?;
        let outcome = calculator::add_liquidity_out(&self.function, &advanced.reserves, advanced.lp_supply, amounts)?;
        if outcome.value < min_lp_out {
            return Err(WellError::InsufficientLpOut {
                lp_out: outcome.value,
                min: min_lp_out,
            });
        }

        let settlement = self
            .tokens()
            .iter()
            .zip(amounts)
            .fold(Settlement::new(), |s, (token, amount)| s.debit(token, *amount))
            .mint(outcome.value);
        settlement.apply(custody, Some(ledger))?;

        let event = WellEvent::AddLiquidity {
            well_id: self.id.clone(),
            amounts: amounts.to_vec(),
            lp_out: outcome.value,
        };
        Ok(commit(advanced, outcome, event))
    }

    /// Burn `lp_in` for a proportional share of every reserve
    pub fn remove_liquidity(
        &self,
        state: &WellState,
        ctx: BlockContext,
        lp_in: u128,
        min_amounts_out: &[u128],
        custody: &mut dyn TokenCustody,
        ledger: &mut dyn LpLedger,
    ) -> Result<Execution<Vec<u128>>, WellError> {
        if min_amounts_out.len() != self.config.n_tokens() {
            return Err(WellError::AmountsLengthMismatch {
                expected: self.config.n_tokens(),
                got: min_amounts_out.len(),
            });
        }
        let advanced = self.advance_oracle(state, ctx)?;
        let outcome = calculator::remove_liquidity_out(&advanced.reserves, advanced.lp_supply, lp_in)?;
        for ((token, amount), min) in self.tokens().iter().zip(&outcome.value).zip(min_amounts_out) {
            if amount < min {
                return Err(WellError::InsufficientOut {
                    token: token.clone(),
                    amount: *amount,
                    min: *min,
                });
            }
        }

        let settlement = self
            .tokens()
            .iter()
            .zip(&outcome.value)
            .fold(Settlement::new().burn(lp_in), |s, (token, amount)| s.credit(token, *amount));
        settlement.apply(custody, Some(ledger))?;

        let event = WellEvent::RemoveLiquidity {
            well_id: self.id.clone(),
            lp_in,
            amounts: outcome.value.clone(),
        };
        Ok(commit(advanced, outcome, event))
    }

    /// Burn `lp_in` for at least `min_amount_out` of a single token
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity_one_token(
        &self,
        state: &WellState,
        ctx: BlockContext,
        lp_in: u128,
        token_out: &TokenId,
        min_amount_out: u128,
        custody: &mut dyn TokenCustody,
        ledger: &mut dyn LpLedger,
    ) -> Result<Execution<u128>, WellError> {
        let j = self.token_index(token_out)?;
        let advanced = self.advance_oracle(state, ctx)?;
        let outcome = calculator::remove_liquidity_one_token_out(
            &self.function,
            &advanced.reserves,
            advanced.lp_supply,
            lp_in,
            j,
        )?;
        if outcome.value < min_amount_out {
            return Err(WellError::InsufficientOut {
                token: token_out.clone(),
                amount: outcome.value,
                min: min_amount_out,
            });
        }

        Settlement::new()
            .burn(lp_in)
            .credit(token_out, outcome.value)
            .apply(custody, Some(ledger))?;

        let event = WellEvent::RemoveLiquidityOneToken {
            well_id: self.id.clone(),
            lp_in,
            token: token_out.clone(),
            amount_out: outcome.value,
        };
        Ok(commit(advanced, outcome, event))
    }

    /// Withdraw exactly `amounts` for at most `max_lp_in` LP
    pub fn remove_liquidity_imbalanced(
        &self,
        state: &WellState,
        ctx: BlockContext,
        max_lp_in: u128,
        amounts: &[u128],
        custody: &mut dyn TokenCustody,
        ledger: &mut dyn LpLedger,
    ) -> Result<Execution<u128>, WellError> {
        let advanced = self.advance_oracle(state, ctx)?;
        let outcome =
            calculator::remove_liquidity_imbalanced_in(&self.function, &advanced.reserves, advanced.lp_supply, amounts)?;
        if outcome.value > max_lp_in {
            return Err(WellError::LpInTooHigh {
                lp_in: outcome.value,
                max: max_lp_in,
            });
        }

        let settlement = self
            .tokens()
            .iter()
            .zip(amounts)
            .fold(Settlement::new().burn(outcome.value), |s, (token, amount)| s.credit(token, *amount));
        settlement.apply(custody, Some(ledger))?;

        let event = WellEvent::RemoveLiquidity {
            well_id: self.id.clone(),
            lp_in: outcome.value,
            amounts: amounts.to_vec(),
        };
        Ok(commit(advanced, outcome, event))
    }
}

fn commit<T>(advanced: WellState, outcome: Outcome<T>, event: WellEvent) -> Execution<T> {
    Execution {
        state: WellState {
            reserves: outcome.reserves,
            lp_supply: outcome.lp_supply,
            ..advanced
        },
        value: outcome.value,
        event,
    }
}

/// BLAKE2b-256 of the JSON-encoded config
fn well_id(config: &WellConfig) -> Result<WellId, WellError> {
    let encoded = serde_json::to_vec(config)?;
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(&encoded);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(WellId::from_digest(&digest))
}
