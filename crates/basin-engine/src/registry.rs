//! Well registry
//!
//! Owns every built well and its state. Each well's state sits behind its own
//! mutex, held for the whole read, price, settle, commit sequence, so two
//! operations on the same well never interleave while operations on different
//! wells run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use basin_core::{BlockContext, EngineConfig, ErrorKind, TokenId, WellId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use wells::{
    BuildWellParams, Execution, LpLedger, PumpState, TokenCustody, Well, WellConfig, WellError,
    WellEvent, WellFunction, WellState,
};

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 1024;

/// Errors that can occur in the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Well not found: {0}")]
    WellNotFound(WellId),

    #[error("Well already exists: {0}")]
    WellExists(WellId),

    #[error("Clock regression: last update at {last}, operation at {now}")]
    ClockRegression { last: u64, now: u64 },

    #[error(transparent)]
    Well(#[from] WellError),
}

impl RegistryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WellNotFound(_) => "well_not_found",
            Self::WellExists(_) => "well_exists",
            Self::ClockRegression { .. } => "clock_regression",
            Self::Well(e) => e.error_code(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WellNotFound(_) => ErrorKind::NotFound,
            Self::WellExists(_) => ErrorKind::ConstructionInvalid,
            Self::ClockRegression { .. } => ErrorKind::InvalidInput,
            Self::Well(e) => e.kind(),
        }
    }
}

/// Point-in-time view of one well
#[derive(Debug, Clone, Serialize)]
pub struct WellSnapshot {
    pub id: WellId,
    pub name: String,
    pub symbol: String,
    pub config: WellConfig,
    pub state: WellState,
}

struct WellSlot {
    well: Well,
    state: Mutex<WellState>,
}

#[derive(Default)]
struct Wells {
    by_id: HashMap<WellId, Arc<WellSlot>>,
    /// Build order
    order: Vec<WellId>,
}

struct RegistryInner {
    config: EngineConfig,
    wells: RwLock<Wells>,
    events: broadcast::Sender<WellEvent>,
}

/// Shared handle to the registry. Clones refer to the same wells.
#[derive(Clone)]
pub struct WellRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for WellRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WellRegistry {
    /// Create a registry with default config
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create with a specific config
    pub fn with_config(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(RegistryInner {
                config,
                wells: RwLock::new(Wells::default()),
                events,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Receive every event committed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<WellEvent> {
        self.inner.events.subscribe()
    }

    fn publish(&self, event: WellEvent) {
        // No subscribers is not an error
        let _ = self.inner.events.send(event);
    }

    // --- Construction ---

    /// Build a well and register it. The oracle clock starts at `ctx`.
    pub async fn build_well(&self, params: BuildWellParams, ctx: BlockContext) -> Result<WellId, RegistryError> {
        let well = Well::build(params, self.inner.config.max_tokens)?;
        let id = well.id().clone();

        let mut state = well.initial_state();
        state.last_timestamp = ctx.timestamp;
        state.last_block = ctx.block_number;

        let event = WellEvent::BuildWell {
            well_id: id.clone(),
            tokens: well.tokens().to_vec(),
            well_function: well.config().well_function.kind,
            pumps: well.pumps().len(),
        };

        {
            let mut wells = self.inner.wells.write().await;
            if wells.by_id.contains_key(&id) {
                return Err(RegistryError::WellExists(id));
            }
            tracing::info!("Registered well {} ({})", id.short(), well.lp_name());
            wells.by_id.insert(
                id.clone(),
                Arc::new(WellSlot {
                    well,
                    state: Mutex::new(state),
                }),
            );
            wells.order.push(id.clone());
        }

        self.publish(event);
        Ok(id)
    }

    async fn slot(&self, id: &WellId) -> Result<Arc<WellSlot>, RegistryError> {
        self.inner
            .wells
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::WellNotFound(id.clone()))
    }

    async fn read<T>(
        &self,
        id: &WellId,
        f: impl FnOnce(&Well, &WellState) -> Result<T, WellError>,
    ) -> Result<T, RegistryError> {
        let slot = self.slot(id).await?;
        let state = slot.state.lock().await;
        Ok(f(&slot.well, &state)?)
    }

    fn check_clock(&self, state: &WellState, ctx: BlockContext) -> Result<(), RegistryError> {
        if self.inner.config.strict_clock && ctx.timestamp < state.last_timestamp {
            return Err(RegistryError::ClockRegression {
                last: state.last_timestamp,
                now: ctx.timestamp,
            });
        }
        Ok(())
    }

    /// Run one state-changing operation under the well's lock and commit its result
    async fn execute<T>(
        &self,
        id: &WellId,
        ctx: BlockContext,
        op: impl FnOnce(&Well, &WellState) -> Result<Execution<T>, WellError>,
    ) -> Result<T, RegistryError> {
        let slot = self.slot(id).await?;
        let mut state = slot.state.lock().await;
        self.check_clock(&state, ctx)?;

        let execution = match op(&slot.well, &state) {
            Ok(execution) => execution,
            Err(e) => {
                tracing::debug!("Well {} operation rejected: {}", id.short(), e);
                return Err(e.into());
            }
        };
        *state = execution.state;
        drop(state);

        tracing::info!("Well {} committed {} at t={}", id.short(), execution.event.name(), ctx.timestamp);
        self.publish(execution.event);
        Ok(execution.value)
    }

    // --- Queries ---

    pub async fn well_count(&self) -> usize {
        self.inner.wells.read().await.order.len()
    }

    /// Id of the `index`-th well built
    pub async fn well_id_at_index(&self, index: usize) -> Option<WellId> {
        self.inner.wells.read().await.order.get(index).cloned()
    }

    pub async fn get_well(&self, id: &WellId) -> Result<WellSnapshot, RegistryError> {
        self.read(id, |well, state| {
            Ok(WellSnapshot {
                id: well.id().clone(),
                name: well.lp_name(),
                symbol: well.lp_symbol(),
                config: well.config().clone(),
                state: state.clone(),
            })
        })
        .await
    }

    pub async fn reserves(&self, id: &WellId) -> Result<Vec<u128>, RegistryError> {
        self.read(id, |_, state| Ok(state.reserves.clone())).await
    }

    pub async fn lp_supply(&self, id: &WellId) -> Result<u128, RegistryError> {
        self.read(id, |_, state| Ok(state.lp_supply)).await
    }

    pub async fn invariant(&self, id: &WellId) -> Result<u128, RegistryError> {
        self.read(id, |well, state| well.function().invariant(&state.reserves)).await
    }

    pub async fn cumulative_reserves(&self, id: &WellId, pump: usize) -> Result<Vec<u128>, RegistryError> {
        self.read(id, |well, state| well.cumulative_reserves(state, pump)).await
    }

    pub async fn ema_reserves(&self, id: &WellId, pump: usize) -> Result<Vec<u128>, RegistryError> {
        self.read(id, |well, state| well.ema_reserves(state, pump)).await
    }

    /// Pump state advanced to `ctx`, not committed
    pub async fn read_updated_pump(
        &self,
        id: &WellId,
        pump: usize,
        ctx: BlockContext,
    ) -> Result<PumpState, RegistryError> {
        let slot = self.slot(id).await?;
        let state = slot.state.lock().await;
        self.check_clock(&state, ctx)?;
        Ok(slot.well.read_updated_pump(&state, pump, ctx)?)
    }

    pub async fn get_swap_out(
        &self,
        id: &WellId,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: u128,
    ) -> Result<u128, RegistryError> {
        self.read(id, |well, state| well.get_swap_out(state, token_in, token_out, amount_in))
            .await
    }

    pub async fn get_swap_in(
        &self,
        id: &WellId,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_out: u128,
    ) -> Result<u128, RegistryError> {
        self.read(id, |well, state| well.get_swap_in(state, token_in, token_out, amount_out))
            .await
    }

    pub async fn get_add_liquidity_out(&self, id: &WellId, amounts: &[u128]) -> Result<u128, RegistryError> {
        self.read(id, |well, state| well.get_add_liquidity_out(state, amounts)).await
    }

    pub async fn get_remove_liquidity_out(&self, id: &WellId, lp_in: u128) -> Result<Vec<u128>, RegistryError> {
        self.read(id, |well, state| well.get_remove_liquidity_out(state, lp_in)).await
    }

    pub async fn get_remove_liquidity_one_token_out(
        &self,
        id: &WellId,
        lp_in: u128,
        token: &TokenId,
    ) -> Result<u128, RegistryError> {
        self.read(id, |well, state| well.get_remove_liquidity_one_token_out(state, lp_in, token))
            .await
    }

    pub async fn get_remove_liquidity_imbalanced_in(
        &self,
        id: &WellId,
        amounts: &[u128],
    ) -> Result<u128, RegistryError> {
        self.read(id, |well, state| well.get_remove_liquidity_imbalanced_in(state, amounts))
            .await
    }

    // --- State-changing operations ---

    #[allow(clippy::too_many_arguments)]
    pub async fn swap_from(
        &self,
        id: &WellId,
        ctx: BlockContext,
        token_in: &TokenId,
        token_out: &TokenId,
        amount_in: u128,
        min_amount_out: u128,
        custody: &mut (dyn TokenCustody + Send),
    ) -> Result<u128, RegistryError> {
        self.execute(id, ctx, |well, state| {
            well.swap_from(state, ctx, token_in, token_out, amount_in, min_amount_out, custody)
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn swap_to(
        &self,
        id: &WellId,
        ctx: BlockContext,
        token_in: &TokenId,
        token_out: &TokenId,
        max_amount_in: u128,
        amount_out: u128,
        custody: &mut (dyn TokenCustody + Send),
    ) -> Result<u128, RegistryError> {
        self.execute(id, ctx, |well, state| {
            well.swap_to(state, ctx, token_in, token_out, max_amount_in, amount_out, custody)
        })
        .await
    }

    pub async fn add_liquidity(
        &self,
        id: &WellId,
        ctx: BlockContext,
        amounts: &[u128],
        min_lp_out: u128,
        custody: &mut (dyn TokenCustody + Send),
        ledger: &mut (dyn LpLedger + Send),
    ) -> Result<u128, RegistryError> {
        self.execute(id, ctx, |well, state| {
            well.add_liquidity(state, ctx, amounts, min_lp_out, custody, ledger)
        })
        .await
    }

    pub async fn remove_liquidity(
        &self,
        id: &WellId,
        ctx: BlockContext,
        lp_in: u128,
        min_amounts_out: &[u128],
        custody: &mut (dyn TokenCustody + Send),
        ledger: &mut (dyn LpLedger + Send),
    ) -> Result<Vec<u128>, RegistryError> {
        self.execute(id, ctx, |well, state| {
            well.remove_liquidity(state, ctx, lp_in, min_amounts_out, custody, ledger)
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn remove_liquidity_one_token(
        &self,
        id: &WellId,
        ctx: BlockContext,
        lp_in: u128,
        token_out: &TokenId,
        min_amount_out: u128,
        custody: &mut (dyn TokenCustody + Send),
        ledger: &mut (dyn LpLedger + Send),
    ) -> Result<u128, RegistryError> {
        self.execute(id, ctx, |well, state| {
            well.remove_liquidity_one_token(state, ctx, lp_in, token_out, min_amount_out, custody, ledger)
        })
        .await
    }

    pub async fn remove_liquidity_imbalanced(
        &self,
        id: &WellId,
        ctx: BlockContext,
        max_lp_in: u128,
        amounts: &[u128],
        custody: &mut (dyn TokenCustody + Send),
        ledger: &mut (dyn LpLedger + Send),
    ) -> Result<u128, RegistryError> {
        self.execute(id, ctx, |well, state| {
            well.remove_liquidity_imbalanced(state, ctx, max_lp_in, amounts, custody, ledger)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wells::{CollaboratorError, MemoryAccount, MemoryLpLedger, PumpConfig, WellFunctionSpec};

    const M: u128 = 1_000_000;

    fn usdc() -> TokenId {
        TokenId::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
    }

    fn bean() -> TokenId {
        TokenId::new("0xbea0000029ad1c77d3d5d23ba2d8893db9d1efab")
    }

    fn params() -> BuildWellParams {
        BuildWellParams {
            tokens: vec![usdc(), bean()],
            symbols: vec!["USDC".to_string(), "BEAN".to_string()],
            decimals: vec![6, 6],
            well_function: WellFunctionSpec::constant_product_2(),
            pumps: vec![PumpConfig::default_ema()],
        }
    }

    fn account() -> MemoryAccount {
        MemoryAccount::new()
            .with_balance(&usdc(), 10_000 * M)
            .with_balance(&bean(), 10_000 * M)
    }

    /// Registry with one [100e6, 100e6] well built and seeded at t = 0
    async fn seeded() -> anyhow::Result<(WellRegistry, WellId)> {
        let registry = WellRegistry::new();
        let id = registry.build_well(params(), BlockContext::new(0, 1)).await?;
        registry
            .add_liquidity(
                &id,
                BlockContext::new(0, 1),
                &[100 * M, 100 * M],
                0,
                &mut account(),
                &mut MemoryLpLedger::default(),
            )
            .await?;
        Ok((registry, id))
    }

    /// Custody that refuses to receive BEAN
    struct Unpayable(MemoryAccount);

    impl TokenCustody for Unpayable {
        fn debit(&mut self, token: &TokenId, amount: u128) -> Result<(), CollaboratorError> {
            self.0.debit(token, amount)
        }

        fn credit(&mut self, token: &TokenId, amount: u128) -> Result<(), CollaboratorError> {
            if *token == bean() {
                return Err(CollaboratorError::Rejected("recipient blocked".to_string()));
            }
            self.0.credit(token, amount)
        }
    }

    #[tokio::test]
    async fn test_build_and_lookup() -> anyhow::Result<()> {
        let registry = WellRegistry::new();
        let id = registry.build_well(params(), BlockContext::new(100, 7)).await?;

        assert_eq!(registry.well_count().await, 1);
        assert_eq!(registry.well_id_at_index(0).await, Some(id.clone()));
        assert_eq!(registry.well_id_at_index(1).await, None);

        let snapshot = registry.get_well(&id).await?;
        assert_eq!(snapshot.name, "USDC:BEAN Well");
        assert_eq!(snapshot.symbol, "USDCBEANwl");
        assert_eq!(snapshot.state.last_timestamp, 100);
        assert_eq!(snapshot.state.lp_supply, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_build_rejected() -> anyhow::Result<()> {
        let registry = WellRegistry::new();
        registry.build_well(params(), BlockContext::default()).await?;
        let err = registry.build_well(params(), BlockContext::default()).await.unwrap_err();
        assert!(matches!(err, RegistryError::WellExists(_)));
        assert_eq!(err.error_code(), "well_exists");
        Ok(())
    }

    #[tokio::test]
    async fn test_build_respects_token_limit() {
        let registry = WellRegistry::with_config(EngineConfig {
            max_tokens: 2,
            ..EngineConfig::default()
        });
        let mut p = params();
        p.tokens.push(TokenId::new("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"));
        p.symbols.push("WETH".to_string());
        p.decimals.push(18);
        p.well_function = WellFunctionSpec::constant_product();
        let err = registry.build_well(p, BlockContext::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstructionInvalid);
        assert_eq!(registry.well_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_well() {
        let registry = WellRegistry::new();
        let err = registry.reserves(&WellId::new("missing")).await.unwrap_err();
        assert!(matches!(err, RegistryError::WellNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_swap_commits_state() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        assert_eq!(registry.get_swap_out(&id, &usdc(), &bean(), 100 * M).await?, 50 * M);

        let mut trader = account();
        let out = registry
            .swap_from(&id, BlockContext::new(12, 2), &usdc(), &bean(), 100 * M, 49 * M, &mut trader)
            .await?;
        assert_eq!(out, 50 * M);
        assert_eq!(registry.reserves(&id).await?, vec![200 * M, 50 * M]);
        assert_eq!(registry.lp_supply(&id).await?, 200 * M);
        assert_eq!(registry.invariant(&id).await?, 200 * M);
        assert_eq!(registry.cumulative_reserves(&id, 0).await?, vec![1_200 * M, 1_200 * M]);
        Ok(())
    }

    #[tokio::test]
    async fn test_slippage_leaves_state_untouched() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        let before = registry.get_well(&id).await?.state;

        let err = registry
            .swap_from(&id, BlockContext::new(12, 2), &usdc(), &bean(), 100 * M, 51 * M, &mut account())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SlippageExceeded);
        assert_eq!(registry.get_well(&id).await?.state, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_settlement_rolls_back() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        let before = registry.get_well(&id).await?.state;
        let mut custody = Unpayable(account());

        let err = registry
            .swap_from(&id, BlockContext::new(12, 2), &usdc(), &bean(), 10 * M, 0, &mut custody)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert_eq!(custody.0.balance(&usdc()), 10_000 * M);
        assert_eq!(registry.get_well(&id).await?.state, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_clock_regression_rejected_when_strict() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        registry
            .swap_from(&id, BlockContext::new(50, 2), &usdc(), &bean(), M, 0, &mut account())
            .await?;
        let err = registry
            .swap_from(&id, BlockContext::new(40, 3), &usdc(), &bean(), M, 0, &mut account())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ClockRegression { last: 50, now: 40 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_clock_regression_clamped_when_lenient() -> anyhow::Result<()> {
        let registry = WellRegistry::with_config(EngineConfig {
            strict_clock: false,
            ..EngineConfig::default()
        });
        let id = registry.build_well(params(), BlockContext::new(50, 1)).await?;
        registry
            .add_liquidity(&id, BlockContext::new(40, 2), &[M, M], 0, &mut account(), &mut MemoryLpLedger::default())
            .await?;
        let snapshot = registry.get_well(&id).await?;
        assert_eq!(snapshot.state.last_timestamp, 50);
        assert_eq!(snapshot.state.pumps[0].cumulative, vec![0, 0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_updated_pump_does_not_commit() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        let preview = registry.read_updated_pump(&id, 0, BlockContext::new(9, 2)).await?;
        assert_eq!(preview.cumulative, vec![900 * M, 900 * M]);
        assert_eq!(registry.cumulative_reserves(&id, 0).await?, vec![0, 0]);
        assert_eq!(registry.ema_reserves(&id, 0).await?, vec![0, 0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_liquidity_round_trip() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        let mut lp = MemoryLpLedger::default();
        let mut provider = account();
        let ctx = BlockContext::new(5, 2);

        let quoted = registry.get_add_liquidity_out(&id, &[90 * M, 110 * M]).await?;
        let minted = registry
            .add_liquidity(&id, ctx, &[90 * M, 110 * M], quoted, &mut provider, &mut lp)
            .await?;
        assert_eq!(minted, 199_499_686);

        let amounts = registry.get_remove_liquidity_out(&id, minted).await?;
        let removed = registry
            .remove_liquidity(&id, ctx, minted, &amounts, &mut provider, &mut lp)
            .await?;
        assert_eq!(removed, amounts);
        assert!(removed[0] + removed[1] <= 200 * M);
        assert_eq!(lp.balance(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_one_token_and_imbalanced_removal() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        let mut lp = MemoryLpLedger::new(200 * M);
        let mut provider = account();
        let ctx = BlockContext::new(5, 2);

        assert_eq!(registry.get_remove_liquidity_one_token_out(&id, 10 * M, &bean()).await?, 9_750_000);
        let out = registry
            .remove_liquidity_one_token(&id, ctx, 10 * M, &bean(), 9_750_000, &mut provider, &mut lp)
            .await?;
        assert_eq!(out, 9_750_000);

        let lp_in = registry.get_remove_liquidity_imbalanced_in(&id, &[M, M]).await?;
        let burned = registry
            .remove_liquidity_imbalanced(&id, ctx, lp_in, &[M, M], &mut provider, &mut lp)
            .await?;
        assert_eq!(burned, lp_in);
        assert_eq!(lp.balance(), 190 * M - lp_in);
        Ok(())
    }

    #[tokio::test]
    async fn test_swap_to() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        assert_eq!(registry.get_swap_in(&id, &usdc(), &bean(), 50 * M).await?, 100 * M);
        let paid = registry
            .swap_to(&id, BlockContext::new(1, 2), &usdc(), &bean(), 100 * M, 50 * M, &mut account())
            .await?;
        assert_eq!(paid, 100 * M);
        Ok(())
    }

    #[tokio::test]
    async fn test_events_published() -> anyhow::Result<()> {
        let registry = WellRegistry::new();
        let mut events = registry.subscribe();
        let id = registry.build_well(params(), BlockContext::default()).await?;
        registry
            .add_liquidity(&id, BlockContext::new(1, 2), &[M, M], 0, &mut account(), &mut MemoryLpLedger::default())
            .await?;

        let first = events.recv().await?;
        assert_eq!(first.name(), "build_well");
        assert_eq!(first.well_id(), &id);
        let second = events.recv().await?;
        assert!(matches!(second, WellEvent::AddLiquidity { lp_out, .. } if lp_out == 2 * M));

        let json = serde_json::to_value(&second)?;
        assert_eq!(json["event"], "add_liquidity");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_swaps_conserve_reserves() -> anyhow::Result<()> {
        let (registry, id) = seeded().await?;
        let k_before = registry.invariant(&id).await?;

        let mut handles = Vec::new();
        for n in 0..32u64 {
            let registry = registry.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let (token_in, token_out) = if n % 2 == 0 { (usdc(), bean()) } else { (bean(), usdc()) };
                let amount_in = (n as u128 + 1) * 10_000;
                let mut trader = account();
                let out = registry
                    .swap_from(&id, BlockContext::new(10, 2), &token_in, &token_out, amount_in, 0, &mut trader)
                    .await?;
                Ok::<_, RegistryError>((n % 2 == 0, amount_in, out))
            }));
        }

        let mut expected = [100 * M, 100 * M];
        for handle in handles {
            let (usdc_in, amount_in, out) = handle.await??;
            if usdc_in {
                expected[0] += amount_in;
                expected[1] -= out;
            } else {
                expected[1] += amount_in;
                expected[0] -= out;
            }
        }

        assert_eq!(registry.reserves(&id).await?, expected.to_vec());
        assert!(registry.invariant(&id).await? >= k_before);
        Ok(())
    }
}
