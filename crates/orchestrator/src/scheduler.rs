use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use volume_bot_core::events::CycleReport;
use volume_bot_core::state::TradeState;
use volume_bot_core::traits::{ExchangeClient, Notifier, StateStore};

use crate::controller::TradeCycleController;

/// Re-arm delay used when persisting the schedule fails, so the bot
/// self-heals instead of losing its schedule.
pub const FALLBACK_DELAY_MINUTES: i64 = 5;

/// What to do with a restored (or freshly updated) schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    FireNow,
    ResumeAt(DateTime<Utc>),
}

/// Decides whether a schedule entry warrants waiting or firing immediately.
/// A future `next_trade` resumes the prior schedule rather than
/// double-firing; an absent or elapsed one fires now.
#[must_use]
pub fn resume_action(state: &TradeState, now: DateTime<Utc>) -> ResumeAction {
    match state.next_trade {
        Some(at) if at > now => ResumeAction::ResumeAt(at),
        _ => ResumeAction::FireNow,
    }
}

/// Owns the durable [`TradeState`] and drives the cycle loop: restore or
/// initialize state, fire the controller, persist the randomized next
/// firing time, sleep, repeat. Exactly one cycle is ever in flight, so the
/// state has a single writer and needs no locking.
pub struct Scheduler<C, S>
where
    C: ExchangeClient,
    S: StateStore,
{
    controller: TradeCycleController<C>,
    store: S,
    notifiers: Vec<Box<dyn Notifier>>,
    delay_min_minutes: u64,
    delay_max_minutes: u64,
}

impl<C, S> Scheduler<C, S>
where
    C: ExchangeClient,
    S: StateStore,
{
    #[must_use]
    pub fn new(
        controller: TradeCycleController<C>,
        store: S,
        notifiers: Vec<Box<dyn Notifier>>,
        delay_min_minutes: u64,
        delay_max_minutes: u64,
    ) -> Self {
        Self {
            controller,
            store,
            notifiers,
            delay_min_minutes,
            delay_max_minutes,
        }
    }

    /// Loads the persisted state, or initializes and persists a fresh one
    /// on first launch.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or the initial record
    /// cannot be written.
    pub async fn restore(&self) -> anyhow::Result<TradeState> {
        match self.store.load().await? {
            Some(state) => {
                info!(
                    trade_count = state.trade_count,
                    next_trade = ?state.next_trade,
                    "restored trade state"
                );
                Ok(state)
            }
            None => {
                let state = TradeState::default();
                self.store.save(&state).await?;
                info!("initialized fresh trade state");
                Ok(state)
            }
        }
    }

    /// Runs the trade loop until the process is stopped.
    ///
    /// # Errors
    /// Returns an error only if the initial state cannot be restored;
    /// after that, every failure mode re-arms the schedule instead.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut state = self.restore().await?;

        loop {
            if let ResumeAction::ResumeAt(at) = resume_action(&state, Utc::now()) {
                info!(next_trade = %at, "waiting for next trade");
                sleep_until(at).await;
            }

            let report = self.fire_cycle(&mut state).await;
            self.deliver(&report).await;
        }
    }

    /// Fires a single cycle immediately, ignoring any pending schedule,
    /// then persists and reports as usual. Used by the manual `once`
    /// command.
    ///
    /// # Errors
    /// Returns an error only if the initial state cannot be restored.
    pub async fn run_once(mut self) -> anyhow::Result<CycleReport> {
        let mut state = self.restore().await?;
        let report = self.fire_cycle(&mut state).await;
        self.deliver(&report).await;
        Ok(report)
    }

    /// Fires one cycle and schedules the next: run the controller,
    /// increment the count, draw the randomized delay, and persist before
    /// the timer is armed. Persistence failure falls back to a short
    /// fixed delay; a crash between "cycle ran" and "state persisted"
    /// reproduces at most one duplicate trade.
    pub async fn fire_cycle(&mut self, state: &mut TradeState) -> CycleReport {
        let mut report = self.controller.run_cycle(state).await;

        state.trade_count += 1;
        state.previous_trade = Some(report.finished_at);

        let delay_minutes = self.draw_delay_minutes();
        state.next_trade = Some(Utc::now() + Duration::minutes(delay_minutes));

        if let Err(err) = self.store.save(state).await {
            warn!(
                error = %format!("{err:#}"),
                fallback_minutes = FALLBACK_DELAY_MINUTES,
                "failed to persist trade state; re-arming with fallback delay"
            );
            state.next_trade = Some(Utc::now() + Duration::minutes(FALLBACK_DELAY_MINUTES));
        } else {
            info!(
                trade_count = state.trade_count,
                delay_minutes,
                next_trade = ?state.next_trade,
                "trade state persisted"
            );
        }

        // The report snapshot carries the updated schedule, like the rest
        // of the record it describes.
        report.state = state.clone();
        report
    }

    fn draw_delay_minutes(&self) -> i64 {
        let mut rng = rand::thread_rng();
        rng.gen_range(self.delay_min_minutes..=self.delay_max_minutes) as i64
    }

    async fn deliver(&self, report: &CycleReport) {
        for notifier in &self.notifiers {
            match notifier.deliver(report).await {
                Ok(()) => info!(notifier = notifier.name(), "report delivered"),
                Err(err) => warn!(
                    notifier = notifier.name(),
                    error = %format!("{err:#}"),
                    "report delivery failed"
                ),
            }
        }
    }
}

async fn sleep_until(at: DateTime<Utc>) {
    let wait = (at - Utc::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO);
    tokio::time::sleep(wait).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use alloy_primitives::{Address, U256};
    use volume_bot_core::config::TradeConfig;
    use volume_bot_core::events::{SwapReceipt, TradeDirection};
    use volume_bot_core::WAD;

    use crate::controller::TradePaths;

    #[test]
    fn future_next_trade_resumes_at_exactly_that_instant() {
        let now = Utc::now();
        let at = now + Duration::minutes(45);
        let state = TradeState {
            next_trade: Some(at),
            ..TradeState::default()
        };
        assert_eq!(resume_action(&state, now), ResumeAction::ResumeAt(at));
    }

    #[test]
    fn absent_or_elapsed_next_trade_fires_immediately() {
        let now = Utc::now();
        assert_eq!(
            resume_action(&TradeState::default(), now),
            ResumeAction::FireNow
        );

        let elapsed = TradeState {
            next_trade: Some(now - Duration::minutes(1)),
            ..TradeState::default()
        };
        assert_eq!(resume_action(&elapsed, now), ResumeAction::FireNow);
    }

    struct HealthyExchange;

    #[async_trait]
    impl ExchangeClient for HealthyExchange {
        fn wallet_address(&self) -> Address {
            Address::ZERO
        }

        async fn native_balance(&self) -> Result<U256> {
            Ok(U256::from(1_000u64) * WAD)
        }

        async fn token_balance(&self, _token: Address) -> Result<U256> {
            Ok(U256::from(1_000u64) * WAD)
        }

        async fn amounts_out(&self, amount_in: U256, _path: &[Address]) -> Result<Vec<U256>> {
            Ok(vec![amount_in, amount_in])
        }

        async fn ensure_allowance(&self, _token: Address, _amount: U256) -> Result<()> {
            Ok(())
        }

        async fn swap(
            &self,
            _direction: TradeDirection,
            _amount_in: U256,
            _amount_out_min: U256,
            _path: &[Address],
            _deadline: u64,
        ) -> Result<SwapReceipt> {
            Ok(SwapReceipt {
                tx_url: "0xabc".to_string(),
                success: true,
            })
        }
    }

    #[derive(Default, Clone)]
    struct MemoryStore {
        state: Arc<Mutex<Option<TradeState>>>,
        fail_saves: Arc<Mutex<bool>>,
        save_attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl StateStore for MemoryStore {
        async fn load(&self) -> Result<Option<TradeState>> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save(&self, state: &TradeState) -> Result<()> {
            self.save_attempts.fetch_add(1, Ordering::SeqCst);
            if *self.fail_saves.lock().unwrap() {
                anyhow::bail!("disk full");
            }
            *self.state.lock().unwrap() = Some(state.clone());
            Ok(())
        }
    }

    fn scheduler(store: MemoryStore) -> Scheduler<HealthyExchange, MemoryStore> {
        let trade = TradeConfig {
            tx_delay_min: 60,
            tx_delay_max: 120,
            min_amount: 0.01,
            buy_amount_mean: 0.1,
            buy_amount_std_dev: 0.02,
            strategy_bias: 0.0,
        };
        let paths = TradePaths::new(Address::ZERO, Address::ZERO, Address::ZERO);
        let controller = TradeCycleController::new(Arc::new(HealthyExchange), trade, paths);
        Scheduler::new(controller, store, Vec::new(), 60, 120)
    }

    #[tokio::test]
    async fn restore_initializes_and_persists_fresh_state() {
        let store = MemoryStore::default();
        let state = scheduler(store.clone()).restore().await.unwrap();
        assert_eq!(state, TradeState::default());
        assert_eq!(store.load().await.unwrap(), Some(TradeState::default()));
    }

    #[tokio::test]
    async fn fire_cycle_increments_count_and_persists_randomized_schedule() {
        let store = MemoryStore::default();
        let mut sched = scheduler(store.clone());
        let mut state = TradeState::default();

        let before = Utc::now();
        let report = sched.fire_cycle(&mut state).await;
        let after = Utc::now();

        assert_eq!(state.trade_count, 1);
        assert!(state.previous_trade.is_some());
        let next = state.next_trade.expect("next trade must be scheduled");
        assert!(next >= before + Duration::minutes(60));
        assert!(next <= after + Duration::minutes(120));

        // Persisted copy and report snapshot both carry the new schedule.
        assert_eq!(store.load().await.unwrap(), Some(state.clone()));
        assert_eq!(report.state, state);
    }

    #[tokio::test]
    async fn persistence_failure_rearms_with_fallback_delay() {
        let store = MemoryStore::default();
        *store.fail_saves.lock().unwrap() = true;
        let mut sched = scheduler(store.clone());
        let mut state = TradeState::default();

        let before = Utc::now();
        sched.fire_cycle(&mut state).await;
        let after = Utc::now();

        assert!(store.save_attempts.load(Ordering::SeqCst) >= 1);
        let next = state.next_trade.expect("fallback schedule must be armed");
        assert!(next >= before + Duration::minutes(FALLBACK_DELAY_MINUTES));
        assert!(next <= after + Duration::minutes(FALLBACK_DELAY_MINUTES));
    }

    #[tokio::test]
    async fn count_parity_flips_direction_across_cycles() {
        let store = MemoryStore::default();
        let mut sched = scheduler(store.clone());
        let mut state = TradeState::default();

        let first = sched.fire_cycle(&mut state).await;
        let second = sched.fire_cycle(&mut state).await;

        let direction = |report: &CycleReport| match &report.outcome {
            volume_bot_core::CycleOutcome::Traded { execution, .. } => execution.direction,
            other => panic!("expected a trade, got {other:?}"),
        };
        assert_eq!(direction(&first), TradeDirection::Buy);
        assert_eq!(direction(&second), TradeDirection::Sell);
        assert_eq!(state.trade_count, 2);
    }
}
