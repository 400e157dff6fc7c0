/// Maintenance sweeper
///
/// Periodically runs [`EntitlementEngine::run_maintenance`] so that expired
/// sessions and spent reset tokens are purged and elapsed trials are moved to
/// the free plan, even for accounts that never come back to trigger lazy
/// expiry.
///
/// # Example
///
/// ```no_run
/// use brandai_shared::config::EngineConfig;
/// use brandai_shared::engine::EntitlementEngine;
/// use brandai_worker::sweeper::{Sweeper, SweeperConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let engine = Arc::new(EntitlementEngine::builder(EngineConfig::from_env()?).build());
///
/// // The sweeper shares the engine the rest of the process serves requests from
/// let sweeper = Sweeper::new(engine.clone(), SweeperConfig::from_env()?).spawn();
///
/// tokio::signal::ctrl_c().await?;
/// let totals = sweeper.shutdown().await;
/// tracing::info!(sweeps = totals.sweeps, "Sweeper stopped");
/// # Ok(())
/// # }
/// ```

use brandai_shared::engine::{EntitlementEngine, MaintenanceReport};
use std::env;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Sweeper configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweeps
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            interval: Duration::from_secs(60),
        }
    }
}

impl SweeperConfig {
    /// Loads configuration from `BRANDAI_SWEEP_INTERVAL_SECS` (default: 60)
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set but is not a positive integer
    pub fn from_env() -> anyhow::Result<Self> {
        let Ok(raw) = env::var("BRANDAI_SWEEP_INTERVAL_SECS") else {
            return Ok(Self::default());
        };

        let secs: u64 = raw.trim().parse().map_err(|e| {
            anyhow::anyhow!("BRANDAI_SWEEP_INTERVAL_SECS has an invalid value {:?}: {}", raw, e)
        })?;
        if secs == 0 {
            anyhow::bail!("BRANDAI_SWEEP_INTERVAL_SECS must be greater than zero");
        }

        Ok(SweeperConfig {
            interval: Duration::from_secs(secs),
        })
    }
}

/// Totals across all sweeps of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepTotals {
    pub sweeps: u64,
    pub sessions_purged: usize,
    pub trials_expired: usize,
    pub spent_tokens_purged: usize,
}

impl SweepTotals {
    fn add(&mut self, report: &MaintenanceReport) {
        self.sweeps += 1;
        self.sessions_purged += report.sessions_purged;
        self.trials_expired += report.trials_expired;
        self.spent_tokens_purged += report.spent_tokens_purged;
    }
}

/// Runs engine maintenance on a fixed interval until cancelled
pub struct Sweeper {
    engine: Arc<EntitlementEngine>,
    config: SweeperConfig,
    shutdown_token: CancellationToken,
}

impl Sweeper {
    pub fn new(engine: Arc<EntitlementEngine>, config: SweeperConfig) -> Self {
        Sweeper {
            engine,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`Sweeper::run`] when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs a single sweep
    pub fn sweep_once(&self) -> MaintenanceReport {
        let report = self.engine.run_maintenance();

        if report == MaintenanceReport::default() {
            tracing::debug!("Sweep found nothing to do");
        } else {
            tracing::info!(
                sessions_purged = report.sessions_purged,
                trials_expired = report.trials_expired,
                spent_tokens_purged = report.spent_tokens_purged,
                "Sweep completed"
            );
        }

        report
    }

    /// Sweeps immediately, then once per interval, until shutdown
    pub async fn run(&self) -> SweepTotals {
        tracing::info!(interval_secs = self.config.interval.as_secs(), "Sweeper starting");

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut totals = SweepTotals::default();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.sweep_once();
                    totals.add(&report);
                }
            }
        }

        tracing::info!(sweeps = totals.sweeps, "Sweeper shut down");

        totals
    }

    /// Runs the sweeper on its own task alongside the caller's engine
    pub fn spawn(self) -> SweeperHandle {
        let shutdown_token = self.shutdown_token();
        let task = tokio::spawn(async move { self.run().await });

        SweeperHandle {
            shutdown_token,
            task,
        }
    }
}

/// Handle to a spawned [`Sweeper`]
pub struct SweeperHandle {
    shutdown_token: CancellationToken,
    task: JoinHandle<SweepTotals>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the sweeper and waits for its final totals
    pub async fn shutdown(self) -> SweepTotals {
        self.shutdown_token.cancel();

        match self.task.await {
            Ok(totals) => totals,
            Err(e) => {
                tracing::error!(error = %e, "Sweeper task failed");
                SweepTotals::default()
            }
        }
    }
}
