//! The fixed-rate tick loop.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use chunk_ticking_core::{
    ConfigError, OptimizedChunkTicking, StepOutcome, StepReport, TickHook, TickingConfig,
    memory::{MemoryLevel, MemoryLevelService, TickAllLoaded},
    plugin::{ChunkTickingPlugin, PluginManager},
};
use chunk_ticking_utils::DimensionId;
use tokio::{
    select,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use crate::sandbox::Sandbox;

/// Step outcomes accumulated between two summary lines.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Steps recorded.
    pub steps: u64,
    /// Steps the replacement handled.
    pub replaced: u64,
    /// Steps that fell back because no level was active.
    pub fallback: u64,
    /// Steps run by the original system while the hook was off.
    pub inactive: u64,
    /// Sum of the replaced steps' reports.
    pub totals: StepReport,
}

impl Summary {
    /// Adds one step.
    pub fn record(&mut self, outcome: StepOutcome) {
        self.steps += 1;
        match outcome {
            StepOutcome::Inactive => self.inactive += 1,
            StepOutcome::Fallback => self.fallback += 1,
            StepOutcome::Replaced(report) => {
                self.replaced += 1;
                self.totals += report;
            }
        }
    }

    /// Average chunks ticked per replaced step.
    pub fn ticked_per_step(&self) -> f64 {
        if self.replaced == 0 {
            return 0.0;
        }
        self.totals.ticked as f64 / self.replaced as f64
    }
}

/// Builds the level the config describes.
pub fn level_from_config(config: &TickingConfig) -> MemoryLevel {
    config
        .overrides()
        .fold(MemoryLevel::uniform(config.default_range()), |level, (dimension, range)| {
            level.with_range(dimension, range)
        })
}

/// Ticks a [`Sandbox`] through [`OptimizedChunkTicking`] at a fixed rate.
pub struct Host {
    system: OptimizedChunkTicking<TickAllLoaded, MemoryLevelService>,
    sandbox: Sandbox,
    plugins: PluginManager,
    period: Duration,
    report_interval: u64,
    summary: Summary,
}

impl Host {
    /// Builds the sandbox, the ticking system and its plugin.
    pub fn new(config: &TickingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let period = Duration::try_from_secs_f32(1.0 / config.tick_rate)
            .map_err(|_| ConfigError::InvalidTickRate(config.tick_rate))?;

        let mut dimensions = vec![DimensionId::OVERWORLD];
        for (dimension, _) in config.overrides() {
            if !dimensions.contains(&dimension) {
                dimensions.push(dimension);
            }
        }
        let sandbox = Sandbox::new(&dimensions);

        let hook = TickHook::new();
        let system = OptimizedChunkTicking::new(
            TickAllLoaded::new(sandbox.world().clone()),
            MemoryLevelService::new(level_from_config(config)),
            hook.clone(),
        );

        let mut plugins = PluginManager::new();
        plugins.register(Arc::new(ChunkTickingPlugin::from_config(config, hook)));

        Ok(Self {
            system,
            sandbox,
            plugins,
            period,
            report_interval: config.report_interval,
            summary: Summary::default(),
        })
    }

    /// Runs one simulation step.
    pub fn step(&mut self) -> StepOutcome {
        self.sandbox.advance();
        let outcome = self.system.tick_step(self.sandbox.registry_mut());
        self.summary.record(outcome);

        if self.report_interval > 0 && self.summary.steps >= self.report_interval {
            let summary = mem::take(&mut self.summary);
            log::info!(
                "{} steps: {} replaced, {} fallback, {} inactive, {:.1} chunks/step ({})",
                summary.steps,
                summary.replaced,
                summary.fallback,
                summary.inactive,
                summary.ticked_per_step(),
                summary.totals
            );
        }
        outcome
    }

    /// Loads and enables the plugins, ticks until `cancel_token` fires, then
    /// disables them again.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        self.plugins.load_all();
        self.plugins.enable_all();
        log::info!("Ticking every {:?}", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            select! {
                () = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.step();
                }
            }
        }

        self.plugins.disable_all();
        log::info!(
            "Stopped, original chunk ticking ran {} time(s)",
            self.system.original().calls()
        );
    }

    /// The plugin manager.
    pub fn plugins_mut(&mut self) -> &mut PluginManager {
        &mut self.plugins
    }
}
