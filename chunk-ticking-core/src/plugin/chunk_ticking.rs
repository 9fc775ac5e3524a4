//! The plugin that switches deduplicated chunk ticking on and off.

use crate::config::TickingConfig;
use crate::plugin::{Plugin, PluginError, PluginMetadata};
use crate::system::TickHook;

/// Owns the [`TickHook`] shared with an
/// [`OptimizedChunkTicking`](crate::system::OptimizedChunkTicking).
///
/// Enabling installs the hook, disabling restores the original system.
pub struct ChunkTickingPlugin {
    hook: TickHook,
    enabled: bool,
}

impl ChunkTickingPlugin {
    /// The name the plugin is registered under.
    pub const NAME: &'static str = "OptimizedChunkTicking";

    /// Creates the plugin. When `enabled` is false, `enable` leaves the
    /// original system in place.
    #[must_use]
    pub fn new(hook: TickHook, enabled: bool) -> Self {
        Self { hook, enabled }
    }

    /// Creates the plugin from the `enabled` flag of `config`.
    #[must_use]
    pub fn from_config(config: &TickingConfig, hook: TickHook) -> Self {
        Self::new(hook, config.enabled)
    }

    /// The hook this plugin controls.
    #[must_use]
    pub fn hook(&self) -> &TickHook {
        &self.hook
    }
}

impl Plugin for ChunkTickingPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: Self::NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            description: "Ticks each chunk near an entity once per step".to_owned(),
        }
    }

    fn load(&self) -> Result<(), PluginError> {
        log::info!("Loading {}...", Self::NAME);
        Ok(())
    }

    fn enable(&self) -> Result<(), PluginError> {
        log::info!("Enabling {}...", Self::NAME);
        if !self.enabled {
            log::info!(
                "{} is disabled in the config, keeping the original system",
                Self::NAME
            );
            return Ok(());
        }
        if !self.hook.install() {
            return Err(PluginError::Hook {
                name: Self::NAME.to_owned(),
                reason: "tick hook is already installed".to_owned(),
            });
        }
        Ok(())
    }

    fn disable(&self) -> Result<(), PluginError> {
        log::info!("Disabling {}...", Self::NAME);
        self.hook.uninstall();
        Ok(())
    }
}
