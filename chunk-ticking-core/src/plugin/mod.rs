//! Plugin lifecycle and management.
//!
//! Plugins are registered with a [`PluginManager`], which drives them through
//! load, enable and disable and keeps track of where each one is.

use std::fmt::{self, Display};
use std::sync::Arc;

use thiserror::Error;

pub mod chunk_ticking;

pub use chunk_ticking::ChunkTickingPlugin;

/// Plugin metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    /// The name of the plugin.
    pub name: String,
    /// The version of the plugin.
    pub version: String,
    /// A description of the plugin.
    pub description: String,
}

/// Errors produced by plugin lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// No plugin with this name is registered.
    #[error("plugin '{0}' is not registered")]
    Unknown(String),
    /// `load` was called twice.
    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),
    /// `enable` was called before `load`.
    #[error("plugin '{0}' is not loaded")]
    NotLoaded(String),
    /// `enable` was called on an enabled plugin.
    #[error("plugin '{0}' is already enabled")]
    AlreadyEnabled(String),
    /// `disable` was called on a plugin that is not enabled.
    #[error("plugin '{0}' is not enabled")]
    NotEnabled(String),
    /// The plugin's own hook failed.
    #[error("plugin '{name}' failed: {reason}")]
    Hook {
        /// The plugin name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// A plugin hosted by a [`PluginManager`].
///
/// Hooks take `&self`; plugins that need to change state use interior
/// mutability so they can be shared with the systems they control.
pub trait Plugin: Send + Sync {
    /// Returns the plugin metadata.
    fn metadata(&self) -> PluginMetadata;

    /// Called once after registration.
    fn load(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when the plugin is switched on.
    fn enable(&self) -> Result<(), PluginError>;

    /// Called when the plugin is switched off.
    fn disable(&self) -> Result<(), PluginError>;
}

/// Where a plugin is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Registered, not loaded yet.
    Registered,
    /// Loaded, never enabled.
    Loaded,
    /// Enabled.
    Enabled,
    /// Disabled after having been enabled.
    Disabled,
}

impl Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registered => "registered",
            Self::Loaded => "loaded",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        })
    }
}

/// A registered plugin.
pub struct LoadedPlugin {
    /// The plugin metadata.
    pub metadata: PluginMetadata,
    /// The current lifecycle state.
    pub state: PluginState,
    plugin: Arc<dyn Plugin>,
}

/// Manages registered plugins.
pub struct PluginManager {
    /// List of registered plugins, in registration order.
    pub plugins: Vec<LoadedPlugin>,
}

impl PluginManager {
    /// Creates a new empty plugin manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Registers a plugin.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        let metadata = plugin.metadata();
        log::info!(
            "Plugin '{}' v{}: {}",
            metadata.name,
            metadata.version,
            metadata.description
        );
        self.plugins.push(LoadedPlugin {
            metadata,
            state: PluginState::Registered,
            plugin,
        });
    }

    /// Returns the state of the plugin called `name`.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.plugins
            .iter()
            .find(|p| p.metadata.name == name)
            .map(|p| p.state)
    }

    /// Loads the plugin called `name`.
    pub fn load(&mut self, name: &str) -> Result<(), PluginError> {
        let entry = self.find_mut(name)?;
        if entry.state != PluginState::Registered {
            return Err(PluginError::AlreadyLoaded(entry.metadata.name.clone()));
        }
        entry.plugin.load()?;
        entry.state = PluginState::Loaded;
        log::debug!("Plugin '{name}' loaded");
        Ok(())
    }

    /// Enables the plugin called `name`.
    pub fn enable(&mut self, name: &str) -> Result<(), PluginError> {
        let entry = self.find_mut(name)?;
        match entry.state {
            PluginState::Registered => {
                return Err(PluginError::NotLoaded(entry.metadata.name.clone()));
            }
            PluginState::Enabled => {
                return Err(PluginError::AlreadyEnabled(entry.metadata.name.clone()));
            }
            PluginState::Loaded | PluginState::Disabled => {}
        }
        entry.plugin.enable()?;
        entry.state = PluginState::Enabled;
        log::debug!("Plugin '{name}' enabled");
        Ok(())
    }

    /// Disables the plugin called `name`.
    pub fn disable(&mut self, name: &str) -> Result<(), PluginError> {
        let entry = self.find_mut(name)?;
        if entry.state != PluginState::Enabled {
            return Err(PluginError::NotEnabled(entry.metadata.name.clone()));
        }
        entry.plugin.disable()?;
        entry.state = PluginState::Disabled;
        log::debug!("Plugin '{name}' disabled");
        Ok(())
    }

    /// Loads every registered plugin. Failures are logged and skipped.
    ///
    /// Returns the number of plugins that loaded.
    pub fn load_all(&mut self) -> usize {
        self.transition_all(PluginState::Registered, Self::load)
    }

    /// Enables every loaded or disabled plugin. Failures are logged and skipped.
    pub fn enable_all(&mut self) -> usize {
        let mut enabled = self.transition_all(PluginState::Loaded, Self::enable);
        enabled += self.transition_all(PluginState::Disabled, Self::enable);
        enabled
    }

    /// Disables every enabled plugin, last registered first. Failures are
    /// logged and skipped.
    pub fn disable_all(&mut self) -> usize {
        let names: Vec<String> = self
            .plugins
            .iter()
            .rev()
            .filter(|p| p.state == PluginState::Enabled)
            .map(|p| p.metadata.name.clone())
            .collect();
        self.run_all(names, Self::disable)
    }

    fn transition_all(
        &mut self,
        from: PluginState,
        transition: fn(&mut Self, &str) -> Result<(), PluginError>,
    ) -> usize {
        let names: Vec<String> = self
            .plugins
            .iter()
            .filter(|p| p.state == from)
            .map(|p| p.metadata.name.clone())
            .collect();
        self.run_all(names, transition)
    }

    fn run_all(
        &mut self,
        names: Vec<String>,
        transition: fn(&mut Self, &str) -> Result<(), PluginError>,
    ) -> usize {
        let mut done = 0;
        for name in names {
            match transition(self, &name) {
                Ok(()) => done += 1,
                Err(e) => log::error!("{e}"),
            }
        }
        done
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut LoadedPlugin, PluginError> {
        self.plugins
            .iter_mut()
            .find(|p| p.metadata.name == name)
            .ok_or_else(|| PluginError::Unknown(name.to_owned()))
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
