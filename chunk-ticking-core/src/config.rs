//! Chunk ticking configuration, loaded from a json5 file.

use std::fmt::{self, Display};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chunk_ticking_utils::DimensionId;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

use crate::range::SimulationRange;

/// The bundled default configuration file.
pub const DEFAULT_CONFIG: &str = include_str!("../../package-content/chunk_ticking.json5");

/// Largest accepted simulation distance, in chunks.
pub const MAX_SIMULATION_DISTANCE: i32 = 32;

/// Slowest accepted tick rate: one step every 1000 seconds.
pub const MIN_TICK_RATE: f32 = 0.001;

/// Fastest accepted tick rate.
pub const MAX_TICK_RATE: f32 = 1000.0;

/// What a simulation distance applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeScope {
    /// The default for every dimension.
    Default,
    /// A single dimension override.
    Dimension(DimensionId),
}

impl Display for RangeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "the default"),
            Self::Dimension(dimension) => write!(f, "{dimension}"),
        }
    }
}

/// Errors produced while loading or validating a [`TickingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("failed to access config file {}: {source}", path.display())]
    Io {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid json5 for this config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json5::Error),
    /// A simulation distance is negative.
    #[error("simulation distance of {scope} must not be negative, got {value}")]
    NegativeRange {
        /// What the distance applies to.
        scope: RangeScope,
        /// The configured value.
        value: i32,
    },
    /// A simulation distance is above [`MAX_SIMULATION_DISTANCE`].
    #[error("simulation distance of {scope} must be at most {max}, got {value}")]
    RangeTooLarge {
        /// What the distance applies to.
        scope: RangeScope,
        /// The configured value.
        value: i32,
        /// The largest accepted value.
        max: i32,
    },
    /// The same dimension has two overrides.
    #[error("{0} has more than one simulation distance override")]
    DuplicateDimension(DimensionId),
    /// The tick rate is outside [`MIN_TICK_RATE`, `MAX_TICK_RATE`].
    #[error(
        "tick rate must be between {min} and {max}, got {0}",
        min = MIN_TICK_RATE,
        max = MAX_TICK_RATE
    )]
    InvalidTickRate(f32),
}

/// A per-dimension simulation distance override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DimensionRange {
    /// The dimension.
    pub id: DimensionId,
    /// Its simulation distance in chunks.
    pub simulation_distance: i32,
}

/// Chunk ticking configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TickingConfig {
    /// Replace the level chunk ticking system when the plugin is enabled.
    pub enabled: bool,
    /// Default simulation distance in chunks.
    pub simulation_distance: i32,
    /// Per-dimension overrides.
    pub dimensions: Vec<DimensionRange>,
    /// Simulation steps per second of the host loop.
    pub tick_rate: f32,
    /// Steps between summary log lines, 0 to disable.
    pub report_interval: u64,
}

impl TickingConfig {
    /// Loads the config at `path`, writing the bundled default there first if
    /// the file does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !path.exists() {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
            fs::write(path, DEFAULT_CONFIG).map_err(io_error)?;
            log::info!("Wrote default chunk ticking config to {}", path.display());
        }

        let config_str = fs::read_to_string(path).map_err(io_error)?;
        Self::parse(&config_str)
    }

    /// Parses and validates a json5 config.
    pub fn parse(config_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json5::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_distance(RangeScope::Default, self.simulation_distance)?;

        let mut seen = FxHashSet::default();
        for dimension in &self.dimensions {
            check_distance(
                RangeScope::Dimension(dimension.id),
                dimension.simulation_distance,
            )?;
            if !seen.insert(dimension.id) {
                return Err(ConfigError::DuplicateDimension(dimension.id));
            }
        }

        if !(MIN_TICK_RATE..=MAX_TICK_RATE).contains(&self.tick_rate) {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        Ok(())
    }

    /// The default simulation range.
    #[must_use]
    pub fn default_range(&self) -> SimulationRange {
        SimulationRange::try_from(self.simulation_distance).unwrap_or_default()
    }

    /// The simulation range of `dimension`, after overrides.
    #[must_use]
    pub fn range_for(&self, dimension: DimensionId) -> SimulationRange {
        self.dimensions
            .iter()
            .find(|d| d.id == dimension)
            .and_then(|d| SimulationRange::try_from(d.simulation_distance).ok())
            .unwrap_or_else(|| self.default_range())
    }

    /// Every dimension override as a validated range.
    pub fn overrides(&self) -> impl Iterator<Item = (DimensionId, SimulationRange)> + '_ {
        self.dimensions.iter().filter_map(|d| {
            SimulationRange::try_from(d.simulation_distance)
                .ok()
                .map(|range| (d.id, range))
        })
    }
}

fn check_distance(scope: RangeScope, value: i32) -> Result<(), ConfigError> {
    if value < 0 {
        return Err(ConfigError::NegativeRange { scope, value });
    }
    if value > MAX_SIMULATION_DISTANCE {
        return Err(ConfigError::RangeTooLarge {
            scope,
            value,
            max: MAX_SIMULATION_DISTANCE,
        });
    }
    Ok(())
}

impl Default for TickingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            simulation_distance: 4,
            dimensions: vec![DimensionRange {
                id: DimensionId::NETHER,
                simulation_distance: 2,
            }],
            tick_rate: 20.0,
            report_interval: 200,
        }
    }
}
