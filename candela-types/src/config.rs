//! Configuration types shared across the engine and the facade.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Merge policy for a streaming candle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Drop live records whose period start is earlier than the window's
    /// currently open period instead of appending them.
    ///
    /// Off by default: every record with a new period start is appended.
    pub drop_out_of_order: bool,
}

/// Behavior of the live feed that pumps transport pushes into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// How long `stop()` waits for the transport to unsubscribe gracefully
    /// before aborting its task.
    pub stop_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Global configuration for the `Candela` facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandelaConfig {
    /// Window merge policy applied to every series.
    pub window: WindowConfig,
    /// Live feed behavior.
    pub feed: FeedConfig,
    /// Snapshot length used when a series is opened without an explicit limit.
    pub snapshot_limit: usize,
}

impl Default for CandelaConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            feed: FeedConfig::default(),
            snapshot_limit: 500,
        }
    }
}
