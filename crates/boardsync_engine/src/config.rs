//! Configuration for sync runs.

use boardsync_core::{ChangeDetection, ReconcileOptions, StalePolicy};
use std::time::Duration;

/// Default pause between two destination writes.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(350);

/// Configuration for one sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Change detection and stale policy.
    pub reconcile: ReconcileOptions,
    /// Pause between consecutive writes.
    pub write_interval: Duration,
    /// Whether an empty listing may mark every record stale.
    pub allow_empty_source: bool,
    /// Plan only; nothing is written.
    pub dry_run: bool,
    /// Whether updates also replace the page body.
    pub replace_content: bool,
}

impl EngineConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            reconcile: ReconcileOptions::default(),
            write_interval: DEFAULT_WRITE_INTERVAL,
            allow_empty_source: false,
            dry_run: false,
            replace_content: true,
        }
    }

    /// Sets the change-detection field set.
    pub fn with_detection(mut self, detect: ChangeDetection) -> Self {
        self.reconcile.detect = detect;
        self
    }

    /// Sets the stale policy.
    pub fn with_stale_policy(mut self, stale: StalePolicy) -> Self {
        self.reconcile.stale = stale;
        self
    }

    /// Sets the pause between writes.
    pub fn with_write_interval(mut self, interval: Duration) -> Self {
        self.write_interval = interval;
        self
    }

    /// Allows an empty listing to proceed.
    pub fn with_allow_empty_source(mut self, allow: bool) -> Self {
        self.allow_empty_source = allow;
        self
    }

    /// Enables or disables dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets whether updates replace the page body.
    pub fn with_replace_content(mut self, replace: bool) -> Self {
        self.replace_content = replace;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_core::Field;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.write_interval, Duration::from_millis(350));
        assert!(!config.allow_empty_source);
        assert!(!config.dry_run);
        assert!(config.replace_content);
        assert!(!config.reconcile.stale.clear_on_reappear);
    }

    #[test]
    fn builders() {
        let config = EngineConfig::new()
            .with_detection(ChangeDetection::all_tracked())
            .with_stale_policy(StalePolicy::default().with_clear_on_reappear(true))
            .with_write_interval(Duration::ZERO)
            .with_allow_empty_source(true)
            .with_dry_run(true)
            .with_replace_content(false);
        assert!(config.reconcile.detect.fields().contains(&Field::Location));
        assert!(config.reconcile.stale.clear_on_reappear);
        assert_eq!(config.write_interval, Duration::ZERO);
        assert!(config.allow_empty_source);
        assert!(config.dry_run);
        assert!(!config.replace_content);
    }
}
