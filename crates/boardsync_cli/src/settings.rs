//! Resolved configuration and wiring of the production engine.

use crate::SyncArgs;
use boardsync_client::{
    ApiToken, ClientConfig, ClientError, NotionConfig, NotionStore, PropertySchema, UreqTransport,
};
use boardsync_core::{ChangeDetection, StalePolicy};
use boardsync_engine::{EngineConfig, EngineError, SyncEngine};
use boardsync_source::{GreenhouseConfig, GreenhouseSource};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// The engine as wired for live runs.
pub type LiveEngine = SyncEngine<GreenhouseSource<UreqTransport>, NotionStore<UreqTransport>>;

/// Errors reported by the CLI.
#[derive(Error, Debug)]
pub enum CliError {
    /// A required setting was not given.
    #[error("{name} is required (pass {flag} or set {env})")]
    MissingConfig {
        /// Setting name.
        name: &'static str,
        /// Command-line flag.
        flag: &'static str,
        /// Environment variable.
        env: &'static str,
    },

    /// The run aborted.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A direct API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The report could not be serialized.
    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),

    /// The database lacks mapped properties.
    #[error("database is missing properties: {}", missing.join(", "))]
    IncompleteDatabase {
        /// Missing property names.
        missing: Vec<String>,
    },
}

/// Settings shared by every command that talks to the APIs.
#[derive(Debug)]
pub struct Settings {
    /// Notion integration token.
    pub token: ApiToken,
    /// Target database id.
    pub database_id: String,
    /// Greenhouse board token.
    pub board: String,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Settings {
    /// Validates the global options.
    pub fn resolve(
        token: Option<String>,
        database_id: Option<String>,
        board: String,
    ) -> Result<Self, CliError> {
        let token = required(token).ok_or(CliError::MissingConfig {
            name: "Notion token",
            flag: "--notion-token",
            env: "NOTION_API_KEY",
        })?;
        let database_id = required(database_id).ok_or(CliError::MissingConfig {
            name: "Notion database id",
            flag: "--database-id",
            env: "NOTION_DATABASE_ID",
        })?;
        Ok(Self {
            token: ApiToken::new(token),
            database_id,
            board,
        })
    }

    /// Builds the Notion store, loading a property schema if given.
    pub fn store(&self, schema: Option<&Path>) -> Result<NotionStore<UreqTransport>, CliError> {
        let client_config = ClientConfig::default();
        let mut config = NotionConfig::new(self.token.clone(), self.database_id.clone());
        if let Some(path) = schema {
            config = config.with_schema(PropertySchema::load(path)?);
        }
        Ok(NotionStore::new(
            UreqTransport::new(&client_config),
            client_config,
            config,
        ))
    }

    /// Builds the Greenhouse source.
    pub fn source(&self, listing_only: bool) -> GreenhouseSource<UreqTransport> {
        let client_config = ClientConfig::default();
        let mut config = GreenhouseConfig::new(self.board.clone());
        if listing_only {
            config = config.listing_only();
        }
        GreenhouseSource::new(UreqTransport::new(&client_config), client_config, config)
    }

    /// Builds the engine for `sync` and `plan`.
    pub fn engine(&self, args: &SyncArgs, dry_run: bool) -> Result<LiveEngine, CliError> {
        let store = self.store(args.schema.as_deref())?;
        let source = self.source(args.listing_only);
        Ok(SyncEngine::new(engine_config(args, dry_run), source, store))
    }
}

/// Maps command options onto the engine configuration.
pub fn engine_config(args: &SyncArgs, dry_run: bool) -> EngineConfig {
    let detection = if args.detect_all_fields {
        ChangeDetection::all_tracked()
    } else {
        ChangeDetection::default()
    };
    EngineConfig::new()
        .with_detection(detection)
        .with_stale_policy(StalePolicy::default().with_clear_on_reappear(args.clear_stale_on_reappear))
        .with_write_interval(Duration::from_millis(args.write_interval_ms))
        .with_allow_empty_source(args.allow_empty)
        .with_dry_run(dry_run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputFormat;
    use boardsync_core::Field;

    fn args() -> SyncArgs {
        SyncArgs {
            listing_only: false,
            allow_empty: false,
            clear_stale_on_reappear: false,
            detect_all_fields: false,
            write_interval_ms: 350,
            schema: None,
            format: OutputFormat::Text,
        }
    }

    #[test]
    fn missing_token_is_reported() {
        let err = Settings::resolve(None, Some("db".into()), "board".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Notion token is required (pass --notion-token or set NOTION_API_KEY)"
        );
        let err = Settings::resolve(Some("  ".into()), Some("db".into()), "board".into()).unwrap_err();
        assert!(matches!(err, CliError::MissingConfig { env: "NOTION_API_KEY", .. }));
    }

    #[test]
    fn missing_database_is_reported() {
        let err = Settings::resolve(Some("secret".into()), None, "board".into()).unwrap_err();
        assert!(err.to_string().contains("NOTION_DATABASE_ID"));
    }

    #[test]
    fn token_is_not_printed() {
        let settings =
            Settings::resolve(Some("secret_abc".into()), Some("db".into()), "board".into()).unwrap();
        assert!(!format!("{settings:?}").contains("secret_abc"));
        assert_eq!(settings.token.expose(), "secret_abc");
    }

    #[test]
    fn options_map_onto_engine_config() {
        let config = engine_config(&args(), false);
        assert_eq!(config.write_interval, Duration::from_millis(350));
        assert!(!config.dry_run);
        assert_eq!(config.reconcile.detect, ChangeDetection::default());

        let mut custom = args();
        custom.detect_all_fields = true;
        custom.clear_stale_on_reappear = true;
        custom.allow_empty = true;
        custom.write_interval_ms = 0;
        let config = engine_config(&custom, true);
        assert!(config.dry_run);
        assert!(config.allow_empty_source);
        assert!(config.reconcile.stale.clear_on_reappear);
        assert!(config.reconcile.detect.fields().contains(&Field::Department));
        assert!(config.write_interval.is_zero());
    }

    #[test]
    fn schema_file_errors_surface() {
        let settings =
            Settings::resolve(Some("secret".into()), Some("db".into()), "board".into()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(settings.store(Some(&path)), Err(CliError::Client(_))));
    }
}
