use clap::{CommandFactory, Parser, Subcommand};

use std::path::PathBuf;

use super::config::BackendKind;
use super::constants::{
    ENV_BACKEND, ENV_BACKEND_TIMEOUT, ENV_BACKEND_TOKEN, ENV_BACKEND_URL, ENV_CONFIG,
    ENV_DEBOUNCE_MS, ENV_GROUP_IDS, ENV_MEMORY_CATALOG, ENV_MEMORY_PROFILES,
};
use crate::domain::filters::{FilterContext, GroupIdPolicy};

#[derive(Parser)]
#[command(name = "audience")]
#[command(version, about = "Audience filter builder console", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Audience backend (http or memory)
    #[arg(long, global = true, env = ENV_BACKEND, value_parser = parse_backend_kind)]
    pub backend: Option<BackendKind>,

    /// Audience service base URL (http backend)
    #[arg(long, global = true, env = ENV_BACKEND_URL)]
    pub backend_url: Option<String>,

    /// Bearer token sent to the audience service
    #[arg(long, global = true, env = ENV_BACKEND_TOKEN, hide_env_values = true)]
    pub backend_token: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = ENV_BACKEND_TIMEOUT)]
    pub timeout: Option<u64>,

    /// Catalog JSON file (memory backend)
    #[arg(long, global = true, env = ENV_MEMORY_CATALOG)]
    pub catalog_file: Option<String>,

    /// Profiles JSON file used for estimates (memory backend)
    #[arg(long, global = true, env = ENV_MEMORY_PROFILES)]
    pub profiles_file: Option<String>,

    /// Estimate debounce window in milliseconds
    #[arg(long, global = true, env = ENV_DEBOUNCE_MS)]
    pub debounce_ms: Option<u64>,

    /// Group id policy (positional or monotonic)
    #[arg(long, global = true, env = ENV_GROUP_IDS, value_parser = parse_group_id_policy)]
    pub group_ids: Option<GroupIdPolicy>,
}

/// Parse backend kind from CLI/env string
fn parse_backend_kind(s: &str) -> Result<BackendKind, String> {
    match s.to_lowercase().as_str() {
        "http" => Ok(BackendKind::Http),
        "memory" => Ok(BackendKind::Memory),
        _ => Err(format!(
            "Invalid backend '{}'. Valid options: http, memory",
            s
        )),
    }
}

/// Parse group id policy from CLI/env string
fn parse_group_id_policy(s: &str) -> Result<GroupIdPolicy, String> {
    s.parse()
}

/// Parse filter context from CLI string (filter or trigger)
fn parse_context(s: &str) -> Result<FilterContext, String> {
    s.parse()
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List catalog fields available in a context
    Catalog {
        /// Context to list (filter or trigger)
        #[arg(long, default_value = "filter", value_parser = parse_context)]
        context: FilterContext,

        /// Only fields whose label contains this term
        #[arg(long)]
        search: Option<String>,
    },
    /// Custom criteria block commands
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },
    /// Build a filter definition and run the save validation
    Validate {
        /// Filter definition file
        path: PathBuf,

        /// Validate as an edit of an existing filter
        #[arg(long)]
        edit: bool,
    },
    /// Build a filter definition and print its estimated audience
    Estimate {
        /// Filter definition file
        path: PathBuf,
    },
    /// Build a filter definition and save it
    Save {
        /// Filter definition file
        path: PathBuf,

        /// Save as a draft (relaxed validation)
        #[arg(long)]
        draft: bool,

        /// Update an existing filter instead of creating one
        #[arg(long)]
        edit: Option<String>,
    },
    /// Load a saved filter and print its expression
    Show {
        /// Saved filter id
        id: String,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum FieldCommands {
    /// Register a custom criteria block
    Create {
        /// Block name
        #[arg(long, default_value = "")]
        label: String,

        /// Data type (string, number or date)
        #[arg(long = "type", default_value = "")]
        data_type: String,

        /// Operator offered for the block
        #[arg(long, default_value = "")]
        operator: String,

        /// Context the block belongs to (filter or trigger)
        #[arg(long, default_value = "filter", value_parser = parse_context)]
        context: FilterContext,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub backend_url: Option<String>,
    pub backend_token: Option<String>,
    pub timeout: Option<u64>,
    pub catalog_file: Option<String>,
    pub profiles_file: Option<String>,
    pub debounce_ms: Option<u64>,
    pub group_ids: Option<GroupIdPolicy>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config: cli.config,
            backend: cli.backend,
            backend_url: cli.backend_url,
            backend_token: cli.backend_token,
            timeout: cli.timeout,
            catalog_file: cli.catalog_file,
            profiles_file: cli.profiles_file,
            debounce_ms: cli.debounce_ms,
            group_ids: cli.group_ids,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (CliConfig::from(cli), command)
}

/// Print top-level usage
pub fn print_help() -> std::io::Result<()> {
    Cli::command().print_help()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "audience",
            "estimate",
            "segment.json",
            "--backend",
            "memory",
            "--group-ids",
            "monotonic",
            "--debounce-ms",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(BackendKind::Memory));
        assert_eq!(cli.group_ids, Some(GroupIdPolicy::Monotonic));
        assert_eq!(cli.debounce_ms, Some(50));
        match cli.command {
            Some(Commands::Estimate { path }) => assert_eq!(path, PathBuf::from("segment.json")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_field_create() {
        let cli = Cli::try_parse_from([
            "audience",
            "field",
            "create",
            "--label",
            "Loyalty Tier",
            "--type",
            "string",
            "--operator",
            "equals",
            "--context",
            "trigger",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Field {
                command:
                    FieldCommands::Create {
                        label,
                        data_type,
                        operator,
                        context,
                    },
            }) => {
                assert_eq!(label, "Loyalty Tier");
                assert_eq!(data_type, "string");
                assert_eq!(operator, "equals");
                assert_eq!(context, FilterContext::TriggerFilters);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_backend_rejected() {
        assert!(Cli::try_parse_from(["audience", "--backend", "redis", "catalog"]).is_err());
        assert_eq!(parse_backend_kind("HTTP"), Ok(BackendKind::Http));
    }

    #[test]
    fn test_save_flags() {
        let cli =
            Cli::try_parse_from(["audience", "save", "f.json", "--draft", "--edit", "abc"]).unwrap();
        match cli.command {
            Some(Commands::Save { path, draft, edit }) => {
                assert_eq!(path, PathBuf::from("f.json"));
                assert!(draft);
                assert_eq!(edit.as_deref(), Some("abc"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
