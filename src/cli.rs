use clap::{Parser, Subcommand};
use clap_complete::Shell;
use reconcile::{EntityKind, OverwritePolicy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "intune-import")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Import exported Intune configuration into a tenant", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/intune-import/config.toml)
    #[arg(long, global = true, env = "INTUNE_IMPORT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import exported configuration documents
    Import(ImportArgs),

    /// Show the kind of each document without contacting the tenant
    Classify {
        /// JSON file or directory of JSON files
        path: PathBuf,
    },

    /// List objects that already exist in the tenant
    Inventory {
        /// Only list one kind (see `kinds`)
        #[arg(short, long)]
        kind: Option<EntityKind>,
    },

    /// List supported configuration kinds
    Kinds,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Import
// ============================================================================

#[derive(Parser)]
pub struct ImportArgs {
    /// JSON file or directory of JSON files (searched recursively)
    pub path: PathBuf,

    /// How to treat objects that already exist: discard, import-as-duplicate,
    /// overwrite-by-id, overwrite-by-name
    #[arg(short, long)]
    pub policy: Option<OverwritePolicy>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Read the tenant but do not create or update anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt for overwrite policies
    #[arg(short, long)]
    pub yes: bool,

    /// Write a JSON report of the run
    #[arg(long)]
    pub report: Option<PathBuf>,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "intune-import",
            "-vv",
            "import",
            "exports/",
            "--policy",
            "overwrite-by-name",
            "-j",
            "4",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Import(args) => {
                assert_eq!(args.path, PathBuf::from("exports/"));
                assert_eq!(args.policy, Some(OverwritePolicy::OverwriteByName));
                assert_eq!(args.jobs, Some(4));
                assert!(args.dry_run);
                assert!(!args.yes);
            }
            _ => panic!("Expected import command"),
        }
    }

    #[test]
    fn test_parse_inventory_kind() {
        let cli = Cli::try_parse_from(["intune-import", "inventory", "--kind", "scope-tag"]).unwrap();
        match cli.command {
            Command::Inventory { kind } => assert_eq!(kind, Some(EntityKind::ScopeTag)),
            _ => panic!("Expected inventory command"),
        }
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(
            Cli::try_parse_from(["intune-import", "import", "x.json", "--policy", "replace"])
                .is_err()
        );
    }
}
