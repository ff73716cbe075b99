use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Find indexer results that are byte-identical to torrents you already seed.
#[derive(Debug, Parser)]
#[command(name = "seedmatch", version, about)]
pub struct Cli {
    /// Configuration file; defaults plus SEEDMATCH_* environment if absent
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Assess a batch of searchees against their search results
    Assess {
        /// Batch file (JSON) with searchees, candidates and owned info hashes
        input: PathBuf,

        /// Do not pause between searchees
        #[arg(long)]
        no_delay: bool,
    },

    /// Show decision cache statistics
    Stats,

    /// Write the decision cache as a JSON document to stdout
    Export,

    /// Import a decision cache JSON document (existing entries are kept)
    Import {
        /// Document to import
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assess() {
        let cli = Cli::parse_from(["seedmatch", "assess", "batch.json", "--no-delay"]);
        match cli.command {
            Command::Assess { input, no_delay } => {
                assert_eq!(input, PathBuf::from("batch.json"));
                assert!(no_delay);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["seedmatch", "stats", "--config", "/etc/seedmatch.toml", "--json"]);
        assert!(matches!(cli.command, Command::Stats));
        assert_eq!(cli.config, PathBuf::from("/etc/seedmatch.toml"));
        assert!(cli.json);
    }

    #[test]
    fn test_import_requires_file() {
        assert!(Cli::try_parse_from(["seedmatch", "import"]).is_err());
    }
}
