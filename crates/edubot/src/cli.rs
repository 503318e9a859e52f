use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "edubot")]
#[command(author, version, about = "Telegram bot for browsing school study materials", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Register the webhook and serve updates (default)
    Run,

    /// Apply pending database migrations and exit
    Migrate,

    /// Replace the study catalog with the contents of a JSON file
    Seed {
        /// Path to the catalog document
        #[arg(short, long)]
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; `run` when none was given.
    pub fn command(&self) -> Commands {
        match &self.command {
            Some(Commands::Seed { file }) => Commands::Seed { file: file.clone() },
            Some(Commands::Migrate) => Commands::Migrate,
            Some(Commands::Run) | None => Commands::Run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["edubot"]).unwrap();
        assert_eq!(cli.command(), Commands::Run);
    }

    #[test]
    fn test_seed_requires_file() {
        assert!(Cli::try_parse_from(["edubot", "seed"]).is_err());

        let cli = Cli::try_parse_from(["edubot", "seed", "--file", "data/catalog.sample.json"]).unwrap();
        assert_eq!(
            cli.command(),
            Commands::Seed {
                file: PathBuf::from("data/catalog.sample.json")
            }
        );
    }
}
