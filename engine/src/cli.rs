//! CLI interface for Aula
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aula: ask where and when your classes are
///
/// Answers free-text questions ("onde é a aula de Cálculo amanhã de manhã?")
/// from the class schedule database, using a language model to interpret the
/// question.
#[derive(Parser, Debug)]
#[command(name = "aula")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive question session
    Chat,

    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },

    /// List the known subjects
    Subjects,

    /// Write the default configuration and create the database schema
    Setup {
        /// Store this OpenAI API key in the system keychain
        #[arg(long, value_name = "KEY")]
        openai_key: Option<String>,
    },

    /// Run system diagnostics
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        // Test that CLI can be parsed
        let cli = Cli::parse_from(["aula", "doctor"]);
        assert!(matches!(cli.command, Command::Doctor));
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "aula",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/aula.toml",
            "subjects",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/aula.toml")));
        assert!(matches!(cli.command, Command::Subjects));
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from(["aula", "ask", "aula de Cálculo amanhã de manhã", "--json"]);
        if let Command::Ask { question } = cli.command {
            assert_eq!(question, "aula de Cálculo amanhã de manhã");
        } else {
            panic!("Expected Ask command");
        }
        assert!(cli.json);
    }

    #[test]
    fn test_setup_with_key() {
        let cli = Cli::parse_from(["aula", "setup", "--openai-key", "sk-test"]);
        if let Command::Setup { openai_key } = cli.command {
            assert_eq!(openai_key.as_deref(), Some("sk-test"));
        } else {
            panic!("Expected Setup command");
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["aula", "ask"]).is_err());
    }
}
