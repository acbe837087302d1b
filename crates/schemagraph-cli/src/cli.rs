//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use crate::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use schemagraph::{Draft, LoaderConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// schemagraph - compile JSON Schemas and validate documents against them
///
/// Schemas may span several files that reference each other through `$id`
/// and `$ref`; pass the extra files with `--ref`.
#[derive(Parser, Debug)]
#[command(
    name = "schemagraph",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SCHEMAGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results [default: human, or the config file value]
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate one or more documents against a schema
    Validate(ValidateArgs),

    /// Compile a schema and check it against its meta-schema
    Check(CheckArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Loader settings shared by `validate` and `check`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct LoaderArgs {
    /// Additional schema file that references may point into (repeatable)
    #[arg(long = "ref", value_name = "FILE")]
    pub refs: Vec<PathBuf>,

    /// Draft for documents without a recognizable `$schema`
    /// (draft-04, draft-06, draft-07, hybrid)
    #[arg(long, value_name = "DRAFT")]
    pub draft: Option<Draft>,

    /// Ignore `$schema` and compile everything under the default draft
    #[arg(long)]
    pub no_auto_detect: bool,

    /// Treat unknown format names as validation failures
    #[arg(long)]
    pub strict_formats: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the schema file (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Documents to validate (JSON or YAML)
    #[arg(value_name = "INSTANCE", required = true)]
    pub instances: Vec<PathBuf>,

    /// Validate every schema document against its meta-schema first
    #[arg(long)]
    pub meta_validate: bool,

    #[command(flatten)]
    pub loader: LoaderArgs,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the schema file (JSON or YAML)
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    #[command(flatten)]
    pub loader: LoaderArgs,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Human-readable formatted output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Output format from the flag, falling back to the config file
    pub fn output_format(&self, config: &Config) -> OutputFormat {
        self.output.unwrap_or(config.output.format)
    }

    /// Check if colored output should be used
    pub fn use_color(&self, config: &Config) -> bool {
        !self.no_color && config.output.color && std::io::stdout().is_terminal()
    }
}

impl LoaderArgs {
    /// Apply the flags on top of the configured loader settings
    pub fn loader_config(&self, base: &LoaderConfig) -> LoaderConfig {
        let mut config = base.clone();
        if let Some(draft) = self.draft {
            config = config.with_default_draft(draft);
        }
        if self.no_auto_detect {
            config = config.with_auto_detect(false);
        }
        if self.strict_formats {
            config = config.with_strict_formats(true);
        }
        config
    }
}

impl ValidateArgs {
    pub fn loader_config(&self, base: &LoaderConfig) -> LoaderConfig {
        let config = self.loader.loader_config(base);
        if self.meta_validate {
            config.with_validate(true)
        } else {
            config
        }
    }
}

impl CheckArgs {
    /// `check` always runs meta-schema validation
    pub fn loader_config(&self, base: &LoaderConfig) -> LoaderConfig {
        self.loader.loader_config(base).with_validate(true)
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
