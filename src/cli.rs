//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for Stellari.

use clap::{Args, Parser, Subcommand};

/// Stellari - AI persona builder
///
/// Pick an industry template, answer a few questions, and generate system
/// instructions for an AI assistant. Personas are stored with a full version
/// history in a hosted database.
#[derive(Parser, Debug)]
#[command(name = "stellari")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "STELLARI_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// List the industry templates
    Industries,

    /// Show the questions for an industry, including generated follow-ups
    Questions {
        /// Industry id or name (e.g. fitness, "Real Estate")
        #[arg(short, long)]
        industry: String,

        /// Answer a question: --set field=value (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_val)]
        set: Vec<(String, String)>,
    },

    /// Generate instructions without saving anything
    Draft {
        /// Industry id or name
        #[arg(short, long)]
        industry: String,

        #[command(flatten)]
        form: FormArgs,

        /// Write the markdown export to this file instead of printing instructions
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Saved persona management
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },
}

/// Form answers shared by the commands that fill a persona form
#[derive(Args, Debug, Clone, Default)]
pub struct FormArgs {
    /// Answer a question: --set field=value (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_val)]
    pub set: Vec<(String, String)>,

    /// Ask the generator for follow-up questions before submitting
    #[arg(long)]
    pub more_questions: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List saved personas, most recently updated first
    List,

    /// Show a persona and its current instructions
    Show {
        id: String,
    },

    /// Show the persona published under a share token
    Shared {
        token: String,
    },

    /// Create and save a new persona
    Create {
        /// Industry id or name
        #[arg(short, long)]
        industry: String,

        #[command(flatten)]
        form: FormArgs,

        /// Use this file's contents as the instructions instead of generated text
        #[arg(long)]
        instructions_file: Option<String>,
    },

    /// Edit a persona, saving the result as a new version
    Edit {
        id: String,

        /// Switch the persona to another industry
        #[arg(short, long)]
        industry: Option<String>,

        #[command(flatten)]
        form: FormArgs,

        /// Use this file's contents as the instructions instead of generated text
        #[arg(long)]
        instructions_file: Option<String>,
    },

    /// Delete a persona and all of its versions
    Delete {
        id: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Generate a share token for a persona
    Share {
        id: String,
    },

    /// Restore an earlier version by saving a copy of it as the newest version
    Rollback {
        id: String,

        #[arg(id = "target_version", value_name = "VERSION")]
        version: u32,
    },

    /// Export a persona as markdown
    Export {
        id: String,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List a persona's versions, newest first
    History {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration (secrets redacted)
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

/// Parse `field=value`
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
