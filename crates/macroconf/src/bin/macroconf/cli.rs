//! macroconf cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; macroconf ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    /// Configuration file to load, relative to the work directory
    #[clap(
        short = 'c',
        long = "config",
        global(true),
        default_value = "etc/macroconf.conf"
    )]
    pub config: PathBuf,

    #[arg(short = 'F', long = "output-format", global(true), default_value_t)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the massaged values of a section
    Show(ShowCommand),

    /// List sections as group:name
    #[command(alias = "ls")]
    List(ListCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct ShowCommand {
    /// Section to show, `name` alone refers to the global group
    pub section: String,

    /// Override a value for this invocation only
    #[clap(short = 'o', long = "override", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,

    /// Print where each value was defined instead of the values
    #[clap(long)]
    pub annotate: bool,
}

#[derive(Parser, Debug)]
pub struct ListCommand {
    /// Only list sections of this group
    pub group: Option<String>,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Loaded files, weakest first
    Sources,
    Store,
}

fn parse_override(value: &str) -> Result<(String, String), String> {
    let (key, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, found '{value}'"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err("override key must not be empty".to_string());
    }

    Ok((key.to_string(), value.trim().to_string()))
}
