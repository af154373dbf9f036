mod cli;

use anyhow::Context;
use macroconf::{Store, Value};
use std::path::Path;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("MACROCONF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{err}", cwd.display());
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match &cli.command {
        cli::Command::Show(show_cli) => show(&cli, show_cli),
        cli::Command::List(list_cli) => list(&cli, list_cli),
        cli::Command::Dev(dev_cli) => dev(&cli, dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn load(config: &Path) -> anyhow::Result<Store> {
    Store::default()
        .parse(config)
        .with_context(|| format!("Failed to load configuration {}", config.display()))
}

pub fn show(cli: &cli::Cli, show_cli: &cli::ShowCommand) -> anyhow::Result<()> {
    let store = load(&cli.config)?;

    let (group, name) = macroconf::ini::split_header(&show_cli.section);
    let effective = store.effective(group, name, show_cli.overrides.iter().cloned())?;

    if show_cli.annotate {
        for (key, origin) in effective.section().origins() {
            match origin {
                Some(origin) => println!("{key}: {origin}"),
                None => println!("{key}: <override>"),
            }
        }
        return Ok(());
    }

    output(&cli.format, &effective.to_value()?)
}

pub fn list(cli: &cli::Cli, list_cli: &cli::ListCommand) -> anyhow::Result<()> {
    let store = load(&cli.config)?;

    let groups: Vec<&str> = match &list_cli.group {
        Some(group) => vec![group.as_str()],
        None => store.groups().collect(),
    };

    for group in groups {
        for section in store.sections(group) {
            println!("{}", section.borrow().id());
        }
    }

    Ok(())
}

fn output(format: &cli::OutputFormat, value: &Value) -> anyhow::Result<()> {
    match format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (macroconf-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: &cli::Cli, dev_cli: &cli::DevCommand) -> anyhow::Result<()> {
    let store = load(&cli.config)?;

    match dev_cli.command {
        cli::DevSubCommand::Sources => {
            for file in store.files() {
                println!("{}", file.display());
            }
        }
        cli::DevSubCommand::Store => println!("{store:#?}"),
    }

    Ok(())
}
