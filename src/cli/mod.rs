//! CLI command implementations

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub mod commands;

/// Log levels accepted by `--log-level`
pub const LOG_LEVELS: [&str; 5] = ["debug", "info", "warning", "error", "critical"];

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Create the CLI application
    pub fn app() -> Command {
        Command::new("conduit")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Manage data-integration plugins and run ELT pipelines")
            .arg(
                Arg::new("project")
                    .long("project")
                    .help("Project directory (default: nearest parent with conduit.yml)")
                    .value_name("DIR")
                    .global(true),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .help("Log level")
                    .value_name("LEVEL")
                    .value_parser(LOG_LEVELS)
                    .default_value("info")
                    .global(true),
            )
            .subcommand(commands::init::command())
            .subcommand(commands::discover::command())
            .subcommand(commands::add::command())
            .subcommand(commands::remove::command())
            .subcommand(commands::list::command())
            .subcommand(commands::profile::command())
            .subcommand(commands::config::command())
            .subcommand(commands::invoke::command())
            .subcommand(commands::elt::command())
            .subcommand(commands::schedule::command())
    }

    /// Run the CLI application
    pub async fn run(matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("init", sub_matches)) => commands::init::run(sub_matches).await,
            Some(("discover", sub_matches)) => commands::discover::run(sub_matches).await,
            Some(("add", sub_matches)) => commands::add::run(sub_matches).await,
            Some(("remove", sub_matches)) => commands::remove::run(sub_matches).await,
            Some(("list", sub_matches)) => commands::list::run(sub_matches).await,
            Some(("profile", sub_matches)) => commands::profile::run(sub_matches).await,
            Some(("config", sub_matches)) => commands::config::run(sub_matches).await,
            Some(("invoke", sub_matches)) => commands::invoke::run(sub_matches).await,
            Some(("elt", sub_matches)) => commands::elt::run(sub_matches).await,
            Some(("schedule", sub_matches)) => commands::schedule::run(sub_matches).await,
            _ => {
                // No subcommand provided, show help
                let _ = Self::app().print_help();
                Ok(())
            }
        }
    }
}

/// Common CLI utilities
pub mod utils {
    use anyhow::{anyhow, Context, Result};
    use clap::ArgMatches;
    use std::path::PathBuf;

    use crate::{Conduit, PluginType, Project};

    /// Directory given with `--project`, else the current directory
    pub fn project_dir(matches: &ArgMatches) -> Result<PathBuf> {
        match matches.get_one::<String>("project") {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => std::env::current_dir().context("Cannot determine the current directory"),
        }
    }

    /// Locate the project the command operates on
    pub fn find_project(matches: &ArgMatches) -> Result<Project> {
        let dir = project_dir(matches)?;
        Ok(Project::find(&dir)?)
    }

    /// Open the project and wire its services
    pub fn open_app(matches: &ArgMatches) -> Result<Conduit> {
        let project = find_project(matches)?;
        Ok(Conduit::open(project)?)
    }

    /// Value of an argument clap already enforces as required
    pub fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
        matches
            .get_one::<String>(name)
            .ok_or_else(|| anyhow!("Missing argument '{}'", name))
    }

    pub fn plugin_type(matches: &ArgMatches, name: &str) -> Result<Option<PluginType>> {
        matches
            .get_one::<String>(name)
            .map(|value| value.parse::<PluginType>())
            .transpose()
            .map_err(Into::into)
    }
}
