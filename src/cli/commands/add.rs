//! Add command implementation

use crate::cli::utils;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("add")
        .about("Install a catalog plugin into the project")
        .arg(
            clap::Arg::new("type")
                .help(
                    "Plugin type (extractor, loader, transform, model, dashboard, \
                     orchestrator, transformer)",
                )
                .value_name("TYPE")
                .required(true),
        )
        .arg(
            clap::Arg::new("name")
                .help("Plugin name")
                .value_name("NAME")
                .required(true),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let plugin_type = utils::plugin_type(matches, "type")?
        .ok_or_else(|| anyhow!("Missing plugin type"))?;
    let name = utils::required(matches, "name")?;

    let install = app.add_plugin(plugin_type, name)?;

    println!("Added {}", install.plugin_ref());
    if let Some(pip_url) = &install.pip_url {
        println!("Install its package with: pip install {}", pip_url);
    }

    Ok(())
}
