//! Remove command implementation

use crate::cli::utils;
use crate::PluginRef;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("remove")
        .about("Uninstall a plugin from the project")
        .arg(
            clap::Arg::new("type")
                .help("Plugin type")
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

    let removed = app.remove_plugin(&PluginRef::new(plugin_type, name.as_str()))?;
    println!("Removed {}", removed.plugin_ref());

    Ok(())
}
