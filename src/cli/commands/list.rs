//! List command implementation

use crate::cli::utils;
use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("list")
        .about("List installed plugins")
        .arg(
            clap::Arg::new("type")
                .help("Only show plugins of this type")
                .value_name("TYPE"),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let filter = utils::plugin_type(matches, "type")?;
    let plugins = app.registry().list(filter)?;

    if plugins.is_empty() {
        println!("No plugins installed.");
        return Ok(());
    }

    for plugin in &plugins {
        let profiles: Vec<&str> = plugin.profiles.iter().map(|p| p.name.as_str()).collect();
        if profiles.is_empty() {
            println!("{}", plugin.plugin_ref());
        } else {
            println!("{} (profiles: {})", plugin.plugin_ref(), profiles.join(", "));
        }
    }

    Ok(())
}
