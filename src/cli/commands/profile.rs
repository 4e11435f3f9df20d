//! Profile command implementation

use crate::cli::utils;
use crate::Profile;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("profile")
        .about("Manage plugin profiles")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Add a named profile to a plugin")
                .arg(
                    clap::Arg::new("plugin")
                        .help("Plugin name")
                        .value_name("PLUGIN")
                        .required(true),
                )
                .arg(
                    clap::Arg::new("profile")
                        .help("Profile name")
                        .value_name("PROFILE")
                        .required(true),
                )
                .arg(
                    clap::Arg::new("label")
                        .long("label")
                        .help("Display label")
                        .value_name("LABEL"),
                )
                .arg(
                    clap::Arg::new("type")
                        .long("type")
                        .help("Plugin type, when the name is ambiguous")
                        .value_name("TYPE"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List the profiles of a plugin")
                .arg(
                    clap::Arg::new("plugin")
                        .help("Plugin name")
                        .value_name("PLUGIN")
                        .required(true),
                )
                .arg(
                    clap::Arg::new("type")
                        .long("type")
                        .help("Plugin type, when the name is ambiguous")
                        .value_name("TYPE"),
                ),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub_matches)) => add(sub_matches),
        Some(("list", sub_matches)) => list(sub_matches),
        _ => Err(anyhow!("Unknown profile command")),
    }
}

fn add(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let plugin = app.registry().find(
        utils::required(matches, "plugin")?,
        utils::plugin_type(matches, "type")?,
    )?;

    let mut profile = Profile::new(utils::required(matches, "profile")?.as_str());
    profile.label = matches.get_one::<String>("label").cloned();

    app.registry().add_profile(&plugin.plugin_ref(), profile.clone())?;
    println!("Added profile '{}' to {}", profile.name, plugin.plugin_ref());

    Ok(())
}

fn list(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let plugin = app.registry().find(
        utils::required(matches, "plugin")?,
        utils::plugin_type(matches, "type")?,
    )?;

    println!("{} (default)", conduit_plugin::DEFAULT_PROFILE);
    for profile in &plugin.install.profiles {
        match &profile.label {
            Some(label) => println!("{} ({})", profile.name, label),
            None => println!("{}", profile.name),
        }
    }

    Ok(())
}
