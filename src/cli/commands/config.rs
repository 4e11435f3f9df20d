//! Config command implementation

use crate::cli::utils;
use crate::{ResolvedPlugin, SettingSource};
use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("config")
        .about("Show or change the settings of a plugin")
        .arg(
            clap::Arg::new("plugin")
                .help("Plugin name, optionally NAME@PROFILE")
                .value_name("PLUGIN")
                .required(true),
        )
        .arg(
            clap::Arg::new("type")
                .long("type")
                .help("Plugin type, when the name is ambiguous")
                .value_name("TYPE"),
        )
        .arg(
            clap::Arg::new("format")
                .long("format")
                .help("Output format of the resolved configuration")
                .value_parser(["json", "env"])
                .default_value("json"),
        )
        .subcommand(Command::new("list").about("List settings with their source"))
        .subcommand(
            Command::new("set")
                .about("Store a value in the selected profile")
                .arg(clap::Arg::new("setting").required(true).value_name("SETTING"))
                .arg(clap::Arg::new("value").required(true).value_name("VALUE")),
        )
        .subcommand(
            Command::new("unset")
                .about("Remove a stored value from the selected profile")
                .arg(clap::Arg::new("setting").required(true).value_name("SETTING")),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let plugin = app.registry().find(
        utils::required(matches, "plugin")?,
        utils::plugin_type(matches, "type")?,
    )?;

    match matches.subcommand() {
        Some(("list", _)) => list(&app, &plugin),
        Some(("set", sub_matches)) => {
            let setting = utils::required(sub_matches, "setting")?;
            let value = utils::required(sub_matches, "value")?;
            app.settings().set_from_str(&plugin, setting, value)?;
            println!("Set '{}' for {}", setting, plugin.name());
            Ok(())
        }
        Some(("unset", sub_matches)) => {
            let setting = utils::required(sub_matches, "setting")?;
            match app.settings().unset(&plugin, setting)? {
                Some(_) => println!("Unset '{}' for {}", setting, plugin.name()),
                None => println!("'{}' has no stored value for {}", setting, plugin.name()),
            }
            Ok(())
        }
        _ => show(&app, &plugin, matches),
    }
}

fn show(app: &crate::Conduit, plugin: &ResolvedPlugin, matches: &ArgMatches) -> Result<()> {
    let settings = app.settings().resolve_all(plugin);

    if matches.get_one::<String>("format").map(String::as_str) == Some("env") {
        for (name, value) in settings.display_env() {
            println!("{}={}", name, value);
        }
    } else {
        let config = settings.display_config(SettingSource::Fallback);
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    Ok(())
}

fn list(app: &crate::Conduit, plugin: &ResolvedPlugin) -> Result<()> {
    let settings = app.settings().resolve_all(plugin);

    for row in settings.listing() {
        let value = row.value.unwrap_or_else(|| "(undefined)".to_string());
        println!("{}={} (from {}, env {})", row.name, value, row.source, row.env_var);
        if let Some(description) = row.description {
            println!("    {}", description);
        }
    }

    Ok(())
}
