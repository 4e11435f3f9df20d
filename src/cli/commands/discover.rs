//! Discover command implementation

use crate::cli::utils;
use crate::PluginType;
use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("discover")
        .about("List the plugins known to the catalog")
        .arg(
            clap::Arg::new("type")
                .help("Only show plugins of this type")
                .value_name("TYPE"),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let filter = utils::plugin_type(matches, "type")?;

    #[cfg(feature = "http")]
    let remote = match app.project().config()?.settings.catalog_url {
        Some(url) => Some(
            crate::DiscoveryService::new(app.project().clone())
                .load_with_remote(&url)
                .await?,
        ),
        None => None,
    };
    #[cfg(not(feature = "http"))]
    let remote: Option<crate::Catalog> = None;

    let catalog = remote.as_ref().unwrap_or_else(|| app.catalog());

    for plugin_type in PluginType::ALL {
        if filter.map_or(false, |t| t != plugin_type) {
            continue;
        }

        let definitions = catalog.definitions(plugin_type);
        if definitions.is_empty() {
            continue;
        }

        println!("{}:", plugin_type);
        for definition in definitions {
            match &definition.description {
                Some(description) => println!("  {:<28} {}", definition.name, description),
                None => println!("  {}", definition.name),
            }
        }
        println!();
    }

    Ok(())
}
