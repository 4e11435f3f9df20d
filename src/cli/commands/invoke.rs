//! Invoke command implementation

use crate::cli::utils;
use crate::Invoker;
use crate::ProcessInvoker;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use tracing::info;

pub fn command() -> Command {
    Command::new("invoke")
        .about("Run a plugin with its resolved configuration")
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
            clap::Arg::new("args")
                .help("Extra arguments passed to the plugin")
                .value_name("ARGS")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let extra: Vec<String> = matches
        .get_many::<String>("args")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let context = app
        .invocation_builder()?
        .build_for_name(
            utils::required(matches, "plugin")?,
            utils::plugin_type(matches, "type")?,
        )?
        .with_args(extra);

    info!("Invoking {}", context.command_line().join(" "));
    let status = ProcessInvoker.invoke(&context).await?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("{} exited with {}", context.name(), status))
    }
}
