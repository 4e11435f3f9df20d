//! ELT command implementation

use crate::cli::utils;
use crate::{EltRunner, TransformMode};
use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("elt")
        .about("Run an extractor into a loader, optionally transforming the result")
        .arg(
            clap::Arg::new("extractor")
                .help("Extractor name, optionally NAME@PROFILE")
                .value_name("EXTRACTOR")
                .required(true),
        )
        .arg(
            clap::Arg::new("loader")
                .help("Loader name, optionally NAME@PROFILE")
                .value_name("LOADER")
                .required(true),
        )
        .arg(
            clap::Arg::new("transform")
                .long("transform")
                .help("Transformation mode")
                .value_parser(["run", "skip", "only"])
                .default_value("skip"),
        )
        .arg(
            clap::Arg::new("dry-run")
                .long("dry-run")
                .help("Resolve and print the pipeline without running it")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let transform: TransformMode = utils::required(matches, "transform")?.parse()?;

    let context = app.elt_builder()?.build(
        utils::required(matches, "extractor")?,
        utils::required(matches, "loader")?,
        transform,
    )?;

    if matches.get_flag("dry-run") {
        println!("Job {} ({})", context.job_id(), context.elt_uri());
        for invocation in context.contexts() {
            println!("  {}", invocation.command_line().join(" "));
        }
        return Ok(());
    }

    let record = EltRunner::new(app.jobs()).run(&context).await?;
    println!("Job {} finished: {:?}", record.job_id, record.state);

    Ok(())
}
