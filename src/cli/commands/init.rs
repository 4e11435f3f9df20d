//! Init command implementation

use crate::cli::utils;
use crate::Project;
use anyhow::Result;
use clap::{ArgMatches, Command};
use tracing::info;

pub fn command() -> Command {
    Command::new("init")
        .about("Create a new project")
        .arg(
            clap::Arg::new("directory")
                .help("Project directory (defaults to --project or the current directory)")
                .value_name("DIR"),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let directory = match matches.get_one::<String>("directory") {
        Some(dir) => std::path::PathBuf::from(dir),
        None => utils::project_dir(matches)?,
    };

    info!("Initializing project in {:?}", directory);
    let project = Project::init(&directory)?;

    println!("Project created in {}", project.root().display());
    println!("Add an extractor with 'conduit add extractor <name>' to get started.");

    Ok(())
}
