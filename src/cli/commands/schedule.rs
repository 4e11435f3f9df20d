//! Schedule command implementation

use crate::cli::utils;
use crate::{EltRunner, TransformMode};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("schedule")
        .about("Manage scheduled pipelines")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Add a schedule")
                .arg(clap::Arg::new("name").required(true).value_name("NAME"))
                .arg(clap::Arg::new("extractor").required(true).value_name("EXTRACTOR"))
                .arg(clap::Arg::new("loader").required(true).value_name("LOADER"))
                .arg(
                    clap::Arg::new("interval")
                        .required(true)
                        .value_name("INTERVAL")
                        .help("@once, @hourly, @daily, @weekly, @monthly, @yearly or cron"),
                )
                .arg(
                    clap::Arg::new("transform")
                        .long("transform")
                        .value_parser(["run", "skip", "only"])
                        .default_value("skip"),
                )
                .arg(
                    clap::Arg::new("start-date")
                        .long("start-date")
                        .value_name("DATE")
                        .help("First run, YYYY-MM-DD or RFC 3339"),
                )
                .arg(
                    clap::Arg::new("env")
                        .long("env")
                        .value_name("KEY=VALUE")
                        .help("Extra environment for the run")
                        .action(clap::ArgAction::Append),
                ),
        )
        .subcommand(Command::new("list").about("List schedules"))
        .subcommand(
            Command::new("remove")
                .about("Remove a schedule")
                .arg(clap::Arg::new("name").required(true).value_name("NAME")),
        )
        .subcommand(
            Command::new("run")
                .about("Run a schedule's pipeline now")
                .arg(clap::Arg::new("name").required(true).value_name("NAME")),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub_matches)) => add(sub_matches),
        Some(("list", sub_matches)) => list(sub_matches),
        Some(("remove", sub_matches)) => remove(sub_matches),
        Some(("run", sub_matches)) => run_schedule(sub_matches).await,
        _ => Err(anyhow!("Unknown schedule command")),
    }
}

fn add(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let schedules = app.schedules();

    let extractor = utils::required(matches, "extractor")?;
    let start_date = match matches.get_one::<String>("start-date") {
        Some(value) => parse_date(value)?,
        None => schedules.default_start_date(extractor),
    };

    let mut schedule = crate::Schedule {
        name: utils::required(matches, "name")?.clone(),
        extractor: extractor.clone(),
        loader: utils::required(matches, "loader")?.clone(),
        transform: utils::required(matches, "transform")?.parse::<TransformMode>()?,
        interval: utils::required(matches, "interval")?.clone(),
        start_date,
        env: Default::default(),
    };
    for pair in matches.get_many::<String>("env").into_iter().flatten() {
        let (key, value) = crate::utils::parse_key_value(pair)?;
        schedule.env.insert(key, value);
    }

    let schedule = schedules.insert(schedule)?;
    println!(
        "Scheduled '{}' ({}, {}) starting {}",
        schedule.name,
        schedule.elt_uri(),
        schedule.interval,
        schedule.start_date.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}

fn list(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let schedules = app.schedules().list()?;

    if schedules.is_empty() {
        println!("No schedules.");
        return Ok(());
    }

    let now = Utc::now();
    for schedule in &schedules {
        let next = match schedule.next_run(now)? {
            Some(next) => next.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "never".to_string(),
        };
        println!(
            "{}: {} transform={} interval={} next={}",
            schedule.name,
            schedule.elt_uri(),
            schedule.transform,
            schedule.interval,
            next
        );
    }

    Ok(())
}

fn remove(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let removed = app.schedules().remove(utils::required(matches, "name")?)?;
    println!("Removed schedule '{}'", removed.name);
    Ok(())
}

async fn run_schedule(matches: &ArgMatches) -> Result<()> {
    let app = utils::open_app(matches)?;
    let schedule = app.schedules().find(utils::required(matches, "name")?)?;

    let mut context = app
        .elt_builder()?
        .build(&schedule.extractor, &schedule.loader, schedule.transform)?;
    let invocations = [
        Some(&mut context.extractor),
        Some(&mut context.loader),
        context.transformer.as_mut(),
    ];
    for invocation in invocations.into_iter().flatten() {
        invocation.env.extend(schedule.env.clone());
    }

    let record = EltRunner::new(app.jobs()).run(&context).await?;
    println!("Job {} finished: {:?}", record.job_id, record.state);

    Ok(())
}

fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(Default::default())));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid start date '{}': {}", value, e))
}
