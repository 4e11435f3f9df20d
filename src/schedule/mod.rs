//! Named, recurring pipeline definitions

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use conduit_plugin::{PluginType, TransformMode};
use croner::Cron;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::project::Project;
use crate::settings::SettingsResolver;
use crate::utils::value_to_string;
use crate::{ConduitError, ConduitResult};

/// Interval that runs a schedule a single time
pub const ONCE: &str = "@once";

/// A persisted pipeline that an external trigger runs on an interval
///
/// Plugin names are stored as given and only resolved when the schedule runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub name: String,

    /// Extractor name, optionally `name@profile`
    pub extractor: String,

    /// Loader name, optionally `name@profile`
    pub loader: String,

    #[serde(default)]
    pub transform: TransformMode,

    /// Preset such as `@daily`, or a five-field cron expression
    pub interval: String,

    pub start_date: DateTime<Utc>,

    /// Extra environment for the run
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Schedule {
    /// Cron expression for the interval; `None` for `@once`
    pub fn cron_expression(&self) -> ConduitResult<Option<String>> {
        let expression = match self.interval.trim() {
            ONCE => return Ok(None),
            "@hourly" => "0 * * * *",
            "@daily" => "0 0 * * *",
            "@weekly" => "0 0 * * 0",
            "@monthly" => "0 0 1 * *",
            "@yearly" => "0 0 1 1 *",
            other if other.starts_with('@') => {
                return Err(self.invalid_interval("unknown preset".to_string()))
            }
            other => other,
        };

        if expression.split_whitespace().count() != 5 {
            return Err(self.invalid_interval("expected five cron fields".to_string()));
        }
        Ok(Some(expression.to_string()))
    }

    fn cron(&self) -> ConduitResult<Option<Cron>> {
        match self.cron_expression()? {
            Some(expression) => Cron::new(&expression)
                .parse()
                .map(Some)
                .map_err(|e| self.invalid_interval(e.to_string())),
            None => Ok(None),
        }
    }

    fn invalid_interval(&self, reason: String) -> ConduitError {
        ConduitError::InvalidInterval {
            interval: self.interval.clone(),
            reason,
        }
    }

    pub fn validate(&self) -> ConduitResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConduitError::Config("Schedule name cannot be empty".to_string()));
        }
        if self.extractor.is_empty() || self.loader.is_empty() {
            return Err(ConduitError::Config(format!(
                "Schedule '{}' needs both an extractor and a loader",
                self.name
            )));
        }

        self.cron()?;
        Ok(())
    }

    /// First run strictly after `after`, never before the start date
    pub fn next_run(&self, after: DateTime<Utc>) -> ConduitResult<Option<DateTime<Utc>>> {
        let cron = match self.cron()? {
            Some(cron) => cron,
            None if after < self.start_date => return Ok(Some(self.start_date)),
            None => return Ok(None),
        };

        let next = if after < self.start_date {
            cron.find_next_occurrence(&self.start_date, true)
        } else {
            cron.find_next_occurrence(&after, false)
        };

        next.map(Some)
            .map_err(|e| self.invalid_interval(e.to_string()))
    }

    /// Pipeline description used in job records
    pub fn elt_uri(&self) -> String {
        format!("{}:{}", self.extractor, self.loader)
    }
}

/// Snapshot of the project's schedules, in creation order
#[derive(Debug, Clone, Default)]
pub struct ScheduleList {
    schedules: Vec<Schedule>,
}

impl ScheduleList {
    pub fn iter(&self) -> std::slice::Iter<'_, Schedule> {
        self.schedules.iter()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

impl IntoIterator for ScheduleList {
    type Item = Schedule;
    type IntoIter = std::vec::IntoIter<Schedule>;

    fn into_iter(self) -> Self::IntoIter {
        self.schedules.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScheduleList {
    type Item = &'a Schedule;
    type IntoIter = std::slice::Iter<'a, Schedule>;

    fn into_iter(self) -> Self::IntoIter {
        self.schedules.iter()
    }
}

/// Manages the schedules stored in the project document
#[derive(Clone)]
pub struct ScheduleService {
    project: Project,
    settings: SettingsResolver,
}

impl ScheduleService {
    pub fn new(project: Project, settings: SettingsResolver) -> Self {
        Self { project, settings }
    }

    /// Create a schedule
    ///
    /// Without an explicit start date, the extractor's resolved `start_date`
    /// is used when the extractor is installed, else the start of today.
    pub fn add(
        &self,
        name: &str,
        extractor: &str,
        loader: &str,
        transform: TransformMode,
        interval: &str,
        start_date: Option<DateTime<Utc>>,
    ) -> ConduitResult<Schedule> {
        let start_date = match start_date {
            Some(date) => date,
            None => self.default_start_date(extractor),
        };

        self.insert(Schedule {
            name: name.to_string(),
            extractor: extractor.to_string(),
            loader: loader.to_string(),
            transform,
            interval: interval.to_string(),
            start_date,
            env: BTreeMap::new(),
        })
    }

    /// Store a fully built schedule; its name must be unused
    pub fn insert(&self, schedule: Schedule) -> ConduitResult<Schedule> {
        schedule.validate()?;

        self.project.update(|config| {
            if config.schedules.iter().any(|s| s.name == schedule.name) {
                return Err(ConduitError::DuplicateSchedule(schedule.name.clone()));
            }
            config.schedules.push(schedule.clone());
            Ok(())
        })?;

        info!(
            "Added schedule '{}' ({} {})",
            schedule.name,
            schedule.elt_uri(),
            schedule.interval
        );
        Ok(schedule)
    }

    pub fn list(&self) -> ConduitResult<ScheduleList> {
        Ok(ScheduleList {
            schedules: self.project.config()?.schedules,
        })
    }

    pub fn find(&self, name: &str) -> ConduitResult<Schedule> {
        self.project
            .config()?
            .schedules
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConduitError::ScheduleNotFound(name.to_string()))
    }

    pub fn remove(&self, name: &str) -> ConduitResult<Schedule> {
        let removed = self.project.update(|config| {
            let index = config
                .schedules
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| ConduitError::ScheduleNotFound(name.to_string()))?;
            Ok(config.schedules.remove(index))
        })?;

        info!("Removed schedule '{}'", name);
        Ok(removed)
    }

    /// Start date for a schedule of `extractor`
    pub fn default_start_date(&self, extractor: &str) -> DateTime<Utc> {
        let resolved = self
            .settings
            .registry()
            .find(extractor, Some(PluginType::Extractor))
            .ok()
            .and_then(|plugin| self.settings.resolve(&plugin, "start_date").value)
            .and_then(|value| parse_start_date(&value_to_string(&value)));

        match resolved {
            Some(date) => date,
            None => {
                debug!("No start_date for '{}', starting today", extractor);
                start_of_day(Utc::now().date_naive())
            }
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

fn parse_start_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(start_of_day(date));
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
