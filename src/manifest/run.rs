//! The run manifest and its timer.

use crate::config::{Environment, RunConfig};
use crate::manifest::metric::DatasetMetric;
use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::{info, warn};
use uuid::Uuid;

/// Start, end and duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTime {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl RunTime {
    fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: None,
            duration_ms: None,
        }
    }

    fn stop(&mut self, end: DateTime<Utc>) {
        self.end = Some(end);
        self.duration_ms = Some((end - self.start).num_milliseconds().max(0));
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.duration_ms.map(TimeDelta::milliseconds)
    }

    /// Duration as `dd:hh:mm:ss`, or `--:--:--:--` while still running.
    pub fn display(&self) -> String {
        self.duration()
            .map(format_duration)
            .unwrap_or_else(|| "--:--:--:--".to_owned())
    }
}

/// Render a duration as `dd:hh:mm:ss`. Negative durations render as zero.
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{days:02}:{hours:02}:{minutes:02}:{seconds:02}")
}

/// Open record of a pipeline run.
///
/// Datasets and warnings are append-only, and `success` only ever goes from
/// `true` to `false`. [`RunManifest::finalize`] consumes the manifest and
/// returns a [`ClosedManifest`], which has no mutating methods.
///
/// Mutation takes `&mut self`; share one manifest between threads through
/// [`crate::manifest::SharedManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    run_id: Uuid,
    start_utc: DateTime<Utc>,
    last_updated_utc: DateTime<Utc>,
    last_updated_local: DateTime<Local>,
    report_title: String,
    environment: Environment,
    user: String,
    machine: String,
    config_path: String,
    success: bool,
    run_time: RunTime,
    datasets: Vec<DatasetMetric>,
    warnings: Vec<String>,
}

impl RunManifest {
    /// Open a manifest for a new run. User and machine come from the process
    /// environment.
    pub fn new(
        report_title: impl Into<String>,
        environment: Environment,
        config_path: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            start_utc: now,
            last_updated_utc: now,
            last_updated_local: now.with_timezone(&Local),
            report_title: report_title.into(),
            environment,
            user: detect_user(),
            machine: detect_machine(),
            config_path: config_path.into(),
            success: true,
            run_time: RunTime::starting_at(now),
            datasets: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Open a manifest from a configuration snapshot.
    pub fn from_config(config: RunConfig) -> Self {
        let environment = config.environment();
        Self::new(
            config.report_title,
            environment,
            config.config_path.display().to_string(),
        )
    }

    /// Override the detected user and machine names.
    #[must_use]
    pub fn with_identity(mut self, user: impl Into<String>, machine: impl Into<String>) -> Self {
        self.user = user.into();
        self.machine = machine.into();
        self
    }

    fn touch(&mut self) {
        // Never move backwards, even if the wall clock does.
        let now = Utc::now().max(self.last_updated_utc);
        self.last_updated_utc = now;
        self.last_updated_local = now.with_timezone(&Local);
    }

    /// Append a dataset metric. Repeated names are kept as separate entries.
    pub fn add_dataset(&mut self, metric: DatasetMetric) {
        self.datasets.push(metric);
        self.touch();
    }

    /// Append a warning. Does not affect `success`.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("Run {}: {message}", self.run_id);
        self.warnings.push(message);
        self.touch();
    }

    /// Mark the run as failed. There is no way back to success.
    pub fn mark_failed(&mut self) {
        if self.success {
            warn!("Run {} marked as failed", self.run_id);
        }
        self.success = false;
        self.touch();
    }

    /// Stop the run timer and close the manifest.
    pub fn finalize(mut self) -> ClosedManifest {
        self.touch();
        self.run_time.stop(self.last_updated_utc);
        info!(
            "Run {} finished: success={}, datasets={}, warnings={}, duration={}",
            self.run_id,
            self.success,
            self.datasets.len(),
            self.warnings.len(),
            self.run_time.display()
        );
        ClosedManifest(self)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start_utc
    }

    pub fn last_updated_utc(&self) -> DateTime<Utc> {
        self.last_updated_utc
    }

    pub fn last_updated_local(&self) -> DateTime<Local> {
        self.last_updated_local
    }

    pub fn report_title(&self) -> &str {
        &self.report_title
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn machine(&self) -> &str {
        &self.machine
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn run_time(&self) -> &RunTime {
        &self.run_time
    }

    pub fn datasets(&self) -> &[DatasetMetric] {
        &self.datasets
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Most recently appended metric for `name`.
    pub fn latest_dataset(&self, name: &str) -> Option<&DatasetMetric> {
        self.datasets.iter().rev().find(|m| m.name() == name)
    }

    /// Datasets whose schema differs from the previous run.
    pub fn schema_changes(&self) -> impl Iterator<Item = &DatasetMetric> {
        self.datasets.iter().filter(|m| m.schema_changed())
    }
}

/// A finalized manifest. Read-only; dereferences to [`RunManifest`] for access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClosedManifest(RunManifest);

impl ClosedManifest {
    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        self.0.run_time.end
    }

    pub fn duration_display(&self) -> String {
        self.0.run_time.display()
    }
}

impl Deref for ClosedManifest {
    type Target = RunManifest;

    fn deref(&self) -> &RunManifest {
        &self.0
    }
}

fn first_env_var(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

fn detect_user() -> String {
    first_env_var(&["USER", "USERNAME", "LOGNAME"]).unwrap_or_else(|| "unknown".to_owned())
}

fn detect_machine() -> String {
    first_env_var(&["HOSTNAME", "COMPUTERNAME"])
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_owned())
}
