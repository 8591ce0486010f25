//! Posture event persistence, daily summaries and export.
//!
//! The monitor records one event per classified frame. Storage is best
//! effort: a failed write is logged by the caller and never stops a session.

use crate::{
    classifier::{AngleSet, PostureVerdict},
    constants::{DEFAULT_HISTORY_DAYS, DEFAULT_MAX_STORED_EVENTS, DEFAULT_RETENTION_DAYS},
    Error, Result,
};
use chrono::{DateTime, Duration, DurationRound, Local, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// One recorded posture observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureEvent {
    pub timestamp: DateTime<Local>,
    pub label: String,
    pub duration_units: u32,
    pub neck_angle: f64,
    pub spine_angle: f64,
}

impl PostureEvent {
    /// Whether the label denotes correct posture
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.label == PostureVerdict::CORRECT_LABEL
    }
}

/// Totals for the current day, in duration units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub correct_minutes: u64,
    pub incorrect_minutes: u64,
    pub percent_correct: f64,
}

/// Totals for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub date: NaiveDate,
    pub total_correct: u64,
    pub total_incorrect: u64,
    /// Number of distinct bad-posture labels seen that day
    pub incorrect_kinds: usize,
}

/// Number of bad-posture events recorded within one second
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    /// Start of the second
    pub time: DateTime<Local>,
    pub count: u64,
}

/// Layout of a JSON export: the events plus per-day statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub events: Vec<PostureEvent>,
    pub daily_stats: Vec<DayStats>,
}

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!("Unknown export format: {other}"))),
        }
    }
}

/// Persistence service for posture events
pub trait PostureStore: Send {
    /// Record one classified frame
    fn record_event(&mut self, label: &str, duration_units: u32, angles: &AngleSet) -> Result<()>;

    /// Today's correct/incorrect totals
    fn daily_summary(&self) -> Result<DailySummary>;

    /// Per-day totals for the last `days` days, newest day first
    fn daily_stats(&self, days: i64) -> Result<Vec<DayStats>>;

    /// Bad-posture events of the last `window`, counted per second, oldest first
    fn incorrect_by_time(&self, window: Duration) -> Result<Vec<TimeBucket>>;

    /// Events between `start` and `end` (inclusive), newest first.
    /// Defaults to the last seven days ending now.
    fn history(&self, start: Option<DateTime<Local>>, end: Option<DateTime<Local>>) -> Result<Vec<PostureEvent>>;

    /// Write the events of a range to a file and return its path.
    /// JSON exports also carry the last week of daily statistics.
    fn export(
        &self,
        format: ExportFormat,
        start: Option<DateTime<Local>>,
        end: Option<DateTime<Local>>,
    ) -> Result<PathBuf>;
}

/// Event store kept in memory, exporting to a directory.
///
/// Events live only as long as the process. Events older than the retention
/// period are pruned on every write, and past `max_events` the oldest events
/// are dropped first.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    events: VecDeque<PostureEvent>,
    export_dir: PathBuf,
    retention: Duration,
    max_events: usize,
}

impl InMemoryStore {
    /// Store with the default retention and size limit
    #[must_use]
    pub fn new<P: AsRef<Path>>(export_dir: P) -> Self {
        Self::with_limits(
            export_dir,
            Duration::days(DEFAULT_RETENTION_DAYS),
            DEFAULT_MAX_STORED_EVENTS,
        )
    }

    #[must_use]
    pub fn with_limits<P: AsRef<Path>>(export_dir: P, retention: Duration, max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            export_dir: export_dir.as_ref().to_path_buf(),
            retention,
            max_events: max_events.max(1),
        }
    }

    /// Record an event with an explicit timestamp
    pub fn record_event_at(
        &mut self,
        timestamp: DateTime<Local>,
        label: &str,
        duration_units: u32,
        angles: &AngleSet,
    ) -> Result<()> {
        if label.trim().is_empty() {
            return Err(Error::Persistence("Posture label must not be empty".to_string()));
        }

        let cutoff = Local::now() - self.retention;
        if timestamp < cutoff {
            debug!("Ignoring posture event from {timestamp}, older than the retention period");
            return Ok(());
        }

        self.events.push_back(PostureEvent {
            timestamp,
            label: label.to_string(),
            duration_units,
            neck_angle: angles.neck,
            spine_angle: angles.spine,
        });
        self.prune(cutoff);
        Ok(())
    }

    /// Drop expired events from the front, then enforce the size limit
    fn prune(&mut self, cutoff: DateTime<Local>) {
        while self.events.front().is_some_and(|e| e.timestamp < cutoff) {
            self.events.pop_front();
        }
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn stats_since(&self, days: i64) -> Vec<DayStats> {
        let since = Local::now() - Duration::days(days);
        let mut by_day: BTreeMap<NaiveDate, (u64, u64, BTreeSet<&str>)> = BTreeMap::new();

        for event in self.events.iter().filter(|e| e.timestamp >= since) {
            let entry = by_day.entry(event.timestamp.date_naive()).or_default();
            if event.is_correct() {
                entry.0 += u64::from(event.duration_units);
            } else {
                entry.1 += u64::from(event.duration_units);
                entry.2.insert(event.label.as_str());
            }
        }

        by_day
            .into_iter()
            .rev()
            .map(|(date, (total_correct, total_incorrect, kinds))| DayStats {
                date,
                total_correct,
                total_incorrect,
                incorrect_kinds: kinds.len(),
            })
            .collect()
    }

    fn summary_for(&self, date: NaiveDate) -> DailySummary {
        let (correct, incorrect) = self
            .events
            .iter()
            .filter(|e| e.timestamp.date_naive() == date)
            .fold((0u64, 0u64), |(c, i), e| {
                if e.is_correct() {
                    (c + u64::from(e.duration_units), i)
                } else {
                    (c, i + u64::from(e.duration_units))
                }
            });

        let total = correct + incorrect;
        #[allow(clippy::cast_precision_loss)]
        let percent_correct = if total > 0 {
            correct as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        DailySummary {
            correct_minutes: correct,
            incorrect_minutes: incorrect,
            percent_correct,
        }
    }

    fn write_csv(path: &Path, events: &[PostureEvent]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for event in events {
            writer.serialize(event)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_json(path: &Path, document: &ExportDocument) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), document)?;
        Ok(())
    }
}

impl PostureStore for InMemoryStore {
    fn record_event(&mut self, label: &str, duration_units: u32, angles: &AngleSet) -> Result<()> {
        self.record_event_at(Local::now(), label, duration_units, angles)
    }

    fn daily_summary(&self) -> Result<DailySummary> {
        Ok(self.summary_for(Local::now().date_naive()))
    }

    fn daily_stats(&self, days: i64) -> Result<Vec<DayStats>> {
        if days < 0 {
            return Err(Error::InvalidInput(format!("Day count must not be negative, got {days}")));
        }
        Ok(self.stats_since(days))
    }

    fn incorrect_by_time(&self, window: Duration) -> Result<Vec<TimeBucket>> {
        let since = Local::now() - window;
        let mut buckets: BTreeMap<DateTime<Local>, u64> = BTreeMap::new();
        for event in self.events.iter().filter(|e| e.timestamp >= since && !e.is_correct()) {
            let second = event
                .timestamp
                .duration_trunc(Duration::seconds(1))
                .map_err(|e| Error::Persistence(format!("Bad event timestamp: {e}")))?;
            *buckets.entry(second).or_default() += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|(time, count)| TimeBucket { time, count })
            .collect())
    }

    fn history(&self, start: Option<DateTime<Local>>, end: Option<DateTime<Local>>) -> Result<Vec<PostureEvent>> {
        let end = end.unwrap_or_else(Local::now);
        let start = start.unwrap_or_else(|| end - Duration::days(DEFAULT_HISTORY_DAYS));
        if start > end {
            return Err(Error::InvalidInput(format!(
                "History range starts after it ends ({start} > {end})"
            )));
        }

        let mut events: Vec<PostureEvent> = self
            .events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    fn export(
        &self,
        format: ExportFormat,
        start: Option<DateTime<Local>>,
        end: Option<DateTime<Local>>,
    ) -> Result<PathBuf> {
        let events = self.history(start, end)?;
        if events.is_empty() {
            return Err(Error::Persistence("No posture events in the requested range".to_string()));
        }

        std::fs::create_dir_all(&self.export_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .export_dir
            .join(format!("postures_{stamp}.{}", format.extension()));

        let count = events.len();
        match format {
            ExportFormat::Csv => Self::write_csv(&path, &events)?,
            ExportFormat::Json => {
                let document = ExportDocument {
                    daily_stats: self.stats_since(DEFAULT_HISTORY_DAYS),
                    events,
                };
                Self::write_json(&path, &document)?;
            }
        }
        info!("Exported {count} posture events to {}", path.display());
        Ok(path)
    }
}
