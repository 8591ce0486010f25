//! Alert hysteresis: turns per-frame verdicts into a debounced alert state.
//!
//! The engine has three phases:
//! - `Idle`: no bad posture in progress
//! - `Streak`: bad posture seen, not yet sustained long enough
//! - `Alerting`: bad posture sustained for at least `threshold` analyzed frames
//!
//! The debounce counts analyzed frames, not wall-clock time. The frame that
//! opens a streak counts as the first frame of the run.

use crate::{
    classifier::{ErrorKind, PostureVerdict},
    constants::DEFAULT_ALERT_THRESHOLD,
    Error, Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Suggestion used for kinds without a configured list
pub const GENERIC_SUGGESTION: &str = "Adjust your posture";

/// Remediation suggestions per error kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionTable {
    entries: BTreeMap<ErrorKind, Vec<String>>,
}

impl Default for SuggestionTable {
    fn default() -> Self {
        let table = [
            (
                ErrorKind::SpineTooCurved,
                [
                    "Sit with your back against the chair",
                    "Keep your feet flat on the floor",
                    "Adjust the height of your chair",
                ],
            ),
            (
                ErrorKind::SpineTooStraight,
                [
                    "Relax your posture a little",
                    "Keep a slight natural curve in your back",
                    "Avoid forcing your spine upright",
                ],
            ),
            (
                ErrorKind::NeckTilted,
                [
                    "Align your head with your spine",
                    "Keep your chin parallel to the floor",
                    "Avoid leaning your head forward",
                ],
            ),
        ];

        Self {
            entries: table
                .into_iter()
                .map(|(kind, lines)| (kind, lines.iter().map(ToString::to_string).collect()))
                .collect(),
        }
    }
}

impl SuggestionTable {
    /// Build a table from explicit lists, rejecting empty ones
    pub fn new(entries: BTreeMap<ErrorKind, Vec<String>>) -> Result<Self> {
        let table = Self { entries };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, lines) in &self.entries {
            if lines.is_empty() || lines.iter().any(|l| l.trim().is_empty()) {
                return Err(Error::ConfigError(format!(
                    "Suggestion list for {kind} must contain non-empty entries"
                )));
            }
        }
        Ok(())
    }

    /// Suggestions for `kind`, or the generic one when none are configured
    #[must_use]
    pub fn suggestions_for(&self, kind: ErrorKind) -> Vec<String> {
        self.entries
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| vec![GENERIC_SUGGESTION.to_string()])
    }
}

/// Debounced alert state of one monitoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    /// True while in the `Alerting` phase
    pub active: bool,
    /// Consecutive bad verdicts in the current streak
    pub bad_posture_run_length: u32,
    /// When the current phase was entered
    pub last_transition_time: Option<Instant>,
    /// Kind of the most recent bad verdict in the streak
    pub error_kind: Option<ErrorKind>,
}

/// Phase of the hysteresis state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    Idle,
    Streak,
    Alerting,
}

/// What a single analyzed frame caused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    /// Alert just became active
    Activated {
        error_kind: ErrorKind,
        suggestions: Vec<String>,
    },
    /// A correct verdict (or a long absence) reset the engine
    Cleared,
    /// Nothing to report
    None,
}

/// Frame-count debounce from verdicts to alert events
#[derive(Debug, Clone)]
pub struct AlertEngine {
    threshold: u32,
    suggestions: SuggestionTable,
    state: AlertState,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_THRESHOLD, SuggestionTable::default())
    }
}

impl AlertEngine {
    /// `threshold` is clamped to at least one frame
    #[must_use]
    pub fn new(threshold: u32, suggestions: SuggestionTable) -> Self {
        Self {
            threshold: threshold.max(1),
            suggestions,
            state: AlertState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> AlertState {
        self.state
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub fn phase(&self) -> AlertPhase {
        if self.state.active {
            AlertPhase::Alerting
        } else if self.state.bad_posture_run_length > 0 {
            AlertPhase::Streak
        } else {
            AlertPhase::Idle
        }
    }

    /// Feed one verdict using the current time
    pub fn update(&mut self, verdict: &PostureVerdict) -> AlertEvent {
        self.update_at(verdict, Instant::now())
    }

    /// Feed one verdict observed at `now`
    pub fn update_at(&mut self, verdict: &PostureVerdict, now: Instant) -> AlertEvent {
        let Some(kind) = verdict.error_kind() else {
            self.reset_at(now);
            return AlertEvent::Cleared;
        };

        if self.phase() == AlertPhase::Idle {
            debug!("Bad posture streak started ({kind})");
            self.state.last_transition_time = Some(now);
        }
        self.state.bad_posture_run_length = self.state.bad_posture_run_length.saturating_add(1);
        self.state.error_kind = Some(kind);

        if self.state.bad_posture_run_length < self.threshold || self.state.active {
            return AlertEvent::None;
        }

        info!(
            "Posture alert activated: {kind} after {} frames",
            self.state.bad_posture_run_length
        );
        self.state.active = true;
        self.state.last_transition_time = Some(now);
        AlertEvent::Activated {
            error_kind: kind,
            suggestions: self.suggestions.suggestions_for(kind),
        }
    }

    /// Subject left the frame for too long: reset as if posture were correct
    pub fn clear(&mut self) -> AlertEvent {
        self.reset_at(Instant::now());
        AlertEvent::Cleared
    }

    /// Drop all state at the end of a monitoring session
    pub fn reset(&mut self) {
        self.state = AlertState::default();
    }

    fn reset_at(&mut self, now: Instant) {
        if self.phase() != AlertPhase::Idle {
            if self.state.active {
                info!("Posture alert cleared");
            }
            self.state.last_transition_time = Some(now);
        }
        self.state.active = false;
        self.state.bad_posture_run_length = 0;
        self.state.error_kind = None;
    }
}
