//! Presentation seam: where frames, angles, status and alerts are shown.

use crate::classifier::{AngleSet, ErrorKind};
use image::RgbImage;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity tag attached to status messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Receiver of everything the monitor wants to show the operator
pub trait Presenter: Send {
    /// Adjusted frame for display, sent for every captured frame
    fn display_frame(&mut self, frame: &RgbImage);

    /// Status line with a severity tag. Never carries raw error payloads.
    fn status(&mut self, message: &str, severity: Severity);

    /// Latest measured body angles
    fn angles(&mut self, angles: &AngleSet);

    /// Sustained bad posture detected
    fn alert_activated(&mut self, error_kind: ErrorKind, suggestions: &[String]);

    /// Posture is correct again (may be sent while no alert is shown)
    fn alert_cleared(&mut self);
}

/// Presenter that writes everything to the log
#[derive(Debug, Default)]
pub struct LogPresenter {
    alert_shown: bool,
    frames_shown: u64,
}

impl LogPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl Presenter for LogPresenter {
    fn display_frame(&mut self, frame: &RgbImage) {
        self.frames_shown += 1;
        log::trace!("Frame {} ({}x{})", self.frames_shown, frame.width(), frame.height());
    }

    fn status(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Success | Severity::Info => info!("[{severity}] {message}"),
            Severity::Warning => warn!("[{severity}] {message}"),
            Severity::Error => error!("[{severity}] {message}"),
        }
    }

    fn angles(&mut self, angles: &AngleSet) {
        debug!("Neck angle: {:.1}°  Spine angle: {:.1}°", angles.neck, angles.spine);
    }

    fn alert_activated(&mut self, error_kind: ErrorKind, suggestions: &[String]) {
        self.alert_shown = true;
        warn!("{}", error_kind.alert_message());
        for suggestion in suggestions {
            warn!("  • {suggestion}");
        }
    }

    fn alert_cleared(&mut self) {
        if self.alert_shown {
            info!("Posture corrected, alert cleared");
            self.alert_shown = false;
        }
    }
}
