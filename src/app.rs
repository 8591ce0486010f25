//! Monitoring session: wires capture, scheduler, storage, presentation and
//! the audible alert together and owns the start/stop lifecycle.

use crate::{
    alert::AlertEvent,
    capture::{CameraSettings, CaptureSource, SettingsHandle},
    constants::{DEFAULT_FRAME_INTERVAL_MS, DEFAULT_STALL_TIMEOUT_MS, DEVICE_CONTROL_TIMEOUT_MS},
    notifier::AlertNotifier,
    presentation::{Presenter, Severity},
    scheduler::{FrameAnalysis, FrameOutcome, FrameScheduler},
    store::PostureStore,
    worker::ServiceWorker,
    Error, Result,
};
use log::{error, info, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Monitoring session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Camera index passed to the capture source
    pub device_index: i32,
    /// Minimum delay between two frames in [`PostureMonitor::run`]
    pub frame_interval: Duration,
    /// Deadline of one capture read; `None` waits without limit.
    /// Opening and configuring the device get at least
    /// [`DEVICE_CONTROL_TIMEOUT_MS`].
    pub stall_timeout: Option<Duration>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            stall_timeout: Some(Duration::from_millis(DEFAULT_STALL_TIMEOUT_MS)),
        }
    }
}

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

/// Cross-thread request to end [`PostureMonitor::run`]
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Result of one [`PostureMonitor::tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// A frame went through the pipeline
    Processed(FrameAnalysis),
    /// The capture source has no more frames; monitoring stopped
    EndOfStream,
    /// Monitoring is not running
    Idle,
}

/// Counters for the current or last session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub analyzed: u64,
    pub classified: u64,
    pub cache_hits: u64,
    pub alerts: u64,
    pub persistence_failures: u64,
}

/// Posture monitoring session
pub struct PostureMonitor {
    capture: ServiceWorker<Box<dyn CaptureSource>>,
    scheduler: FrameScheduler,
    store: Box<dyn PostureStore>,
    presenter: Box<dyn Presenter>,
    notifier: Option<AlertNotifier>,
    settings: SettingsHandle,
    applied_settings: Option<CameraSettings>,
    stop_handle: StopHandle,
    options: MonitorOptions,
    state: MonitorState,
    stats: SessionStats,
}

impl std::fmt::Debug for PostureMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostureMonitor")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl PostureMonitor {
    /// Create a stopped monitor. `notifier` is `None` when sound is disabled.
    ///
    /// The capture source moves to its own thread so that a hung read can be
    /// abandoned after `options.stall_timeout`.
    pub fn new(
        capture: Box<dyn CaptureSource>,
        scheduler: FrameScheduler,
        store: Box<dyn PostureStore>,
        presenter: Box<dyn Presenter>,
        notifier: Option<AlertNotifier>,
        settings: SettingsHandle,
        options: MonitorOptions,
    ) -> Result<Self> {
        Ok(Self {
            capture: ServiceWorker::spawn("capture device", capture)?,
            scheduler,
            store,
            presenter,
            notifier,
            settings,
            applied_settings: None,
            stop_handle: StopHandle::default(),
            options,
            state: MonitorState::Stopped,
            stats: SessionStats::default(),
        })
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// Handle the presentation layer uses to change camera settings
    #[must_use]
    pub fn settings_handle(&self) -> SettingsHandle {
        self.settings.clone()
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn store(&self) -> &dyn PostureStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn notifier(&self) -> Option<&AlertNotifier> {
        self.notifier.as_ref()
    }

    /// Open the capture device and apply the current settings.
    ///
    /// Does nothing if already running. On failure the device is released,
    /// an error status is shown and the monitor stays stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        info!("Starting posture monitoring on device {}", self.options.device_index);

        if let Err(e) = self.open_device() {
            error!("Could not start monitoring: {e}");
            self.release_capture();
            self.presenter.status(user_message(&e), Severity::Error);
            return Err(e);
        }

        self.stats = SessionStats::default();
        self.stop_handle.clear();
        self.state = MonitorState::Running;
        self.presenter.status("Monitoring started", Severity::Success);
        Ok(())
    }

    fn open_device(&mut self) -> Result<()> {
        let device_index = self.options.device_index;
        self.control(move |capture| capture.open(device_index))?;
        let settings = self.settings.snapshot();
        self.control(move |capture| capture.apply_settings(&settings))?;
        self.applied_settings = Some(settings);
        Ok(())
    }

    /// Open or configure the device, bounded by the control deadline
    fn control<F>(&self, call: F) -> Result<()>
    where
        F: FnOnce(&mut dyn CaptureSource) -> Result<()> + Send + 'static,
    {
        let deadline = self
            .options
            .stall_timeout
            .map(|limit| limit.max(Duration::from_millis(DEVICE_CONTROL_TIMEOUT_MS)));
        self.capture.call(deadline, move |capture| call(capture.as_mut()))?
    }

    fn read_frame(&self) -> Result<Option<image::RgbImage>> {
        self.capture
            .call(self.options.stall_timeout, |capture| capture.read_frame())?
    }

    /// Release the device. Behind a hung read this gives up after the stall
    /// timeout; the release still runs once the read returns.
    fn release_capture(&self) {
        if let Err(e) = self.capture.call(self.options.stall_timeout, |capture| capture.release()) {
            warn!("Capture device release did not complete: {e}");
        }
    }

    /// Release the device, silence the alert and drop session state. Idempotent.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.release_capture();
        if let Some(notifier) = self.notifier.as_mut() {
            notifier.stop();
        }
        self.scheduler.reset_session();
        self.applied_settings = None;
        self.state = MonitorState::Stopped;
        info!(
            "Monitoring stopped after {} frames ({} classified, {} alerts)",
            self.stats.frames, self.stats.classified, self.stats.alerts
        );
        self.presenter.status("Monitoring stopped", Severity::Info);
    }

    /// Capture and process one frame.
    ///
    /// # Errors
    ///
    /// Device, stall and estimator errors. The session has already been
    /// stopped and an error status shown when this returns `Err`.
    pub fn tick(&mut self) -> Result<Tick> {
        if !self.is_running() {
            return Ok(Tick::Idle);
        }
        match self.step() {
            Ok(tick) => Ok(tick),
            Err(e) => {
                error!("Monitoring failed: {e}");
                self.presenter.status(user_message(&e), Severity::Error);
                self.stop();
                Err(e)
            }
        }
    }

    fn step(&mut self) -> Result<Tick> {
        let settings = self.sync_settings()?;

        let Some(frame) = self.read_frame()? else {
            info!("Capture source reached end of stream");
            self.stop();
            return Ok(Tick::EndOfStream);
        };

        let outcome = self.scheduler.process(&frame, &settings)?;
        self.dispatch(&outcome);
        Ok(Tick::Processed(outcome.analysis))
    }

    /// Push changed settings to the device before the frame is read
    fn sync_settings(&mut self) -> Result<CameraSettings> {
        let settings = self.settings.snapshot();
        if self.applied_settings != Some(settings) {
            info!(
                "Applying camera settings: {} @ {} fps, brightness {}, contrast {}",
                settings.resolution, settings.fps, settings.brightness, settings.contrast
            );
            self.control(move |capture| capture.apply_settings(&settings))?;
            self.applied_settings = Some(settings);
        }
        Ok(settings)
    }

    fn dispatch(&mut self, outcome: &FrameOutcome) {
        self.stats.frames += 1;
        self.presenter.display_frame(&outcome.display_frame);

        match &outcome.analysis {
            FrameAnalysis::Skipped => {}
            FrameAnalysis::Unclassified => self.stats.analyzed += 1,
            FrameAnalysis::NoBody { alert_event } => {
                self.stats.analyzed += 1;
                self.handle_alert(alert_event);
            }
            FrameAnalysis::Classified {
                classification,
                cache_hit,
                alert_event,
            } => {
                self.stats.analyzed += 1;
                self.stats.classified += 1;
                if *cache_hit {
                    self.stats.cache_hits += 1;
                }
                self.presenter.angles(&classification.angles);
                self.handle_alert(alert_event);

                if let Err(e) = self
                    .store
                    .record_event(classification.verdict.label(), 1, &classification.angles)
                {
                    warn!("Failed to record posture event: {e}");
                    self.stats.persistence_failures += 1;
                }
            }
        }
    }

    fn handle_alert(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::Activated {
                error_kind,
                suggestions,
            } => {
                self.stats.alerts += 1;
                self.presenter.alert_activated(*error_kind, suggestions);
                if let Some(notifier) = self.notifier.as_mut() {
                    if let Err(e) = notifier.start() {
                        warn!("Could not start alert sound: {e}");
                    }
                }
            }
            AlertEvent::Cleared => {
                self.presenter.alert_cleared();
                if let Some(notifier) = self.notifier.as_mut() {
                    notifier.stop();
                }
            }
            AlertEvent::None => {}
        }
    }

    /// Start monitoring and process frames until the stream ends, `max_frames`
    /// frames were processed or a stop is requested through the [`StopHandle`].
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<SessionStats> {
        self.start()?;

        let mut processed = 0u64;
        loop {
            if self.stop_handle.is_stop_requested() {
                info!("Stop requested");
                break;
            }
            if max_frames.is_some_and(|max| processed >= max) {
                break;
            }
            match self.tick()? {
                Tick::Processed(_) => processed += 1,
                Tick::EndOfStream | Tick::Idle => break,
            }
            if !self.options.frame_interval.is_zero() {
                std::thread::sleep(self.options.frame_interval);
            }
        }

        let stats = self.stats;
        self.stop();
        Ok(stats)
    }
}

impl Drop for PostureMonitor {
    fn drop(&mut self) {
        if self.is_running() {
            self.release_capture();
        }
    }
}

/// Operator-facing text for a session error, without the raw payload
fn user_message(e: &Error) -> &'static str {
    match e {
        Error::Stall(_) => "Camera or pose estimator stopped responding, monitoring stopped",
        Error::Estimator(_) => "Pose estimation failed, monitoring stopped",
        _ if e.stops_session() => "Camera error, monitoring stopped",
        _ => "Unexpected error, monitoring stopped",
    }
}
