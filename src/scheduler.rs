//! Per-frame scheduling of the posture analysis pipeline.
//!
//! Every frame is normalized to the processing resolution and pixel-adjusted.
//! Only every `skip_frames + 1`-th frame then goes through the estimator,
//! the landmark cache, the classifier and the alert engine. All mutable
//! analysis state lives in one [`AnalysisSession`] so that stopping a
//! monitoring session can drop it in one place.

use crate::{
    alert::{AlertEngine, AlertEvent, AlertState},
    cache::LandmarkCache,
    capture::CameraSettings,
    classifier::{AngleSet, Classification, PostureClassifier, PostureVerdict},
    constants::{
        DEFAULT_ABSENCE_RESET_FRAMES, DEFAULT_SKIP_FRAMES, DEFAULT_STALL_TIMEOUT_MS, PROCESSING_HEIGHT,
        PROCESSING_WIDTH,
    },
    estimator::LandmarkEstimator,
    landmarks::LandmarkSet,
    utils::image_adjust::{apply_brightness_contrast, normalize_resolution},
    worker::ServiceWorker,
    Error, Result,
};
use image::RgbImage;
use log::{debug, info, trace};
use std::time::Duration;

/// Which frames get full analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipPolicy {
    skip_frames: u32,
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SKIP_FRAMES)
    }
}

impl SkipPolicy {
    #[must_use]
    pub const fn new(skip_frames: u32) -> Self {
        Self { skip_frames }
    }

    #[must_use]
    pub const fn skip_frames(&self) -> u32 {
        self.skip_frames
    }

    /// Frame `index` (counted from 0) is analyzed iff it is a multiple of
    /// `skip_frames + 1`
    #[must_use]
    pub fn should_analyze(&self, index: u64) -> bool {
        index % (u64::from(self.skip_frames) + 1) == 0
    }
}

/// Tunables of the frame scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerOptions {
    pub skip_frames: u32,
    pub processing_width: u32,
    pub processing_height: u32,
    /// Latency budget of one estimator call; `None` disables the check
    pub stall_timeout: Option<Duration>,
    /// Analyzed no-body frames after which the alert engine is reset; 0 disables
    pub absence_reset_frames: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            skip_frames: DEFAULT_SKIP_FRAMES,
            processing_width: PROCESSING_WIDTH,
            processing_height: PROCESSING_HEIGHT,
            stall_timeout: Some(Duration::from_millis(DEFAULT_STALL_TIMEOUT_MS)),
            absence_reset_frames: DEFAULT_ABSENCE_RESET_FRAMES,
        }
    }
}

/// Mutable state of one monitoring session
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    classifier: PostureClassifier,
    cache: LandmarkCache,
    alert: AlertEngine,
    frame_counter: u64,
    absence_run: u32,
}

impl AnalysisSession {
    #[must_use]
    pub fn new(classifier: PostureClassifier, cache: LandmarkCache, alert: AlertEngine) -> Self {
        Self {
            classifier,
            cache,
            alert,
            frame_counter: 0,
            absence_run: 0,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &PostureClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn cache(&self) -> &LandmarkCache {
        &self.cache
    }

    #[must_use]
    pub fn alert_state(&self) -> AlertState {
        self.alert.state()
    }

    /// Frames seen so far, analyzed or not
    #[must_use]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Consecutive analyzed frames without a body
    #[must_use]
    pub fn absence_run(&self) -> u32 {
        self.absence_run
    }

    /// Back to a fresh session: counters, cache, angles and alert state
    pub fn reset(&mut self) {
        self.classifier.reset();
        self.cache.clear();
        self.alert.reset();
        self.frame_counter = 0;
        self.absence_run = 0;
    }
}

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAnalysis {
    /// Frame was only adjusted and forwarded for display
    Skipped,
    /// Estimator found no body
    NoBody { alert_event: AlertEvent },
    /// Landmarks were found but gave no verdict (missing joint, degenerate geometry)
    Unclassified,
    /// A verdict was produced, from the cache or the classifier
    Classified {
        classification: Classification,
        cache_hit: bool,
        alert_event: AlertEvent,
    },
}

/// Result of [`FrameScheduler::process`]
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame_index: u64,
    /// Normalized and pixel-adjusted frame
    pub display_frame: RgbImage,
    pub analysis: FrameAnalysis,
}

impl FrameOutcome {
    #[must_use]
    pub fn verdict(&self) -> Option<PostureVerdict> {
        match &self.analysis {
            FrameAnalysis::Classified { classification, .. } => Some(classification.verdict),
            _ => None,
        }
    }

    #[must_use]
    pub fn angles(&self) -> Option<AngleSet> {
        match &self.analysis {
            FrameAnalysis::Classified { classification, .. } => Some(classification.angles),
            _ => None,
        }
    }

    #[must_use]
    pub fn alert_event(&self) -> Option<&AlertEvent> {
        match &self.analysis {
            FrameAnalysis::NoBody { alert_event } | FrameAnalysis::Classified { alert_event, .. } => {
                Some(alert_event)
            }
            FrameAnalysis::Skipped | FrameAnalysis::Unclassified => None,
        }
    }
}

/// Drives one frame at a time through the analysis pipeline
pub struct FrameScheduler {
    estimator: ServiceWorker<Box<dyn LandmarkEstimator>>,
    options: SchedulerOptions,
    skip: SkipPolicy,
    session: AnalysisSession,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("options", &self.options)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl FrameScheduler {
    pub fn new(
        estimator: Box<dyn LandmarkEstimator>,
        session: AnalysisSession,
        options: SchedulerOptions,
    ) -> Result<Self> {
        if options.processing_width == 0 || options.processing_height == 0 {
            return Err(Error::ConfigError(format!(
                "Processing resolution must be non-zero, got {}x{}",
                options.processing_width, options.processing_height
            )));
        }
        info!(
            "Frame scheduler: {}x{} processing, analyzing 1 of every {} frames",
            options.processing_width,
            options.processing_height,
            options.skip_frames + 1
        );
        Ok(Self {
            estimator: ServiceWorker::spawn("pose estimator", estimator)?,
            skip: SkipPolicy::new(options.skip_frames),
            options,
            session,
        })
    }

    /// Scheduler with default options, classifier, cache and alert engine
    pub fn with_defaults(estimator: Box<dyn LandmarkEstimator>) -> Result<Self> {
        let options = SchedulerOptions::default();
        let session = AnalysisSession::new(
            PostureClassifier::default(),
            LandmarkCache::new(crate::constants::DEFAULT_CACHE_CAPACITY),
            AlertEngine::default(),
        );
        Self::new(estimator, session, options)
    }

    #[must_use]
    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    #[must_use]
    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    /// Drop all session state; the next frame is treated as frame 0
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    /// Process one raw frame.
    ///
    /// # Errors
    ///
    /// Estimator failures are returned unchanged. An estimator call that does
    /// not answer within `stall_timeout` returns [`Error::Stall`] without
    /// waiting for it. Either way the caller must stop the monitoring session. Classification faults never
    /// surface here, they produce [`FrameAnalysis::Unclassified`].
    pub fn process(&mut self, raw: &RgbImage, settings: &CameraSettings) -> Result<FrameOutcome> {
        let mut frame = normalize_resolution(raw, self.options.processing_width, self.options.processing_height);
        apply_brightness_contrast(&mut frame, settings.brightness, settings.contrast);

        let frame_index = self.session.frame_counter;
        self.session.frame_counter += 1;

        if !self.skip.should_analyze(frame_index) {
            trace!("Frame {frame_index} skipped");
            return Ok(FrameOutcome {
                frame_index,
                display_frame: frame,
                analysis: FrameAnalysis::Skipped,
            });
        }

        let (frame, landmarks) = self.detect(frame)?;
        let analysis = match landmarks {
            None => self.on_no_body(),
            Some(landmarks) => {
                self.session.absence_run = 0;
                self.analyze(&landmarks)
            }
        };

        Ok(FrameOutcome {
            frame_index,
            display_frame: frame,
            analysis,
        })
    }

    /// Run the estimator on its worker thread; the frame travels there and back
    fn detect(&self, frame: RgbImage) -> Result<(RgbImage, Option<LandmarkSet>)> {
        let (frame, landmarks) = self.estimator.call(self.options.stall_timeout, move |estimator| {
            let landmarks = estimator.detect(&frame);
            (frame, landmarks)
        })?;
        Ok((frame, landmarks?))
    }

    fn on_no_body(&mut self) -> FrameAnalysis {
        let session = &mut self.session;
        session.absence_run = session.absence_run.saturating_add(1);

        let limit = self.options.absence_reset_frames;
        let alert_event = if limit > 0 && session.absence_run == limit {
            info!("No body detected for {limit} analyzed frames, resetting alert state");
            session.alert.clear()
        } else {
            AlertEvent::None
        };
        FrameAnalysis::NoBody { alert_event }
    }

    fn analyze(&mut self, landmarks: &LandmarkSet) -> FrameAnalysis {
        let session = &mut self.session;
        let fingerprint = landmarks.fingerprint();

        let cached = fingerprint.as_ref().and_then(|fp| session.cache.lookup(fp));
        let (classification, cache_hit) = if let Some(classification) = cached {
            (classification, true)
        } else {
            let Some(classification) = session.classifier.classify(Some(landmarks)) else {
                return FrameAnalysis::Unclassified;
            };
            if let Some(fp) = fingerprint {
                session.cache.insert(fp, classification);
            }
            (classification, false)
        };

        debug!(
            "Verdict: {} (neck {:.1}°, spine {:.1}°{})",
            classification.verdict.label(),
            classification.angles.neck,
            classification.angles.spine,
            if cache_hit { ", cached" } else { "" }
        );

        let alert_event = session.alert.update(&classification.verdict);
        FrameAnalysis::Classified {
            classification,
            cache_hit,
            alert_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classifier::ErrorKind, estimator::ReplayEstimator, landmarks::LandmarkId};

    fn good_posture() -> LandmarkSet {
        LandmarkSet::new()
            .with(LandmarkId::Nose, (0.5, 0.3))
            .with(LandmarkId::LeftShoulder, (0.4, 0.5))
            .with(LandmarkId::RightShoulder, (0.6, 0.5))
            .with(LandmarkId::LeftHip, (0.45, 0.8))
            .with(LandmarkId::RightHip, (0.55, 0.8))
    }

    fn scheduler(frames: Vec<Option<LandmarkSet>>, skip_frames: u32) -> FrameScheduler {
        let options = SchedulerOptions {
            skip_frames,
            processing_width: 8,
            processing_height: 6,
            stall_timeout: None,
            absence_reset_frames: 3,
        };
        let session = AnalysisSession::new(
            PostureClassifier::default(),
            LandmarkCache::new(5),
            AlertEngine::default(),
        );
        FrameScheduler::new(Box::new(ReplayEstimator::new(frames, true)), session, options).unwrap()
    }

    #[test]
    fn test_skip_policy() {
        let policy = SkipPolicy::new(2);
        let analyzed: Vec<u64> = (0..9).filter(|&i| policy.should_analyze(i)).collect();
        assert_eq!(analyzed, vec![0, 3, 6]);

        let every = SkipPolicy::new(0);
        assert!((0..5).all(|i| every.should_analyze(i)));
    }

    #[test]
    fn test_frames_are_normalized() {
        let mut scheduler = scheduler(vec![Some(good_posture())], 0);
        let raw = RgbImage::new(32, 24);
        let outcome = scheduler.process(&raw, &CameraSettings::default()).unwrap();
        assert_eq!(outcome.display_frame.dimensions(), (8, 6));
        assert_eq!(outcome.frame_index, 0);
    }

    #[test]
    fn test_second_identical_frame_hits_cache() {
        let mut scheduler = scheduler(vec![Some(good_posture())], 0);
        let raw = RgbImage::new(8, 6);
        let settings = CameraSettings::default();

        let first = scheduler.process(&raw, &settings).unwrap();
        let second = scheduler.process(&raw, &settings).unwrap();
        assert!(matches!(first.analysis, FrameAnalysis::Classified { cache_hit: false, .. }));
        assert!(matches!(second.analysis, FrameAnalysis::Classified { cache_hit: true, .. }));
        assert_eq!(first.verdict(), second.verdict());
        assert_eq!(first.angles(), second.angles());
    }

    #[test]
    fn test_missing_joint_is_unclassified() {
        let partial = LandmarkSet::new().with(LandmarkId::Nose, (0.5, 0.3));
        let mut scheduler = scheduler(vec![Some(partial)], 0);
        let outcome = scheduler.process(&RgbImage::new(8, 6), &CameraSettings::default()).unwrap();
        assert_eq!(outcome.analysis, FrameAnalysis::Unclassified);
        assert_eq!(scheduler.session().alert_state(), AlertState::default());
    }

    #[test]
    fn test_absence_resets_alert_once() {
        let curved = LandmarkSet::new()
            .with(LandmarkId::Nose, (0.5, 0.3))
            .with(LandmarkId::LeftShoulder, (0.4, 0.5))
            .with(LandmarkId::RightShoulder, (0.6, 0.5))
            .with(LandmarkId::LeftHip, (0.45, 0.8))
            .with(LandmarkId::RightHip, (0.45, 0.5));
        let mut frames = vec![Some(curved)];
        frames.extend(std::iter::repeat(None).take(4));
        let mut scheduler = scheduler(frames, 0);
        let raw = RgbImage::new(8, 6);
        let settings = CameraSettings::default();

        let first = scheduler.process(&raw, &settings).unwrap();
        assert_eq!(
            first.verdict().and_then(|v| v.error_kind()),
            Some(ErrorKind::SpineTooCurved)
        );
        assert_eq!(scheduler.session().alert_state().bad_posture_run_length, 1);

        let events: Vec<AlertEvent> = (0..4)
            .map(|_| scheduler.process(&raw, &settings).unwrap().alert_event().cloned().unwrap())
            .collect();
        assert_eq!(
            events,
            vec![AlertEvent::None, AlertEvent::None, AlertEvent::Cleared, AlertEvent::None]
        );
        assert_eq!(scheduler.session().alert_state().bad_posture_run_length, 0);
    }

    #[test]
    fn test_reset_session() {
        let mut scheduler = scheduler(vec![Some(good_posture())], 0);
        scheduler.process(&RgbImage::new(8, 6), &CameraSettings::default()).unwrap();
        assert_eq!(scheduler.session().frame_counter(), 1);
        assert_eq!(scheduler.session().cache().len(), 1);

        scheduler.reset_session();
        assert_eq!(scheduler.session().frame_counter(), 0);
        assert!(scheduler.session().cache().is_empty());
    }

    #[test]
    fn test_zero_processing_size_rejected() {
        let options = SchedulerOptions {
            processing_width: 0,
            ..SchedulerOptions::default()
        };
        let session = AnalysisSession::new(
            PostureClassifier::default(),
            LandmarkCache::new(5),
            AlertEngine::default(),
        );
        assert!(FrameScheduler::new(Box::new(ReplayEstimator::new(vec![], false)), session, options).is_err());
    }
}
