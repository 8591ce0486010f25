//! Audible alert loop running on its own thread.
//!
//! While an alert is active the notifier plays a sound once per period.
//! Stopping wakes the worker through a channel instead of a polled flag, so
//! shutdown never waits longer than the sound currently playing.

use crate::{constants::DEFAULT_SOUND_PERIOD_MS, Error, Result};
use log::{debug, warn};
use std::io::Write;
use std::sync::{
    mpsc::{self, RecvTimeoutError},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something that can make a noise
pub trait AlertSound: Send + Sync {
    fn play(&self) -> Result<()>;
}

/// Rings the terminal bell on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl AlertSound for TerminalBell {
    fn play(&self) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| Error::Notification(format!("Terminal bell failed: {e}")))
    }
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Start/stop controller for the repeating alert sound
pub struct AlertNotifier {
    period: Duration,
    sound: Arc<dyn AlertSound>,
    worker: Option<Worker>,
}

impl std::fmt::Debug for AlertNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertNotifier")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Default for AlertNotifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SOUND_PERIOD_MS), Arc::new(TerminalBell))
    }
}

impl AlertNotifier {
    #[must_use]
    pub fn new(period: Duration, sound: Arc<dyn AlertSound>) -> Self {
        Self {
            period,
            sound,
            worker: None,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the sound loop. Does nothing if it is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let sound = Arc::clone(&self.sound);
        let period = self.period;

        let handle = thread::Builder::new()
            .name("alert-sound".to_string())
            .spawn(move || loop {
                if let Err(e) = sound.play() {
                    warn!("Alert sound failed: {e}");
                }
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Stop requested or controller dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| Error::Notification(format!("Failed to spawn alert thread: {e}")))?;

        debug!("Alert sound started (period {:?})", period);
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    /// Stop the sound loop and wait for the worker to exit. Idempotent.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // A send error only means the worker already exited
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            warn!("Alert sound thread panicked");
        }
        debug!("Alert sound stopped");
    }
}

impl Drop for AlertNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct CountingSound {
        plays: AtomicUsize,
    }

    impl AlertSound for CountingSound {
        fn play(&self) -> Result<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_start_plays_immediately() {
        let sound = Arc::new(CountingSound::default());
        let mut notifier = AlertNotifier::new(Duration::from_secs(5), sound.clone());
        notifier.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while sound.plays.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        notifier.stop();
        assert_eq!(sound.plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_does_not_wait_for_period() {
        let sound = Arc::new(CountingSound::default());
        let mut notifier = AlertNotifier::new(Duration::from_secs(30), sound);
        notifier.start().unwrap();

        let started = Instant::now();
        notifier.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!notifier.is_running());
    }

    #[test]
    fn test_start_stop_idempotent() {
        let sound = Arc::new(CountingSound::default());
        let mut notifier = AlertNotifier::new(Duration::from_millis(100), sound);
        notifier.stop();
        notifier.start().unwrap();
        notifier.start().unwrap();
        assert!(notifier.is_running());
        notifier.stop();
        notifier.stop();
        assert!(!notifier.is_running());
        notifier.start().unwrap();
        assert!(notifier.is_running());
    }

    #[test]
    fn test_repeats_while_running() {
        let sound = Arc::new(CountingSound::default());
        let mut notifier = AlertNotifier::new(Duration::from_millis(20), sound.clone());
        notifier.start().unwrap();
        thread::sleep(Duration::from_millis(200));
        notifier.stop();
        let plays = sound.plays.load(Ordering::SeqCst);
        assert!(plays >= 2, "expected repeated plays, got {plays}");

        thread::sleep(Duration::from_millis(60));
        assert_eq!(sound.plays.load(Ordering::SeqCst), plays);
    }
}
