//! Deadline-bounded calls into a blocking device.
//!
//! A [`ServiceWorker`] owns a device (camera, pose estimator) on its own
//! thread. Each call is shipped to that thread as a job and the caller waits
//! for the answer with `recv_timeout`, so a device call that hangs is reported
//! as [`Error::Stall`] instead of blocking the session forever.
//!
//! A hung job keeps the worker thread busy; later calls queue behind it and
//! time out the same way. Dropping the worker closes the job queue without
//! joining, so the thread exits once the hung call eventually returns.

use crate::{Error, Result};
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Thread owning a device of type `S`
pub struct ServiceWorker<S> {
    name: String,
    jobs: Option<mpsc::Sender<Job<S>>>,
    _handle: JoinHandle<()>,
}

impl<S> std::fmt::Debug for ServiceWorker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S: Send + 'static> ServiceWorker<S> {
    /// Move `service` onto a new thread called `name`
    pub fn spawn(name: &str, mut service: S) -> Result<Self> {
        let (jobs, job_rx) = mpsc::channel::<Job<S>>();
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            while let Ok(job) = job_rx.recv() {
                job(&mut service);
            }
        })?;

        debug!("Worker thread '{name}' started");
        Ok(Self {
            name: name.to_string(),
            jobs: Some(jobs),
            _handle: handle,
        })
    }

    /// Run `call` on the worker and wait for its result.
    ///
    /// `deadline` of `None` waits without limit.
    ///
    /// # Errors
    ///
    /// [`Error::Stall`] when no answer arrives within `deadline` or the
    /// worker thread has died (a panicking device call).
    pub fn call<R, F>(&self, deadline: Option<Duration>, call: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::sync_channel::<R>(1);
        let job: Job<S> = Box::new(move |service| {
            // The caller may have given up already
            let _ = reply_tx.send(call(service));
        });

        self.jobs
            .as_ref()
            .ok_or_else(|| self.dead())?
            .send(job)
            .map_err(|_| self.dead())?;

        match deadline {
            Some(limit) => reply_rx.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    warn!("{} did not answer within {} ms", self.name, limit.as_millis());
                    Error::Stall(format!("{} did not answer within {} ms", self.name, limit.as_millis()))
                }
                RecvTimeoutError::Disconnected => self.dead(),
            }),
            None => reply_rx.recv().map_err(|_| self.dead()),
        }
    }

    fn dead(&self) -> Error {
        Error::Stall(format!("{} worker thread is gone", self.name))
    }
}

impl<S> Drop for ServiceWorker<S> {
    fn drop(&mut self) {
        // Closing the queue ends the thread after its current job
        self.jobs.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_call_returns_result() {
        let worker = ServiceWorker::spawn("counter", 0u32).unwrap();
        for expected in 1..=3 {
            let value = worker
                .call(Some(Duration::from_secs(1)), |count| {
                    *count += 1;
                    *count
                })
                .unwrap();
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn test_hung_call_times_out() {
        let worker = ServiceWorker::spawn("sleeper", ()).unwrap();
        let started = Instant::now();
        let result = worker.call(Some(Duration::from_millis(20)), |()| {
            thread::sleep(Duration::from_secs(2));
        });

        assert!(matches!(result, Err(Error::Stall(_))));
        assert!(started.elapsed() < Duration::from_millis(500));

        // Later calls queue behind the hung one and time out as well
        let queued = worker.call(Some(Duration::from_millis(20)), |()| 1);
        assert!(matches!(queued, Err(Error::Stall(_))));
    }

    #[test]
    fn test_panicking_call_is_reported() {
        let worker = ServiceWorker::spawn("fragile", ()).unwrap();
        let result: Result<()> = worker.call(None, |()| panic!("device exploded"));
        assert!(matches!(result, Err(Error::Stall(_))));
        assert!(worker.call(None, |()| ()).is_err());
    }

    #[test]
    fn test_drop_does_not_wait_for_hung_call() {
        let worker = ServiceWorker::spawn("sleeper", ()).unwrap();
        let _ = worker.call(Some(Duration::from_millis(5)), |()| {
            thread::sleep(Duration::from_secs(2));
        });

        let started = Instant::now();
        drop(worker);
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
