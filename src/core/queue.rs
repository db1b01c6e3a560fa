//! Per-kind request queue: FIFO + condition variable + busy flag.
//!
//! Producers push from any thread; exactly one worker pops. Pushing after the
//! generator stopped hands the job back so the caller can fulfill it
//! synchronously.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, trace};

/// A queued request.
pub(crate) trait Job {
    fn id(&self) -> u64;

    /// Fulfill with the default value without doing any work.
    fn abandon(self);
}

pub(crate) struct Queue<J> {
    name: &'static str,
    jobs: Mutex<VecDeque<J>>,
    cv: Condvar,
    processing: AtomicBool,
}

impl<J: Job> Queue<J> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            jobs: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            processing: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<J>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue unless stopped. `running` is read under the queue lock so a
    /// job can never slip in after the worker's final drain.
    pub fn push(&self, job: J, running: &AtomicBool) -> Result<(), J> {
        {
            let mut jobs = self.lock();
            if !running.load(Ordering::SeqCst) {
                return Err(job);
            }
            trace!("{} queue: push #{}", self.name, job.id());
            jobs.push_back(job);
        }
        self.cv.notify_one();
        Ok(())
    }

    /// Oldest job, waiting at most `timeout`. None on timeout or shutdown.
    ///
    /// A popped job marks the queue as processing before the lock is released,
    /// so `is_busy` always sees it either queued or in flight.
    pub fn pop(&self, running: &AtomicBool, timeout: Duration) -> Option<J> {
        let jobs = self.lock();
        let (mut jobs, _) = self
            .cv
            .wait_timeout_while(jobs, timeout, |q| q.is_empty() && running.load(Ordering::SeqCst))
            .unwrap_or_else(|e| e.into_inner());
        if !running.load(Ordering::SeqCst) {
            return None;
        }
        let job = jobs.pop_front();
        if job.is_some() {
            self.processing.store(true, Ordering::SeqCst);
        }
        job
    }

    /// Remove not-yet-started jobs with matching ids. Returns them unfulfilled.
    pub fn take_ids(&self, ids: &HashSet<u64>) -> Vec<J> {
        let mut jobs = self.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(jobs.len());
        for job in jobs.drain(..) {
            if ids.contains(&job.id()) {
                taken.push(job);
            } else {
                kept.push_back(job);
            }
        }
        *jobs = kept;
        taken
    }

    pub fn drain(&self) -> Vec<J> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Queued or in flight, read under the queue lock.
    pub fn is_busy(&self) -> bool {
        let jobs = self.lock();
        !jobs.is_empty() || self.processing.load(Ordering::SeqCst)
    }

    pub fn wake(&self) {
        // Lock so a worker between its predicate check and wait cannot miss it
        let _jobs = self.lock();
        self.cv.notify_all();
    }

    /// Worker loop: pop FIFO until stopped, then abandon whatever is left.
    pub fn run(&self, running: &AtomicBool, timeout: Duration, mut process: impl FnMut(J)) {
        debug!("{} worker started", self.name);
        while running.load(Ordering::SeqCst) {
            if let Some(job) = self.pop(running, timeout) {
                process(job);
                self.processing.store(false, Ordering::SeqCst);
            }
        }
        let remaining = self.drain();
        if !remaining.is_empty() {
            debug!("{} worker: abandoning {} queued requests", self.name, remaining.len());
        }
        for job in remaining {
            job.abandon();
        }
        debug!("{} worker stopped", self.name);
    }
}
