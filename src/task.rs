//! Generation-tagged background jobs
//!
//! A [`TaskSlot`] runs one logical operation at a time on a helper thread.
//! Starting a new job or cancelling bumps the generation; results carrying an
//! older generation are dropped when drained, so a superseded load can never
//! be applied.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::debug;

/// Identifies one submission to a [`TaskSlot`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct TaskSlot<T> {
    name: &'static str,
    generation: u64,
    pending: bool,
    tx: Sender<(u64, T)>,
    rx: Receiver<(u64, T)>,
}

impl<T: Send + 'static> TaskSlot<T> {
    pub fn new(name: &'static str) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            name,
            generation: 0,
            pending: false,
            tx,
            rx,
        }
    }

    /// Run `job` on a helper thread, superseding any job still in flight
    pub fn spawn<F>(&mut self, job: F) -> io::Result<Ticket>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();

        thread::Builder::new()
            .name(format!("docview-{}", self.name))
            .spawn(move || {
                let result = job();
                // The slot may be gone by now; nothing to report to.
                let _ = tx.send((generation, result));
            })?;

        self.pending = true;
        Ok(Ticket(generation))
    }

    /// Forget the in-flight job; its result will be discarded
    pub fn cancel(&mut self) {
        if self.pending {
            debug!("{} task {} cancelled", self.name, self.generation);
        }
        self.generation += 1;
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn current(&self) -> Ticket {
        Ticket(self.generation)
    }

    /// Take the current job's result if it has arrived
    pub fn try_take(&mut self) -> Option<T> {
        while let Ok((generation, result)) = self.rx.try_recv() {
            if let Some(result) = self.accept(generation, result) {
                return Some(result);
            }
        }
        None
    }

    /// Block up to `timeout` for the current job's result
    pub fn wait(&mut self, timeout: Duration) -> Option<T> {
        if !self.pending {
            return None;
        }
        let deadline = Instant::now() + timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok((generation, result)) => {
                    if let Some(result) = self.accept(generation, result) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn accept(&mut self, generation: u64, result: T) -> Option<T> {
        if generation == self.generation && self.pending {
            self.pending = false;
            Some(result)
        } else {
            debug!(
                "{} task discarded stale result {generation} (current {})",
                self.name, self.generation
            );
            None
        }
    }
}
