use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

/// Publishes download progress as a fraction in `0.0..=1.0`.
///
/// Every load holds a [`ProgressGuard`] while it runs. The first guard of a
/// quiet period resets the value to `0.0` and dropping the last one
/// publishes `1.0`, whether the load succeeded or not. In between the
/// published value only grows, even with several loads in flight.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<f64>,
    active: AtomicUsize,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self {
            tx,
            active: AtomicUsize::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> f64 {
        *self.tx.borrow()
    }

    pub fn start(&self) -> ProgressGuard<'_> {
        if self.active.fetch_add(1, Ordering::SeqCst) == 0 {
            self.tx.send_replace(0.0);
        }
        ProgressGuard { reporter: self }
    }

    pub fn report(&self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.tx.send_if_modified(|current| {
            if fraction > *current {
                *current = fraction;
                true
            } else {
                false
            }
        });
    }
}

/// Marks one load in flight; see [`ProgressReporter::start`].
#[derive(Debug)]
pub struct ProgressGuard<'a> {
    reporter: &'a ProgressReporter,
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        if self.reporter.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.reporter.tx.send_replace(1.0);
        }
    }
}
