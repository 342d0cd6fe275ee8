use std::collections::BTreeSet;

use tracing::{debug, warn};

/// Callback run once when every expected mount reported readiness.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Result of one readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierProgress {
    /// More mounts are outstanding.
    Pending {
        /// Distinct mounts ready so far.
        ready: usize,
        /// Expected mount count.
        target: usize,
    },
    /// This signal completed the barrier.
    Completed,
    /// The mount had already signalled; ignored.
    Duplicate,
    /// The barrier completed earlier; ignored.
    AlreadyCompleted,
}

/// Counter collecting one readiness signal per planned field mount.
pub struct InitializationBarrier {
    target: usize,
    ready: BTreeSet<usize>,
    completed: bool,
    callbacks: Vec<CompletionCallback>,
}

impl InitializationBarrier {
    /// Creates a barrier expecting `target` distinct mounts.
    #[must_use]
    pub fn new(target: usize) -> Self {
        Self {
            target,
            ready: BTreeSet::new(),
            completed: false,
            callbacks: Vec::new(),
        }
    }

    /// Returns the expected mount count.
    #[must_use]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Returns the number of distinct mounts that signalled.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Returns whether the barrier reached its target.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Records readiness of `mount`.
    ///
    /// The caller runs the consolidated refresh and then [`Self::fire`]
    /// when this returns [`BarrierProgress::Completed`].
    pub fn signal(&mut self, mount: usize) -> BarrierProgress {
        if self.completed {
            warn!(mount, "readiness signalled after initialization completed");
            return BarrierProgress::AlreadyCompleted;
        }
        if !self.ready.insert(mount) {
            warn!(mount, "duplicate readiness signal ignored");
            return BarrierProgress::Duplicate;
        }

        debug!(mount, ready = self.ready.len(), target = self.target, "field mount ready");
        if self.ready.len() >= self.target {
            self.completed = true;
            return BarrierProgress::Completed;
        }

        BarrierProgress::Pending {
            ready: self.ready.len(),
            target: self.target,
        }
    }

    /// Marks an empty barrier as completed; returns whether it did.
    pub fn complete_if_empty(&mut self) -> bool {
        if self.target == 0 && !self.completed {
            self.completed = true;
            return true;
        }
        false
    }

    /// Registers a completion callback.
    ///
    /// Callbacks registered after completion are returned for immediate
    /// execution by the caller.
    pub fn on_complete(&mut self, callback: CompletionCallback) -> Option<CompletionCallback> {
        if self.completed {
            return Some(callback);
        }
        self.callbacks.push(callback);
        None
    }

    /// Runs and drops every pending completion callback.
    pub fn fire(&mut self) {
        for callback in self.callbacks.drain(..) {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{BarrierProgress, InitializationBarrier};

    #[test]
    fn completes_exactly_once_after_every_distinct_mount() {
        let mut barrier = InitializationBarrier::new(3);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        assert!(
            barrier
                .on_complete(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .is_none()
        );

        assert_eq!(barrier.signal(0), BarrierProgress::Pending { ready: 1, target: 3 });
        assert_eq!(barrier.signal(0), BarrierProgress::Duplicate);
        assert_eq!(barrier.signal(2), BarrierProgress::Pending { ready: 2, target: 3 });
        assert_eq!(barrier.signal(1), BarrierProgress::Completed);
        barrier.fire();
        assert_eq!(barrier.signal(1), BarrierProgress::AlreadyCompleted);
        barrier.fire();

        assert!(barrier.is_completed());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_barrier_completes_immediately() {
        let mut barrier = InitializationBarrier::new(0);
        assert!(barrier.complete_if_empty());
        assert!(!barrier.complete_if_empty());

        let late = barrier.on_complete(Box::new(|| {}));
        assert!(late.is_some());
    }
}
