use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::device::CompletionHandler;

/// Counting semaphore bounding the number of frames in flight.
///
/// `acquire` blocks on a condition variable until a permit is free. A permit is returned by
/// the completion handler it is converted into, which the command queue runs when the device
/// reports the submission finished; the submitting thread has no way to release early.
pub struct FrameSynchronizer {
    shared: Arc<Shared>,
}

struct Shared {
    capacity: usize,
    state: Mutex<State>,
    freed: Condvar,
}

#[derive(Default)]
struct State {
    in_flight: usize,
    completed: u64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, completed: bool) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if completed {
            state.completed += 1;
        }
        drop(state);
        self.freed.notify_all();
    }
}

impl FrameSynchronizer {
    /// Creates a synchronizer with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity: capacity.max(1),
                state: Mutex::new(State::default()),
                freed: Condvar::new(),
            }),
        }
    }

    /// Blocks until a permit is free and takes it.
    ///
    /// There is no timeout: a stalled device stalls the caller.
    pub fn acquire(&self) -> FramePermit {
        let cap = self.shared.capacity;
        let mut state = self
            .shared
            .freed
            .wait_while(self.shared.lock(), |s| s.in_flight >= cap)
            .unwrap_or_else(PoisonError::into_inner);
        state.in_flight += 1;
        FramePermit {
            shared: Some(self.shared.clone()),
        }
    }

    #[cfg(test)]
    fn try_acquire(&self) -> Option<FramePermit> {
        let mut state = self.shared.lock();
        if state.in_flight >= self.shared.capacity {
            return None;
        }
        state.in_flight += 1;
        Some(FramePermit {
            shared: Some(self.shared.clone()),
        })
    }

    /// Blocks until every permit has been returned.
    pub fn wait_idle(&self) {
        let _idle = self
            .shared
            .freed
            .wait_while(self.shared.lock(), |s| s.in_flight > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    /// Permits returned by a completion handler so far.
    pub fn completed(&self) -> u64 {
        self.shared.lock().completed
    }
}

/// One frame slot.
///
/// Dropping a permit that never reached a queue hands the slot back without counting a
/// completion.
pub struct FramePermit {
    shared: Option<Arc<Shared>>,
}

impl FramePermit {
    /// Converts the permit into the one-shot handler registered with the submission.
    ///
    /// The handler owns the permit. A queue that drops the handler without running it (device
    /// loss, failed submission) still frees the slot, but no completion is counted.
    pub fn into_completion_handler(self) -> CompletionHandler {
        Box::new(move || self.complete())
    }

    /// Returns the slot and counts the frame as completed.
    pub fn complete(mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release(true);
        }
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release(false);
        }
    }
}
