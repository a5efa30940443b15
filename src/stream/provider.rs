//! The pull interface between renderers and the audio device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared request to stop scheduling new grains and drain.
///
/// Written by the edit thread and polled by the audio thread. Visibility is
/// eventual; no ordering with other memory is implied.
#[derive(Debug, Clone, Default)]
pub struct TerminateHandle {
    flag: Arc<AtomicBool>,
}

impl TerminateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a graceful drain.
    pub fn terminate(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_terminating(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A source of mono output samples pulled by the audio callback.
pub trait AudioProvider: Send {
    /// Writes up to `out.len()` samples and returns how many were written.
    ///
    /// Fewer than requested means the stream ended inside this buffer;
    /// 0 means it was already exhausted. Must not block or allocate.
    fn provide(&mut self, out: &mut [f32]) -> usize;

    /// Handle that can ask this provider to drain from another thread.
    fn terminate_handle(&self) -> TerminateHandle;

    /// Requests a graceful drain: in-flight grains finish, no new ones start.
    fn terminate(&self) {
        self.terminate_handle().terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_is_shared() {
        let handle = TerminateHandle::new();
        let other = handle.clone();
        assert!(!other.is_terminating());
        handle.terminate();
        assert!(other.is_terminating());
    }
}
