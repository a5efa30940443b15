//! Handing providers from the edit thread to the audio callback.
//!
//! The two halves talk only through fixed-capacity SPSC rings, so the audio
//! side never locks or allocates. Providers it is done with travel back
//! through a second ring and are dropped by the control side.

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::error::IntonationError;

use super::provider::{AudioProvider, TerminateHandle};

/// A provider that can be sent to the audio thread.
pub type BoxedProvider = Box<dyn AudioProvider>;

/// Pending commands from control to sink.
const COMMAND_CAPACITY: usize = 4;
/// Providers awaiting disposal. Every provider retires at most once and the
/// control side collects before each send, so this never overflows.
const RETIRED_CAPACITY: usize = 2 * COMMAND_CAPACITY;

enum Command {
    Play(BoxedProvider),
    Cut,
}

/// Edit-thread half: starts, stops, and disposes of providers.
pub struct PlaybackControl {
    commands: HeapProd<Command>,
    retired: HeapCons<BoxedProvider>,
    current: Option<TerminateHandle>,
}

/// Audio-thread half: pulls samples from the installed provider.
pub struct PlaybackSink {
    commands: HeapCons<Command>,
    retired: HeapProd<BoxedProvider>,
    current: Option<BoxedProvider>,
}

/// Creates a connected control/sink pair.
pub fn channel() -> (PlaybackControl, PlaybackSink) {
    let (cmd_tx, cmd_rx) = HeapRb::<Command>::new(COMMAND_CAPACITY).split();
    let (ret_tx, ret_rx) = HeapRb::<BoxedProvider>::new(RETIRED_CAPACITY).split();
    (
        PlaybackControl {
            commands: cmd_tx,
            retired: ret_rx,
            current: None,
        },
        PlaybackSink {
            commands: cmd_rx,
            retired: ret_tx,
            current: None,
        },
    )
}

impl PlaybackControl {
    /// Replaces whatever is playing with `provider`.
    pub fn play(&mut self, provider: BoxedProvider) -> Result<(), IntonationError> {
        self.collect_retired();
        let handle = provider.terminate_handle();
        self.commands
            .try_push(Command::Play(provider))
            .map_err(|_| IntonationError::QueueFull)?;
        self.current = Some(handle);
        Ok(())
    }

    /// Asks the current provider to drain gracefully.
    pub fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.terminate();
        }
    }

    /// Silences output immediately, without draining.
    pub fn cut(&mut self) -> Result<(), IntonationError> {
        self.collect_retired();
        self.commands
            .try_push(Command::Cut)
            .map_err(|_| IntonationError::QueueFull)?;
        self.current = None;
        Ok(())
    }

    /// Drops providers the audio thread has finished with. Returns how many
    /// were collected.
    pub fn collect_retired(&mut self) -> usize {
        let mut count = 0;
        while let Some(provider) = self.retired.try_pop() {
            drop(provider);
            count += 1;
        }
        if count > 0 {
            log::trace!("collected {} retired providers", count);
        }
        count
    }
}

impl PlaybackSink {
    /// Fills `out` from the current provider and zero-fills the rest.
    ///
    /// Call from the audio callback. Never blocks, allocates, or drops a
    /// provider.
    pub fn process(&mut self, out: &mut [f32]) {
        while let Some(cmd) = self.commands.try_pop() {
            let next = match cmd {
                Command::Play(provider) => Some(provider),
                Command::Cut => None,
            };
            if let Some(old) = std::mem::replace(&mut self.current, next) {
                self.retire(old);
            }
        }

        let mut written = 0;
        while written < out.len() {
            let Some(provider) = self.current.as_mut() else {
                break;
            };
            let done = provider.provide(&mut out[written..]);
            if done == 0 {
                if let Some(old) = self.current.take() {
                    self.retire(old);
                }
                break;
            }
            written += done;
        }
        out[written..].fill(0.0);
    }

    /// True while a provider is installed.
    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    fn retire(&mut self, provider: BoxedProvider) {
        // Cannot fail; see RETIRED_CAPACITY.
        let _ = self.retired.try_push(provider);
    }
}
