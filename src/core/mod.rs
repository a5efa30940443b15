//! Core types, waveform storage, correlation, spline math, and grain windows.

pub mod correlation;
pub mod ring_buffer;
pub mod spline;
pub mod types;
pub mod waveform;
pub mod window;

pub use types::*;
pub use waveform::Waveform;
