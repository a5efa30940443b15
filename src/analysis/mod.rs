//! Offline analysis: frame decomposition, chunk segmentation, contour fitting.

pub mod chunks;
pub mod contour;
pub mod frames;

pub use chunks::detect_chunks;
pub use contour::fit_pitch_contour;
pub use frames::decompose;
