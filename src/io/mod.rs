//! WAV input/output and project persistence.

pub mod project;
pub mod wav;

pub use project::{load_project, load_project_file, save_project, save_project_file};
pub use wav::{read_wav, read_wav_file, write_wav, write_wav_file, WavFormat};
