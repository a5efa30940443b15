//! Pull-based PSOLA rendering, playback hand-off, and offline export.

pub mod chunk_player;
pub mod export;
pub mod mixer;
pub mod playback;
pub mod provider;
pub mod renderer;

pub use chunk_player::ChunkPlayer;
pub use export::{export_to_vec, export_wav_file};
pub use playback::{channel, BoxedProvider, PlaybackControl, PlaybackSink};
pub use provider::{AudioProvider, TerminateHandle};
pub use renderer::Renderer;
