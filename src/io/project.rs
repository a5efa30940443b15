//! Saving and loading an analysed, edited track as a JSON project.
//!
//! The document stores the raw samples, the analysis frames, and the chunk
//! list as sequential records. Each record carries a `has_next` flag; the
//! last one must clear it. Analysis is not re-run on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::spline::HermiteSplinePoint;
use crate::core::types::{AnalysisFrame, AnalysisParams, Sample};
use crate::core::waveform::Waveform;
use crate::error::IntonationError;
use crate::track::{Chunk, ChunkList, Track};

/// Identifies a project document.
pub const PROJECT_MAGIC: &str = "intonation-project";
/// Current document version.
pub const PROJECT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ProjectDocument {
    magic: String,
    version: u32,
    sample_rate: u32,
    samples: Vec<Sample>,
    #[serde(default)]
    params: AnalysisParams,
    frames: Vec<AnalysisFrame>,
    chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkRecord {
    begin_frame: usize,
    end_frame: usize,
    begin: i64,
    end: i64,
    pitch: i32,
    voiced: bool,
    elastic: bool,
    #[serde(default)]
    pitch_contour: Vec<HermiteSplinePoint>,
    has_next: bool,
}

impl From<&Chunk> for ChunkRecord {
    fn from(c: &Chunk) -> Self {
        Self {
            begin_frame: c.begin_frame,
            end_frame: c.end_frame,
            begin: c.begin,
            end: c.end,
            pitch: c.pitch,
            voiced: c.voiced,
            elastic: c.elastic,
            pitch_contour: c.pitch_contour.clone(),
            has_next: c.next().is_some(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> IntonationError {
    IntonationError::InvalidFormat(msg.into())
}

/// Serializes a track to a JSON string.
pub fn save_project(track: &Track) -> Result<String, IntonationError> {
    let doc = ProjectDocument {
        magic: PROJECT_MAGIC.to_string(),
        version: PROJECT_VERSION,
        sample_rate: track.sample_rate(),
        samples: track.waveform().samples().to_vec(),
        params: track.params().clone(),
        frames: track.frames().to_vec(),
        chunks: track.chunks().iter().map(|(_, c)| ChunkRecord::from(c)).collect(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Writes a track to a JSON project file.
pub fn save_project_file(track: &Track, path: impl AsRef<Path>) -> Result<(), IntonationError> {
    let path = path.as_ref();
    fs::write(path, save_project(track)?)?;
    log::info!("saved project {} ({} chunks)", path.display(), track.chunks().len());
    Ok(())
}

/// Rebuilds a track from a JSON project string.
pub fn load_project(json: &str) -> Result<Track, IntonationError> {
    let doc: ProjectDocument = serde_json::from_str(json)?;

    if doc.magic != PROJECT_MAGIC {
        return Err(invalid(format!("not a project document: magic {:?}", doc.magic)));
    }
    if doc.version != PROJECT_VERSION {
        return Err(invalid(format!("unsupported project version {}", doc.version)));
    }
    doc.params
        .validate()
        .map_err(|e| invalid(format!("stored parameters: {}", e)))?;

    let wave = Waveform::new(doc.samples, doc.sample_rate)
        .map_err(|e| invalid(format!("stored waveform: {}", e)))?;

    let mut chunks = ChunkList::new();
    let count = doc.chunks.len();
    for (i, rec) in doc.chunks.into_iter().enumerate() {
        if rec.has_next != (i + 1 < count) {
            return Err(invalid(format!("chunk record {} has a bad continuation flag", i)));
        }
        if rec.pitch_contour.windows(2).any(|w| !(w[1].t > w[0].t)) {
            return Err(invalid(format!("chunk record {} has an unordered contour", i)));
        }
        let mut chunk = Chunk::new(
            rec.begin_frame,
            rec.end_frame,
            rec.begin,
            rec.end,
            rec.pitch,
            rec.voiced,
        );
        chunk.elastic = rec.elastic;
        chunk.pitch_contour = rec.pitch_contour;
        chunks.push_back(chunk);
    }

    Track::from_parts(wave, doc.frames, chunks, doc.params)
}

/// Reads a track from a JSON project file.
pub fn load_project_file(path: impl AsRef<Path>) -> Result<Track, IntonationError> {
    let path = path.as_ref();
    let track = load_project(&fs::read_to_string(path)?)?;
    log::info!("loaded project {} ({} chunks)", path.display(), track.chunks().len());
    Ok(track)
}
