use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::core::types::Sample;
use crate::core::waveform::Waveform;
use crate::error::IntonationError;

/// Sample encoding for written WAV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavFormat {
    /// 16-bit signed PCM.
    #[default]
    Int16,
    /// 32-bit IEEE float.
    Float32,
}

impl WavFormat {
    fn spec(self, sample_rate: u32) -> WavSpec {
        match self {
            WavFormat::Int16 => WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
            WavFormat::Float32 => WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        }
    }
}

fn decode<R: Read>(reader: WavReader<R>) -> Result<Waveform, IntonationError> {
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(IntonationError::UnsupportedChannels(spec.channels));
    }

    let samples: Vec<Sample> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
        (fmt, bits) => {
            return Err(IntonationError::InvalidFormat(format!(
                "unsupported WAV sample format: {:?} {}-bit",
                fmt, bits
            )))
        }
    };

    Waveform::new(samples, spec.sample_rate)
}

/// Reads a mono WAV file from a byte slice.
pub fn read_wav(data: &[u8]) -> Result<Waveform, IntonationError> {
    decode(WavReader::new(Cursor::new(data))?)
}

/// Reads a mono WAV file from disk.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<Waveform, IntonationError> {
    let path = path.as_ref();
    let wave = decode(WavReader::open(path)?)?;
    log::info!(
        "loaded {}: {} samples at {} Hz",
        path.display(),
        wave.len(),
        wave.sample_rate()
    );
    Ok(wave)
}

/// Incremental mono WAV writer used by export.
pub struct WavSink<W: Write + Seek> {
    writer: WavWriter<W>,
    format: WavFormat,
}

impl WavSink<BufWriter<File>> {
    /// Creates (or truncates) a WAV file at `path`.
    pub fn create(
        path: impl AsRef<Path>,
        sample_rate: u32,
        format: WavFormat,
    ) -> Result<Self, IntonationError> {
        Ok(Self {
            writer: WavWriter::create(path, format.spec(sample_rate))?,
            format,
        })
    }
}

impl<W: Write + Seek> WavSink<W> {
    pub fn new(inner: W, sample_rate: u32, format: WavFormat) -> Result<Self, IntonationError> {
        Ok(Self {
            writer: WavWriter::new(inner, format.spec(sample_rate))?,
            format,
        })
    }

    /// Appends samples, clamping to [-1, 1] for integer output.
    pub fn write(&mut self, samples: &[Sample]) -> Result<(), IntonationError> {
        match self.format {
            WavFormat::Float32 => {
                for &s in samples {
                    self.writer.write_sample(s)?;
                }
            }
            WavFormat::Int16 => {
                for &s in samples {
                    let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                    self.writer.write_sample(v)?;
                }
            }
        }
        Ok(())
    }

    /// Writes the final header sizes.
    pub fn finalize(self) -> Result<(), IntonationError> {
        self.writer.finalize()?;
        Ok(())
    }
}

/// Encodes mono samples as an in-memory WAV file.
pub fn write_wav(
    samples: &[Sample],
    sample_rate: u32,
    format: WavFormat,
) -> Result<Vec<u8>, IntonationError> {
    let mut cursor = Cursor::new(Vec::new());
    let mut sink = WavSink::new(&mut cursor, sample_rate, format)?;
    sink.write(samples)?;
    sink.finalize()?;
    Ok(cursor.into_inner())
}

/// Writes mono samples to a WAV file on disk.
pub fn write_wav_file(
    path: impl AsRef<Path>,
    samples: &[Sample],
    sample_rate: u32,
    format: WavFormat,
) -> Result<(), IntonationError> {
    let mut sink = WavSink::create(path, sample_rate, format)?;
    sink.write(samples)?;
    sink.finalize()
}
