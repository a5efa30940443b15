//! WAV and project files on disk.

mod common;

use common::*;
use intonation::io::{
    load_project, load_project_file, read_wav_file, save_project, save_project_file,
    write_wav_file, WavFormat,
};
use intonation::stream::export_wav_file;
use intonation::{AnalysisParams, IntonationError, NoProgress};

const SR: u32 = 22050;

#[test]
fn test_analyze_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let samples = gen_sine(220.0, SR, 11025, |_| 0.5);
    write_wav_file(&path, &samples, SR, WavFormat::Int16).unwrap();

    let track = intonation::analyze_file(&path, AnalysisParams::default(), &mut NoProgress).unwrap();
    assert_eq!(track.sample_rate(), SR);
    assert_eq!(track.waveform().len(), samples.len());
    assert!(track.chunks().iter().any(|(_, c)| c.voiced && c.pitch == 57));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_wav_file(dir.path().join("nope.wav")).unwrap_err();
    assert!(matches!(err, IntonationError::Wav(_) | IntonationError::Io(_)));
}

#[test]
fn test_stereo_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..1000 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let err = intonation::analyze_file(&path, AnalysisParams::default(), &mut NoProgress).unwrap_err();
    assert!(matches!(err, IntonationError::UnsupportedChannels(2)));
}

#[test]
fn test_edited_project_renders_identically_after_reload() {
    let mut track = analyze(gen_melody(&[(196.0, 6000), (261.63, 6000)], SR, 0.5), SR);
    let id = track
        .chunks()
        .iter()
        .find(|(_, c)| c.voiced)
        .map(|(id, _)| id)
        .unwrap();
    track.shift_chunk_pitch(id, 1.0).unwrap();
    track.correct_pitch(0.5).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("take.json");
    save_project_file(&track, &project).unwrap();
    let mut reloaded = load_project_file(&project).unwrap();

    assert_eq!(reloaded.chunks(), track.chunks());
    assert_eq!(reloaded.params(), track.params());

    let a = intonation::render(&mut track, &mut NoProgress).unwrap();
    let b = intonation::render(&mut reloaded, &mut NoProgress).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_project_string_is_stable() {
    let track = analyze(gen_sine(300.0, SR, 8000, |_| 0.5), SR);
    let first = save_project(&track).unwrap();
    let second = save_project(&load_project(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_export_wav_file_roundtrip() {
    let mut track = analyze(gen_sine(330.0, SR, 11025, |_| 0.5), SR);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.wav");

    let mut reports = Vec::new();
    let mut monitor = |f: f64| reports.push(f);
    let n = export_wav_file(track.snapshot(), &path, WavFormat::Int16, &mut monitor).unwrap();
    assert_eq!(reports.last().copied(), Some(1.0));

    let wave = read_wav_file(&path).unwrap();
    assert_eq!(wave.len(), n);
    assert_eq!(wave.sample_rate(), SR);
    let expected = intonation::render(&mut track, &mut NoProgress).unwrap();
    for (a, b) in wave.samples().iter().zip(&expected) {
        assert!((a - b).abs() < 1.0 / 16384.0);
    }
}
