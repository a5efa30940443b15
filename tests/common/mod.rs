#![allow(dead_code)]

use std::f32::consts::PI;

use intonation::core::correlation::CorrelationService;
use intonation::{AnalysisParams, AudioProvider, NoProgress, Track, Waveform};

pub fn gen_sine<F>(freq_hz: f32, sr: u32, n: usize, amp_fn: F) -> Vec<f32>
where
    F: Fn(usize) -> f32,
{
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * freq_hz * i as f32 / sr as f32;
            amp_fn(i) * phase.sin()
        })
        .collect()
}

/// Consecutive constant-frequency notes with a continuous phase.
pub fn gen_melody(notes: &[(f32, usize)], sr: u32, amp: f32) -> Vec<f32> {
    let mut out = Vec::new();
    let mut phase = 0.0f64;
    for &(freq, len) in notes {
        let step = 2.0 * std::f64::consts::PI * freq as f64 / sr as f64;
        for _ in 0..len {
            out.push(amp * phase.sin() as f32);
            phase += step;
        }
    }
    out
}

/// Deterministic white noise in `[-amp, amp]`.
pub fn gen_noise(n: usize, amp: f32, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747796405).wrapping_add(2891336453);
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            amp * (state as f32 / u32::MAX as f32 * 2.0 - 1.0)
        })
        .collect()
}

pub fn windowed_rms(signal: &[f32], start: usize, len: usize) -> f64 {
    if signal.is_empty() || len == 0 {
        return 0.0;
    }
    let start = start.min(signal.len());
    let end = (start + len).min(signal.len());
    if end <= start {
        return 0.0;
    }
    let sum_sq: f64 = signal[start..end]
        .iter()
        .map(|&s| {
            let v = s as f64;
            v * v
        })
        .sum();
    (sum_sq / (end - start) as f64).sqrt()
}

/// Fundamental frequency of `signal[start..start + n]` from its
/// autocorrelation: the strongest peak after the first negative lobe,
/// refined by parabolic interpolation.
pub fn estimate_fundamental(signal: &[f32], sr: u32, start: usize, n: usize) -> f64 {
    let block = &signal[start..start + n];
    let mut svc = CorrelationService::new(n);
    let mut out = vec![0.0f32; n];
    svc.run(block, block, &mut out);
    let ac = |lag: usize| out[n - 1 - lag] as f64 / (n - lag) as f64;

    let max_lag = n / 2;
    let Some(neg) = (1..max_lag).find(|&lag| ac(lag) < 0.0) else {
        return 0.0;
    };
    let mut best = neg;
    for lag in neg..max_lag {
        if ac(lag) > ac(best) {
            best = lag;
        }
    }
    let (a, b, c) = (ac(best - 1), ac(best), ac(best + 1));
    let denom = a - 2.0 * b + c;
    let offset = if denom.abs() > 1e-12 {
        0.5 * (a - c) / denom
    } else {
        0.0
    };
    sr as f64 / (best as f64 + offset)
}

pub fn expected_pitch(freq_hz: f32) -> f32 {
    12.0 * (freq_hz / 440.0).log2() + 69.0
}

pub fn analyze(samples: Vec<f32>, sr: u32) -> Track {
    let wave = Waveform::new(samples, sr).unwrap();
    Track::analyze(wave, AnalysisParams::default(), &mut NoProgress).unwrap()
}

/// Pulls `provider` until it reports end of stream.
pub fn drain<P: AudioProvider + ?Sized>(provider: &mut P, block: usize) -> Vec<f32> {
    let mut out = Vec::new();
    let mut buf = vec![0.0f32; block];
    loop {
        let n = provider.provide(&mut buf);
        out.extend_from_slice(&buf[..n]);
        if n < block {
            break;
        }
    }
    out
}
