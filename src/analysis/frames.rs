//! Frame decomposition: periodicity detection with octave-error correction.
//!
//! The scanner walks the waveform one detected period at a time (or a fixed
//! step through aperiodic regions), computing a normalized autocorrelation at
//! each position. Every candidate period is then scored against its integer
//! subdivisions and a Viterbi pass picks the cheapest voicing/subdivision path
//! over the whole file.

use crate::core::correlation::CorrelationService;
use crate::core::types::{frequency_to_pitch, AnalysisFrame, AnalysisParams, ProgressMonitor};
use crate::core::waveform::Waveform;
use crate::error::IntonationError;

/// Window energy below which the normalized correlation is treated as zero.
const ENERGY_EPSILON: f64 = 1e-12;
/// A later correlation peak must beat the current best by this margin.
const PEAK_IMPROVEMENT: f32 = 0.01;

/// Scan-time frame before the Viterbi pass.
#[derive(Debug, Clone)]
struct CrudeFrame {
    position: f64,
    period: f32,
    /// Local cost per state: 0 = unvoiced, `s` = period subdivided by `s`.
    cost: Vec<f32>,
}

impl CrudeFrame {
    fn unvoiced(position: f64, states: usize) -> Self {
        let mut cost = vec![f32::INFINITY; states];
        cost[0] = 0.0;
        Self {
            position,
            period: 0.0,
            cost,
        }
    }
}

/// Decomposes a waveform into analysis frames.
///
/// The first frame sits at position 0 and the last at `wave.len()`; both are
/// unvoiced. Positions are strictly increasing. Silent or aperiodic input
/// yields only unvoiced frames.
pub fn decompose(
    wave: &Waveform,
    params: &AnalysisParams,
    monitor: &mut dyn ProgressMonitor,
) -> Result<Vec<AnalysisFrame>, IntonationError> {
    params.validate()?;

    let samples = wave.samples();
    let length = samples.len();
    let block = params.block_size;
    let overlap = params.overlap;
    let states = params.viterbi_states();

    let mut corrsvc = CorrelationService::new(block);
    let mut correlation = vec![0.0f32; block];
    let mut normalized = vec![0.0f32; block - 2 * overlap];

    let mut crude = vec![CrudeFrame::unvoiced(0.0, states)];
    let mut position = (block - overlap) as f64;

    loop {
        let offs = position.round() as usize;
        if offs + block >= length {
            break;
        }
        if monitor.is_cancelled() {
            return Err(IntonationError::Cancelled);
        }
        monitor.report(position / length as f64);

        corrsvc.run(
            &samples[offs - overlap..offs - overlap + block],
            &samples[offs + overlap - block..offs + overlap],
            &mut correlation,
        );
        normalize_correlation(samples, offs, overlap, &correlation, &mut normalized);

        if is_aperiodic(&normalized, block) {
            crude.push(CrudeFrame::unvoiced(position, states));
            position = (offs + params.unvoiced_step()) as f64;
            continue;
        }

        match find_period(&normalized) {
            Some((period, peak)) => {
                let mut cost = harmonic_costs(&normalized, period, peak, states);
                cost[0] = params.unvoiced_cost;
                crude.push(CrudeFrame {
                    position,
                    period,
                    cost,
                });
                position += period as f64;
            }
            None => {
                crude.push(CrudeFrame::unvoiced(position, states));
                position = (offs + params.unvoiced_step()) as f64;
            }
        }
    }

    crude.push(CrudeFrame::unvoiced(length as f64, states));
    monitor.report(1.0);

    let frames = viterbi(&crude, params, wave.sample_rate());

    let voiced = frames.iter().filter(|f| f.is_voiced()).count();
    log::debug!(
        "frame decomposition: {} crude frames, {} frames ({} voiced)",
        crude.len(),
        frames.len(),
        voiced
    );

    Ok(frames)
}

/// Pearson-like normalization of the raw correlation.
///
/// `normalized[lag]` compares the window around `offs` with the same window
/// shifted back by `lag`. Both window energies grow by one sample per lag, so
/// they are tracked as two running sums.
fn normalize_correlation(
    samples: &[f32],
    offs: usize,
    overlap: usize,
    correlation: &[f32],
    normalized: &mut [f32],
) {
    let sq = |i: usize| {
        let v = samples[i] as f64;
        v * v
    };

    let mut y0: f64 = (offs - overlap..offs + overlap).map(sq).sum();
    let mut y1 = y0;

    normalized[0] = 1.0;
    for lag in 1..normalized.len() {
        y0 += sq(offs + overlap + lag - 1);
        y1 += sq(offs - overlap - lag);

        let denom = (y0 * y1).sqrt();
        normalized[lag] = if denom > ENERGY_EPSILON {
            (correlation[2 * overlap + lag - 1] as f64 / denom) as f32
        } else {
            0.0
        };
    }
}

/// Counts sign changes of the correlation's derivative over the first quarter
/// block. Rapid wiggling means there is no dominant period.
fn is_aperiodic(normalized: &[f32], block: usize) -> bool {
    let mut zero_crossings = 0;
    let mut prev = 0.0f32;

    for i in 0..block / 4 {
        // 4th order central difference
        let d = normalized[i] - 8.0 * normalized[i + 1] + 8.0 * normalized[i + 3]
            - normalized[i + 4];
        if d * prev < 0.0 {
            zero_crossings += 1;
        }
        prev = d;
    }

    zero_crossings > block / 32
}

/// Finds the strongest local maximum after the correlation first dips below
/// zero, refined to sub-sample accuracy by parabolic interpolation.
///
/// Returns `(period, peak_value)`.
fn find_period(normalized: &[f32]) -> Option<(f32, f32)> {
    let mut past_negative = false;
    let mut best_peak = 0.0f32;
    let mut best_period = 0.0f32;

    for i in 1..normalized.len() - 1 {
        past_negative |= normalized[i] < 0.0;

        let (l, c, r) = (normalized[i - 1], normalized[i], normalized[i + 1]);
        if past_negative && c > l && c > r {
            let a = (l + r) / 2.0 - c;
            let b = (r - l) / 2.0;

            let peak = c - b * b / a / 4.0;
            if peak > best_peak + PEAK_IMPROVEMENT {
                best_period = i as f32 - b / a / 2.0;
                best_peak = peak;
            }
        }
    }

    (best_period > 0.0).then_some((best_period, best_peak))
}

/// Cost of each subdivision hypothesis for a detected period.
///
/// For subdivision `s`, the true period would be `period / s`; the correlation
/// must then be high at every multiple `period * j / s`. The cost is the
/// angle (`acos`) of the weakest such correlation.
fn harmonic_costs(normalized: &[f32], period: f32, peak: f32, states: usize) -> Vec<f32> {
    let angle = |v: f32| if v < 1.0 { v.max(-1.0).acos() } else { 0.0 };

    let mut cost = vec![0.0f32; states];
    if states > 1 {
        cost[1] = angle(peak);
    }

    for (s, slot) in cost.iter_mut().enumerate().skip(2) {
        let mut min_peak = peak;
        for j in 1..s {
            let t = period * j as f32 / s as f32;
            let t0 = t.floor() as usize;
            let frac = t - t0 as f32;
            let v = normalized[t0] * (1.0 - frac) + normalized[t0 + 1] * frac;
            min_peak = min_peak.min(v);
        }
        *slot = angle(min_peak);
    }

    cost
}

/// Globally cheapest voicing/subdivision path, expanded into analysis frames.
fn viterbi(crude: &[CrudeFrame], params: &AnalysisParams, sample_rate: u32) -> Vec<AnalysisFrame> {
    let states = params.viterbi_states();
    let n = crude.len();

    let mut total = vec![f32::INFINITY; n * states];
    let mut back = vec![0u8; n * states];
    total[0] = 0.0;

    for i in 1..n {
        let (prev, cur) = (&crude[i - 1], &crude[i]);
        for j in 0..states {
            if !cur.cost[j].is_finite() {
                continue;
            }

            let mut best_cost = f32::INFINITY;
            let mut best_back = 0usize;

            for k in 0..states {
                let prev_total = total[(i - 1) * states + k];
                if !prev_total.is_finite() {
                    continue;
                }

                let mut cost = prev_total + cur.cost[j];
                if j > 0 && k > 0 {
                    let jump = (prev.period / k as f32).ln() - (cur.period / j as f32).ln();
                    cost += params.period_jump_weight * jump * jump;
                } else if j > 0 || k > 0 {
                    cost += params.voicing_transition_penalty;
                }

                if cost < best_cost {
                    best_cost = cost;
                    best_back = k;
                }
            }

            total[i * states + j] = best_cost;
            back[i * states + j] = best_back as u8;
        }
    }

    let last = n - 1;
    let mut state = 0;
    for k in 1..states {
        if total[last * states + k] < total[last * states + state] {
            state = k;
        }
    }

    let mut frames = Vec::with_capacity(n * 2);
    for i in (0..n).rev() {
        let cf = &crude[i];
        if state == 0 {
            frames.push(AnalysisFrame::unvoiced(cf.position));
        } else {
            let freq = sample_rate as f32 / cf.period * state as f32;
            let pitch = frequency_to_pitch(freq);
            let sub_period = cf.period / state as f32;
            for k in (0..state).rev() {
                frames.push(AnalysisFrame {
                    position: cf.position + (cf.period * k as f32 / state as f32) as f64,
                    period: sub_period,
                    pitch,
                });
            }
        }
        state = back[i * states + state] as usize;
    }

    frames.reverse();
    frames
}
