use intonation::io::wav::{WavFormat, WavSink};
use intonation::stream::{export, ChunkPlayer, Renderer};
use intonation::{AnalysisParams, AudioProvider, ProgressMonitor};

/// Prints coarse progress for long analysis and export steps.
struct ConsoleProgress {
    label: &'static str,
    last_decile: i32,
}

impl ConsoleProgress {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            last_decile: -1,
        }
    }
}

impl ProgressMonitor for ConsoleProgress {
    fn report(&mut self, fraction: f64) {
        let decile = (fraction * 10.0).floor() as i32;
        if decile > self.last_decile {
            self.last_decile = decile;
            log::debug!("{}: {}%", self.label, decile * 10);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    let mut shift: Option<f32> = None;
    let mut correct: Option<f32> = None;
    let mut block_size: Option<usize> = None;
    let mut project_path: Option<String> = None;
    let mut format_float = false;
    let mut direct = false;
    let mut verbose = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--shift" | "-s" => {
                i += 1;
                shift = Some(parse_f64(&args, i, "shift") as f32);
            }
            "--correct" | "-c" => {
                i += 1;
                let value = require(&args, i, "correct");
                match parse_correction_str(value) {
                    Ok(a) => correct = Some(a),
                    Err(e) => {
                        eprintln!("ERROR: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            "--block-size" => {
                i += 1;
                block_size = Some(parse_usize(&args, i, "block-size"));
            }
            "--project" => {
                i += 1;
                project_path = Some(require(&args, i, "project").to_string());
            }
            "--float" => format_float = true,
            "--direct" => direct = true,
            "--verbose" | "-v" => verbose = true,
            other => {
                eprintln!("ERROR: Unknown option '{}'", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let start = std::time::Instant::now();

    let mut track = if input_path.ends_with(".json") {
        match intonation::io::load_project_file(input_path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("ERROR: Failed to load project {}: {}", input_path, e);
                std::process::exit(1);
            }
        }
    } else {
        let mut params = AnalysisParams::default();
        if let Some(b) = block_size {
            params = params.with_block_size(b);
        }
        if verbose {
            eprintln!("Parameters: {}", params);
        }
        let mut progress = ConsoleProgress::new("analysis");
        match intonation::analyze_file(input_path, params, &mut progress) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("ERROR: Failed to analyse {}: {}", input_path, e);
                std::process::exit(1);
            }
        }
    };

    let voiced = track.chunks().iter().filter(|(_, c)| c.voiced).count();
    eprintln!(
        "Input: {} samples, {} Hz, {:.2}s, {} chunks ({} voiced)",
        track.waveform().len(),
        track.sample_rate(),
        track.waveform().duration_secs(),
        track.chunks().len(),
        voiced
    );

    if let Some(amount) = correct {
        if let Err(e) = track.correct_pitch(amount) {
            eprintln!("ERROR: Pitch correction failed: {}", e);
            std::process::exit(1);
        }
        eprintln!("Pitch correction: {:.0}%", amount * 100.0);
    }

    if let Some(semitones) = shift {
        let ids: Vec<_> = track
            .chunks()
            .iter()
            .filter(|(_, c)| c.voiced)
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            if let Err(e) = track.shift_chunk_pitch(id, semitones) {
                eprintln!("ERROR: Pitch shift failed: {}", e);
                std::process::exit(1);
            }
        }
        eprintln!("Pitch shift: {:+.2} semitones", semitones);
    }

    if let Some(path) = &project_path {
        if let Err(e) = intonation::io::save_project_file(&track, path) {
            eprintln!("ERROR: Failed to write project {}: {}", path, e);
            std::process::exit(1);
        }
        eprintln!("Project saved to {}", path);
    }

    let format = if format_float {
        WavFormat::Float32
    } else {
        WavFormat::Int16
    };

    let snapshot = track.snapshot();
    let expected = snapshot.output_len().max(0) as usize;
    let mut provider: Box<dyn AudioProvider> = if direct {
        match ChunkPlayer::whole(snapshot.clone()) {
            Some(p) => Box::new(p),
            None => {
                eprintln!("ERROR: Track has no chunks");
                std::process::exit(1);
            }
        }
    } else {
        Box::new(Renderer::new(snapshot.clone()))
    };

    let mut wav = match WavSink::create(output_path, snapshot.sample_rate(), format) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("ERROR: Failed to create {}: {}", output_path, e);
            std::process::exit(1);
        }
    };
    let mut progress = ConsoleProgress::new("export");
    let written = match export::drive(provider.as_mut(), expected, &mut progress, |block| {
        wav.write(block)
    }) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("ERROR: Rendering failed: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = wav.finalize() {
        eprintln!("ERROR: Failed to write {}: {}", output_path, e);
        std::process::exit(1);
    }

    let elapsed = start.elapsed();
    eprintln!(
        "Output: {} samples, {:.2}s",
        written,
        written as f64 / snapshot.sample_rate() as f64
    );

    if verbose {
        let input_duration = track.waveform().duration_secs();
        let processing_secs = elapsed.as_secs_f64();
        let realtime_factor = if processing_secs > 0.0 {
            input_duration / processing_secs
        } else {
            f64::INFINITY
        };
        eprintln!(
            "Processing time: {:.3}s ({:.1}x realtime)",
            processing_secs, realtime_factor
        );
    }

    eprintln!("Written to {}", output_path);
}

fn print_usage() {
    eprintln!("Usage: intonation-cli <input.wav|project.json> <output.wav> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --shift <f>, -s     Shift every voiced note by <f> semitones");
    eprintln!("  --correct <a>, -c   Pull notes toward the nearest semitone (0..1 or 0%..100%)");
    eprintln!("  --block-size <N>    Analysis correlation block size (default: 1024)");
    eprintln!("  --project <path>    Save the analysed and edited track as a JSON project");
    eprintln!("  --direct            Render straight from chunks instead of synth frames");
    eprintln!("  --float             Write 32-bit float output (default: 16-bit)");
    eprintln!("  --verbose, -v       Show parameters, progress, and timing");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  intonation-cli vocal.wav tuned.wav --correct 80%");
    eprintln!("  intonation-cli vocal.wav up.wav --shift 2 --project vocal.json");
    eprintln!("  intonation-cli vocal.json again.wav --float");
}

fn require<'a>(args: &'a [String], idx: usize, name: &str) -> &'a str {
    if idx >= args.len() {
        eprintln!("ERROR: --{} requires a value", name);
        std::process::exit(1);
    }
    &args[idx]
}

fn parse_f64(args: &[String], idx: usize, name: &str) -> f64 {
    let value = require(args, idx, name);
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("ERROR: Invalid {}: {}", name, value);
            std::process::exit(1);
        }
    }
}

fn parse_usize(args: &[String], idx: usize, name: &str) -> usize {
    let value = require(args, idx, name);
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("ERROR: Invalid {}: {}", name, value);
            std::process::exit(1);
        }
    }
}

/// Accepts a fraction (`0.8`) or a percentage (`80%`).
fn parse_correction_str(s: &str) -> Result<f32, String> {
    let (number, divisor) = match s.strip_suffix('%') {
        Some(n) => (n, 100.0),
        None => (s, 1.0),
    };
    let value: f32 = number
        .trim()
        .parse()
        .map_err(|_| format!("Invalid correction amount: '{}'", s))?;
    let value = value / divisor;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Correction amount {} is outside 0..1", s));
    }
    Ok(value)
}
