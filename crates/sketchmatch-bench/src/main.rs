//! sketchmatch-bench: judge a drawing from the command line.
//!
//! Loads a drawing and the reference outline for a region, runs the
//! full judging pipeline with diagnostics, and prints a report.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p sketchmatch-bench -- drawing.png --region Colorado --outlines assets/outlines
//! cargo run -p sketchmatch-bench -- drawing.png --region Utah --outlines assets/outlines --runs 5
//! cargo run -p sketchmatch-bench -- drawing.png --region Utah --outlines assets/outlines --json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use sketchmatch_engine::{
    BinaryMask, Judge, JudgeConfig, JudgeDiagnostics, RegionOverrides, SystemClock, Verdict,
};
use sketchmatch_io::OutlineDir;

/// Judge a drawing against a reference outline and print diagnostics.
#[derive(Parser, Debug)]
#[command(name = "sketchmatch-bench", version)]
struct Cli {
    /// Path to the drawing (PNG, JPEG, BMP, or WebP).
    drawing: PathBuf,

    /// Region the drawing is supposed to depict, e.g. "New York".
    #[arg(long)]
    region: String,

    /// Directory holding `<slug>.png` reference outlines.
    #[arg(long, value_name = "DIR")]
    outlines: PathBuf,

    /// Number of runs for timing statistics.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full `JudgeConfig` as a JSON string.
    ///
    /// Omitted fields take their defaults. When present, `--tolerance`
    /// is ignored.
    #[arg(long, value_name = "JSON")]
    config_json: Option<String>,

    /// Edge-match tolerance in pixels.
    #[arg(long, default_value_t = JudgeConfig::DEFAULT_TOLERANCE_PX)]
    tolerance: f32,

    /// JSON file with per-region overrides, replacing the built-in
    /// table.
    #[arg(long, value_name = "FILE")]
    overrides: Option<PathBuf>,

    /// Write fill, edge, and overlay PNGs into this directory.
    #[arg(long, value_name = "DIR")]
    dump_masks: Option<PathBuf>,
}

/// Build a [`JudgeConfig`] from CLI arguments.
fn config_from_cli(cli: &Cli) -> Result<JudgeConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(JudgeConfig {
        tolerance_px: cli.tolerance,
        ..JudgeConfig::default()
    })
}

/// Load the override table named by `--overrides`, or the built-in one.
fn overrides_from_cli(cli: &Cli) -> Result<RegionOverrides, String> {
    let Some(ref path) = cli.overrides else {
        return Ok(RegionOverrides::builtin());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    RegionOverrides::from_json(&json).map_err(|e| format!("Error in {}: {e}", path.display()))
}

fn judge_from_cli(cli: &Cli) -> Result<Judge, String> {
    let config = config_from_cli(cli)?;
    let overrides = overrides_from_cli(cli)?;
    Judge::new(config, overrides).map_err(|e| format!("Invalid configuration: {e}"))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let judge = match judge_from_cli(&cli) {
        Ok(j) => j,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let drawing = match std::fs::read(&cli.drawing) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.drawing.display());
            return ExitCode::FAILURE;
        }
    };
    let outlines = OutlineDir::new(&cli.outlines);

    eprintln!(
        "Drawing: {} ({} bytes)",
        cli.drawing.display(),
        drawing.len(),
    );
    eprintln!(
        "Region: {} ({})",
        cli.region,
        outlines.path_for(&cli.region).display(),
    );
    eprintln!("Config: {:#?}", judge.config());
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match judge.judge_with_diagnostics(&drawing, &cli.region, &outlines, &SystemClock::new()) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                    println!("Score: {}", result.score);
                    println!("Critique: {}", result.critique);
                }

                // Dump masks on the first run only.
                if run == 0
                    && let Some(ref dir) = cli.dump_masks
                    && let Err(msg) =
                        dump_masks(&judge, &drawing, &cli.region, &outlines, &diagnostics, dir)
                {
                    eprintln!("Error writing masks to {}: {msg}", dir.display());
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Judge error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Write the reference and drawing masks at the winning rotation,
/// plus an edge overlay, into `dir`.
fn dump_masks(
    judge: &Judge,
    drawing: &[u8],
    region_id: &str,
    outlines: &OutlineDir,
    diagnostics: &JudgeDiagnostics,
    dir: &Path,
) -> Result<(), String> {
    let config = judge.config();
    let angle = match diagnostics.verdict {
        Verdict::Accepted { angle, .. } => angle,
        _ => 0.0,
    };

    let reference = judge
        .prepare_reference(outlines, region_id)
        .map_err(|e| e.to_string())?;
    let image = sketchmatch_engine::decode::decode_rgba(drawing).map_err(|e| e.to_string())?;
    let canvas = sketchmatch_engine::rasterize::rasterize(
        &image,
        config.canvas_size,
        config.margin_fraction,
        angle,
    )
    .map_err(|e| e.to_string())?;
    let user_fill = BinaryMask::from_canvas(&canvas, config.draw_threshold);
    let user_edge = sketchmatch_engine::morphology::edge_of(&user_fill);

    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let masks: [(&str, &BinaryMask); 4] = [
        ("reference_fill.png", reference.fill()),
        ("reference_edge.png", reference.edge()),
        ("drawing_fill.png", &user_fill),
        ("drawing_edge.png", &user_edge),
    ];
    for (name, mask) in masks {
        let path = dir.join(name);
        sketchmatch_io::write_mask_png(mask, &path).map_err(|e| e.to_string())?;
        log::debug!("mask written to {} ({} px set)", path.display(), mask.count());
    }

    let overlay = sketchmatch_io::encode_overlay_png(&user_edge, reference.edge())
        .map_err(|e| e.to_string())?;
    let overlay_path = dir.join("overlay.png");
    std::fs::write(&overlay_path, &overlay).map_err(|e| e.to_string())?;
    eprintln!(
        "Overlay written to {} ({} bytes, rotation {angle:+} deg)",
        overlay_path.display(),
        overlay.len(),
    );
    Ok(())
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&JudgeDiagnostics) -> Option<std::time::Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[JudgeDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| Some(d.decode)),
        ("Reference", |d| d.reference),
        ("Quick Ink", |d| Some(d.quick_ink)),
        ("Minimum Edge", |d| d.min_edge),
        ("Rotation Search", |d| d.search),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(
            ["sketchmatch-bench", "d.png", "--region", "Utah", "--outlines", "o"]
                .iter()
                .chain(args),
        )
        .unwrap()
    }

    #[test]
    fn defaults_match_engine_config() {
        let cli = parse(&[]);
        assert_eq!(cli.runs, 1);
        assert_eq!(config_from_cli(&cli).unwrap(), JudgeConfig::default());
        assert_eq!(
            overrides_from_cli(&cli).unwrap().len(),
            RegionOverrides::builtin().len()
        );
    }

    #[test]
    fn tolerance_flag_applies() {
        let cli = parse(&["--tolerance", "5"]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.tolerance_px - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&["--tolerance", "5", "--config-json", r#"{"canvas_size": 256}"#]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.canvas_size, 256);
        assert!((config.tolerance_px - JudgeConfig::DEFAULT_TOLERANCE_PX).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["--config-json", "{"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn zero_runs_is_rejected() {
        let parsed = Cli::try_parse_from([
            "sketchmatch-bench",
            "d.png",
            "--region",
            "Utah",
            "--outlines",
            "o",
            "--runs",
            "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn invalid_config_is_rejected_before_judging() {
        let cli = parse(&["--tolerance", "-1"]);
        assert!(judge_from_cli(&cli).unwrap_err().contains("Invalid configuration"));
    }

    /// PNG with a black square on white: the encoder writes set pixels
    /// as white, so the square is the unset region.
    fn square_png(size: u32, lo: u32, hi: u32) -> Vec<u8> {
        let data = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                u8::from(!((lo..hi).contains(&x) && (lo..hi).contains(&y)))
            })
            .collect();
        let mask = BinaryMask::from_raw(size, size, data).unwrap();
        sketchmatch_io::encode_mask_png(&mask).unwrap()
    }

    #[test]
    fn dump_masks_writes_every_png() {
        let outlines_dir = tempfile::tempdir().unwrap();
        std::fs::write(outlines_dir.path().join("utah.png"), square_png(64, 16, 48)).unwrap();
        let outlines = OutlineDir::new(outlines_dir.path());
        let judge = Judge::new(
            JudgeConfig {
                canvas_size: 64,
                ..JudgeConfig::default()
            },
            RegionOverrides::empty(),
        )
        .unwrap();
        let drawing = square_png(64, 18, 46);
        let (_, diagnostics) = judge
            .judge_with_diagnostics(&drawing, "Utah", &outlines, &SystemClock::new())
            .unwrap();

        let out = tempfile::tempdir().unwrap();
        let dir = out.path().join("masks");
        dump_masks(&judge, &drawing, "Utah", &outlines, &diagnostics, &dir).unwrap();
        for name in [
            "reference_fill.png",
            "reference_edge.png",
            "drawing_fill.png",
            "drawing_edge.png",
            "overlay.png",
        ] {
            let len = std::fs::metadata(dir.join(name)).unwrap().len();
            assert!(len > 0, "{name} is empty");
        }
    }

    #[test]
    fn dump_masks_reports_missing_outline() {
        let outlines_dir = tempfile::tempdir().unwrap();
        let outlines = OutlineDir::new(outlines_dir.path());
        let judge = Judge::default();
        let drawing = square_png(64, 16, 48);
        let out = tempfile::tempdir().unwrap();
        let diagnostics_source = OutlineDir::new(out.path());
        std::fs::write(out.path().join("utah.png"), square_png(64, 16, 48)).unwrap();
        let (_, diagnostics) = judge
            .judge_with_diagnostics(&drawing, "Utah", &diagnostics_source, &SystemClock::new())
            .unwrap();
        let err = dump_masks(&judge, &drawing, "Utah", &outlines, &diagnostics, out.path())
            .unwrap_err();
        assert!(err.contains("Utah"), "{err}");
    }

    #[test]
    fn missing_overrides_file_is_reported() {
        let cli = parse(&["--overrides", "/nonexistent/overrides.json"]);
        assert!(overrides_from_cli(&cli).unwrap_err().contains("overrides.json"));
    }
}
