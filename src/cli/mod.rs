//! Command-line interface for the classification tools.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ElevationConfig;
use crate::core::{loaders, writers};
use crate::processors::folds::{self, FoldParams};
use crate::{LabeledPhoton, ToolsConfig};

#[derive(Parser)]
#[command(name = "bathy-tools")]
#[command(about = "Lidar photon classification support tools", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments of the fold split tool.
#[derive(Args, Debug, Clone)]
pub struct CopyCommandsArgs {
    /// RNG seed, may be negative (defaults to the configured seed, 123)
    #[arg(long = "random_seed", alias = "random-seed", allow_hyphen_values = true)]
    pub random_seed: Option<i64>,

    /// Held-out fold number
    #[arg(long)]
    pub fold: usize,

    /// Total number of folds
    #[arg(long)]
    pub folds: usize,

    /// Directory receiving the training files
    #[arg(long = "training_dir", alias = "training-dir")]
    pub training_dir: PathBuf,

    /// Directory receiving the testing files
    #[arg(long = "testing_dir", alias = "testing-dir")]
    pub testing_dir: PathBuf,

    /// Glob matching every input file
    #[arg(long = "filename_glob", alias = "filename-glob")]
    pub filename_glob: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print `cp` commands splitting files into training/testing folds
    CopyCommands(CopyCommandsArgs),

    /// Keep photons strictly inside an elevation window
    FilterElevation {
        /// Input photon CSV
        input: PathBuf,
        /// Output photon CSV
        output: PathBuf,
        /// Lower elevation bound (exclusive)
        #[arg(long, allow_hyphen_values = true)]
        min_elevation: Option<f64>,
        /// Upper elevation bound (exclusive)
        #[arg(long, allow_hyphen_values = true)]
        max_elevation: Option<f64>,
        /// Elevation column name
        #[arg(long)]
        column: Option<String>,
    },

    /// Print a per-fold score table and render it as PNG
    FoldTable {
        /// Fold summary CSV
        input: PathBuf,
        /// Output PNG file
        output: PathBuf,
        /// Table title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Render a grouped bar chart of per-fold scores
    FoldChart {
        /// Fold summary CSV
        input: PathBuf,
        /// Output PNG file
        output: PathBuf,
        /// Chart title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Render one sorted bar panel per metric across datasets
    MixedPredictions {
        /// Per-dataset score CSV
        input: PathBuf,
        /// Output PNG file
        output: PathBuf,
        /// Figure title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Score predictions of one class against everything else
    Score {
        /// Classified photon CSV with `manual_label` and `prediction` columns
        input: PathBuf,
        /// Class to score (defaults to the configured class, 40)
        #[arg(long)]
        class: Option<i64>,
    },

    /// Render along-track segments of a classified photon CSV
    View {
        /// Classified photon CSV
        input: PathBuf,
        /// Size in meters of one segment
        #[arg(short, long)]
        segment_size: Option<u64>,
        /// Render only this segment
        #[arg(long)]
        segment: Option<usize>,
        /// Output PNG (single segment) or directory (all segments)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Use the same scale on both axes
        #[arg(long)]
        equal_aspect: bool,
        /// List segments instead of rendering
        #[arg(long)]
        list: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 38 {
            format!("{}...", value.chars().take(35).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<38} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Initialize logging on stderr from a verbosity count.
pub fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .format_timestamp_secs()
        .init();
}

/// Load the YAML config, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> ToolsConfig {
    match path {
        Some(path) => match ToolsConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                ToolsConfig::default()
            }
        },
        None => ToolsConfig::default(),
    }
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::CopyCommands(args) => {
            cmd_copy_commands(&args, &config);
            Ok(())
        }
        Commands::FilterElevation { input, output, min_elevation, max_elevation, column } => {
            let elevation = ElevationConfig {
                column: column.unwrap_or_else(|| config.elevation.column.clone()),
                min_elevation: min_elevation.unwrap_or(config.elevation.min_elevation),
                max_elevation: max_elevation.unwrap_or(config.elevation.max_elevation),
            };
            cmd_filter_elevation(&input, &output, &elevation)
        }
        Commands::FoldTable { input, output, title } => {
            cmd_fold_table(&input, &output, title.as_deref(), &config)
        }
        Commands::FoldChart { input, output, title } => {
            cmd_fold_chart(&input, &output, title.as_deref(), &config)
        }
        Commands::MixedPredictions { input, output, title } => {
            cmd_mixed_predictions(&input, &output, title.as_deref(), &config)
        }
        Commands::Score { input, class } => {
            cmd_score(&input, class.unwrap_or(config.scoring.class))
        }
        Commands::View { input, segment_size, segment, output, equal_aspect, list } => {
            let options = ViewOptions {
                segment_size: segment_size.unwrap_or(config.viewer.segment_size),
                segment,
                output,
                equal_aspect,
                list,
            };
            cmd_view(&input, &options, &config)
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Validate, enumerate, partition and write the copy commands to `out`.
///
/// Nothing is written to `out` unless every check passes.
pub fn write_fold_copy_commands<W: Write>(
    args: &CopyCommandsArgs,
    config: &ToolsConfig,
    out: &mut W,
) -> Result<usize> {
    let params = FoldParams {
        fold: args.fold,
        folds: args.folds,
        random_seed: args.random_seed.unwrap_or(config.folds.random_seed),
    };
    info!("{:?}", args);

    params.validate()?;

    let files = loaders::expand_glob(&args.filename_glob)
        .with_context(|| format!("Failed to expand '{}'", args.filename_glob))?;
    info!("Total files = {}", files.len());

    let split = folds::partition(&files, &params)?;
    info!("files_per_fold = {}", split.files_per_fold);
    debug!(
        "{} training, {} testing",
        split.training.len(),
        split.testing.len()
    );

    let instructions = split.copy_instructions(params.fold, &args.training_dir, &args.testing_dir);
    writers::write_copy_commands(out, &instructions, "<stdout>")?;

    Ok(instructions.len())
}

/// Run the fold split tool, exiting non-zero on any failure.
pub fn cmd_copy_commands(args: &CopyCommandsArgs, config: &ToolsConfig) {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(e) = write_fold_copy_commands(args, config, &mut out) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_filter_elevation(input: &Path, output: &Path, elevation: &ElevationConfig) -> Result<()> {
    use crate::processors::filtering;

    let start = Instant::now();

    let spinner = create_spinner("Filtering photons by elevation...");
    let result = filtering::filter_by_elevation(input, output, elevation);
    spinner.finish_and_clear();

    let stats = result.with_context(|| format!("Failed to filter {}", input.display()))?;

    print_summary(
        "Elevation Filter Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output file", output.display().to_string()),
            ("Column", elevation.column.clone()),
            ("Window", format!("({}, {})", elevation.min_elevation, elevation.max_elevation)),
            ("Photons read", stats.total.to_string()),
            ("Below window", stats.below.to_string()),
            ("Above window", stats.above.to_string()),
            ("Photons written", stats.kept.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_fold_table(
    input: &Path,
    output: &Path,
    title: Option<&str>,
    config: &ToolsConfig,
) -> Result<()> {
    use crate::processors::summary;
    use crate::visualization;

    let rows = loaders::load_score_rows(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let table = summary::build_score_table(&rows)?;

    let stdout = io::stdout();
    writers::write_text_table(&mut stdout.lock(), &table.headers, &table.rows, "<stdout>")?;

    visualization::render_score_table(output, &table, title, &config.plot)
        .with_context(|| format!("Failed to render {}", output.display()))?;
    info!("Wrote {}", output.display());

    Ok(())
}

fn cmd_fold_chart(
    input: &Path,
    output: &Path,
    title: Option<&str>,
    config: &ToolsConfig,
) -> Result<()> {
    use crate::processors::summary;
    use crate::visualization;

    let start = Instant::now();

    let rows = loaders::load_score_rows(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let groups = summary::fold_bar_groups(&rows)?;

    let spinner = create_spinner("Rendering fold chart...");
    let result = visualization::plot_fold_summaries(output, &groups, title, &config.plot);
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to render {}", output.display()))?;

    print_summary(
        "Fold Chart Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output PNG", output.display().to_string()),
            ("Folds", groups.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_mixed_predictions(
    input: &Path,
    output: &Path,
    title: Option<&str>,
    config: &ToolsConfig,
) -> Result<()> {
    use crate::processors::summary;
    use crate::visualization;

    let start = Instant::now();

    let rows = loaders::load_score_rows(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let panels = summary::metric_panels(&rows)?;

    let spinner = create_spinner("Rendering metric panels...");
    let result = visualization::plot_metric_panels(output, &panels, title, &config.plot);
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to render {}", output.display()))?;

    let mut items = vec![
        ("Input file", input.display().to_string()),
        ("Output PNG", output.display().to_string()),
        ("Datasets", rows.len().to_string()),
    ];
    for panel in &panels {
        items.push((panel.metric.display_name(), format!("mean {:.3}", panel.mean)));
    }
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Mixed Predictions Complete", &items);

    Ok(())
}

fn cmd_score(input: &Path, class: i64) -> Result<()> {
    use crate::processors::scoring;

    let predictions = loaders::load_predictions(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    info!("{} points read", predictions.len());

    let report = scoring::score_predictions(&predictions, class)?;

    let stdout = io::stdout();
    writers::write_score_report(&mut stdout.lock(), &report, "<stdout>")?;

    Ok(())
}

/// Options of the `view` subcommand after config defaults are applied.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub segment_size: u64,
    pub segment: Option<usize>,
    pub output: Option<PathBuf>,
    pub equal_aspect: bool,
    pub list: bool,
}

/// Default output next to the input: `<stem>_segment_<n>.png` or `<stem>_segments/`.
fn default_view_output(input: &Path, segment: Option<usize>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "photons".to_string());
    let name = match segment {
        Some(s) => format!("{}_segment_{}.png", stem, s),
        None => format!("{}_segments", stem),
    };
    input.with_file_name(name)
}

fn cmd_view(input: &Path, options: &ViewOptions, config: &ToolsConfig) -> Result<()> {
    use crate::processors::segments::{self, SegmentLayout};
    use crate::visualization::{self, SegmentPlot};

    let start = Instant::now();

    let spinner = create_spinner("Loading classified photons...");
    let loaded = loaders::load_labeled_photons(input);
    spinner.finish_and_clear();
    let photons = loaded.with_context(|| format!("Failed to load {}", input.display()))?;

    let layout = SegmentLayout::from_photons(&photons, options.segment_size)?;
    debug!(
        "minx {} maxx {} total_segments {}",
        layout.min_x, layout.max_x, layout.total_segments
    );
    debug!("labels {:?}", segments::label_counts(&photons));

    let title = input.display().to_string();

    if options.list {
        let buckets = segments::bucket_segments(&photons, &layout);
        let mut rows = Vec::with_capacity(layout.total_segments);
        for (s, bucket) in buckets.iter().enumerate() {
            let (x1, x2) = layout.bounds(s)?;
            let count = bucket.len();
            rows.push(vec![
                s.to_string(),
                format!("{:.1}", x1),
                format!("{:.1}", x2),
                count.to_string(),
            ]);
        }
        let stdout = io::stdout();
        writers::write_text_table(
            &mut stdout.lock(),
            &["Segment", "Start x", "End x", "Photons"],
            &rows,
            "<stdout>",
        )?;
        return Ok(());
    }

    let render = |s: usize, selected: &[LabeledPhoton], path: &Path| -> Result<usize> {
        let x_range = layout.bounds(s)?;
        let segment_title = format!("{} [{:.0}, {:.0}]", title, x_range.0, x_range.1);
        let plot = SegmentPlot {
            x_range,
            title: Some(segment_title.as_str()),
            equal_aspect: options.equal_aspect,
        };
        visualization::plot_segment(path, selected, &plot, &config.viewer, &config.plot)
            .with_context(|| format!("Failed to render {}", path.display()))?;
        Ok(selected.len())
    };

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_view_output(input, options.segment));

    let (rendered, plotted) = match options.segment {
        Some(s) => {
            let (x1, x2) = layout.bounds(s)?;
            info!("start x {}, end x {}", x1, x2);
            let selected = segments::select_segment(&photons, &layout, s)?;
            (1, render(s, &selected, &output)?)
        }
        None => {
            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;

            let buckets = segments::bucket_segments(&photons, &layout);
            let spinner = create_spinner("Rendering segments...");
            let counts: Result<Vec<usize>> = buckets
                .par_iter()
                .enumerate()
                .map(|(s, selected)| {
                    render(s, selected, &output.join(format!("segment_{:04}.png", s)))
                })
                .collect();
            spinner.finish_and_clear();

            let counts = counts?;
            (counts.len(), counts.iter().sum())
        }
    };

    print_summary(
        "Segment View Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output", output.display().to_string()),
            ("Photons", photons.len().to_string()),
            ("Segment size (m)", options.segment_size.to_string()),
            ("Total segments", layout.total_segments.to_string()),
            ("Segments rendered", rendered.to_string()),
            ("Photons plotted", plotted.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn args(dir: &Path, fold: usize, folds: usize, seed: Option<i64>) -> CopyCommandsArgs {
        CopyCommandsArgs {
            random_seed: seed,
            fold,
            folds,
            training_dir: PathBuf::from("training"),
            testing_dir: PathBuf::from("testing"),
            filename_glob: format!("{}/*.csv", dir.display()),
        }
    }

    fn granules(n: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        for i in 0..n {
            File::create(dir.path().join(format!("granule_{:02}.csv", i))).unwrap();
        }
        dir
    }

    #[test]
    fn test_cli_parses_underscore_flags() {
        let cli = Cli::try_parse_from([
            "bathy-tools",
            "copy-commands",
            "--fold",
            "1",
            "--folds",
            "5",
            "--training_dir",
            "train",
            "--testing_dir",
            "test",
            "--filename_glob",
            "data/*.csv",
        ])
        .unwrap();

        match cli.command {
            Commands::CopyCommands(a) => {
                assert_eq!(a.random_seed, None);
                assert_eq!(a.fold, 1);
                assert_eq!(a.folds, 5);
                assert_eq!(a.training_dir, PathBuf::from("train"));
                assert_eq!(a.filename_glob, "data/*.csv");
            }
            _ => panic!("Expected copy-commands"),
        }
    }

    #[test]
    fn test_cli_accepts_negative_seed() {
        let cli = Cli::try_parse_from([
            "bathy-tools",
            "copy-commands",
            "--random_seed",
            "-1",
            "--fold",
            "0",
            "--folds",
            "2",
            "--training_dir",
            "train",
            "--testing_dir",
            "test",
            "--filename_glob",
            "data/*.csv",
        ])
        .unwrap();

        match cli.command {
            Commands::CopyCommands(a) => {
                assert_eq!(a.random_seed, Some(-1));
                assert_eq!(a.fold, 0);
            }
            _ => panic!("Expected copy-commands"),
        }
    }

    #[test]
    fn test_negative_seed_writes_commands() {
        let dir = granules(4);
        let mut out = Vec::new();
        let config = ToolsConfig::default();
        let count = write_fold_copy_commands(&args(dir.path(), 1, 2, Some(-7)), &config, &mut out)
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_cli_requires_fold() {
        let result = Cli::try_parse_from([
            "bathy-tools",
            "copy-commands",
            "--folds",
            "5",
            "--training_dir",
            "a",
            "--testing_dir",
            "b",
            "--filename_glob",
            "*",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_negative_elevation() {
        let cli = Cli::try_parse_from([
            "bathy-tools",
            "filter-elevation",
            "in.csv",
            "out.csv",
            "--min-elevation",
            "-40",
        ])
        .unwrap();

        match cli.command {
            Commands::FilterElevation { min_elevation, max_elevation, .. } => {
                assert_eq!(min_elevation, Some(-40.0));
                assert_eq!(max_elevation, None);
            }
            _ => panic!("Expected filter-elevation"),
        }
    }

    #[test]
    fn test_write_fold_copy_commands() {
        let dir = granules(10);
        let config = ToolsConfig::default();

        let mut out = Vec::new();
        let count =
            write_fold_copy_commands(&args(dir.path(), 1, 5, Some(42)), &config, &mut out).unwrap();
        assert_eq!(count, 10);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines.iter().all(|l| l.starts_with("cp ")));
        assert_eq!(lines.iter().filter(|l| l.ends_with(" testing")).count(), 2);
        assert_eq!(lines.iter().filter(|l| l.ends_with(" training")).count(), 8);

        let mut again = Vec::new();
        write_fold_copy_commands(&args(dir.path(), 1, 5, Some(42)), &config, &mut again).unwrap();
        assert_eq!(text.as_bytes(), again.as_slice());
    }

    #[test]
    fn test_default_seed_comes_from_config() {
        let dir = granules(8);
        let mut config = ToolsConfig::default();

        let mut explicit = Vec::new();
        let explicit_args = args(dir.path(), 0, 4, Some(123));
        write_fold_copy_commands(&explicit_args, &config, &mut explicit).unwrap();
        let mut implicit = Vec::new();
        write_fold_copy_commands(&args(dir.path(), 0, 4, None), &config, &mut implicit).unwrap();
        assert_eq!(explicit, implicit);

        config.folds.random_seed = 9;
        let mut nine = Vec::new();
        write_fold_copy_commands(&args(dir.path(), 0, 4, None), &config, &mut nine).unwrap();
        let mut explicit_nine = Vec::new();
        let nine_args = args(dir.path(), 0, 4, Some(9));
        write_fold_copy_commands(&nine_args, &config, &mut explicit_nine).unwrap();
        assert_eq!(nine, explicit_nine);
    }

    #[test]
    fn test_failures_write_nothing() {
        let dir = granules(2);
        let config = ToolsConfig::default();

        for a in [
            args(dir.path(), 0, 0, None),
            args(dir.path(), 3, 3, None),
            args(dir.path(), 0, 5, None),
        ] {
            let mut out = Vec::new();
            assert!(write_fold_copy_commands(&a, &config, &mut out).is_err());
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_cli_parses_score() {
        let cli =
            Cli::try_parse_from(["bathy-tools", "score", "pred.csv", "--class", "41"]).unwrap();
        match cli.command {
            Commands::Score { input, class } => {
                assert_eq!(input, PathBuf::from("pred.csv"));
                assert_eq!(class, Some(41));
            }
            _ => panic!("Expected score"),
        }
    }

    #[test]
    fn test_default_view_output() {
        let input = Path::new("/data/granule.csv");
        assert_eq!(
            default_view_output(input, Some(3)),
            PathBuf::from("/data/granule_segment_3.png")
        );
        assert_eq!(
            default_view_output(input, None),
            PathBuf::from("/data/granule_segments")
        );
    }
}
