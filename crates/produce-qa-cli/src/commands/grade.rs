//! Grade command - score produce photos and assign grades.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use produce_qa_adapters::{exif_metadata, FsImageSource, ModelStore};
use produce_qa_core::analysis::PreprocessConfig;
use produce_qa_core::factors::default_factors;
use produce_qa_core::inference::{get_device, DetectorConfig, HeuristicDetector, SsdDetector};
use produce_qa_core::{
    AssessorConfig, Detector, Grade, GradingRequest, ImageSource, ProgressEvent, ProgressSink,
    QualityAssessor, QualityReport, ReportOutput, ScoringPolicy,
};
use tracing::{debug, info};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Hardcoded default values.
mod defaults {
    pub const CONFIDENCE_THRESHOLD: f32 = 0.5;
    pub const NMS_THRESHOLD: f32 = 0.45;
    pub const MIN_CONTRAST: f32 = 20.0;
}

/// Parse and validate a confidence value (0.0-1.0).
fn parse_unit(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse and validate a score threshold (0-100).
fn parse_score(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=100"))
    }
}

/// Shared arguments for grading.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct GradeArgs {
    /// Files or directories to grade
    pub paths: Vec<PathBuf>,

    /// Product identifier for the reports (default: file stem)
    #[arg(long, value_name = "ID")]
    pub product_id: Option<String>,

    /// Product type used to look up a quality standard (e.g. apple)
    #[arg(long, value_name = "TYPE")]
    pub product_type: Option<String>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Disable the detection model and heuristic detector
    #[arg(long)]
    pub no_detector: bool,

    /// Minimum detection confidence (0.0-1.0)
    #[arg(long, value_parser = parse_unit)]
    pub confidence_threshold: Option<f32>,

    /// Minimum score for grade A (0-100)
    #[arg(long, value_parser = parse_score)]
    pub grade_a: Option<f32>,

    /// Minimum score for grade B (0-100)
    #[arg(long, value_parser = parse_score)]
    pub grade_b: Option<f32>,

    /// Minimum score for grade C (0-100)
    #[arg(long, value_parser = parse_score)]
    pub grade_c: Option<f32>,

    /// Exit with status 1 if any image grades below this (A-D)
    #[arg(long, value_name = "GRADE")]
    pub min_grade: Option<Grade>,

    /// Run inference on the CPU
    #[arg(long)]
    pub cpu: bool,

    /// Include EXIF metadata in output
    #[arg(long)]
    pub exif: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl GradeArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }
        if args.product_type.is_none() {
            args.product_type.clone_from(&config.general.product_type);
        }

        // Detector: CLI --no-detector wins, then config
        if !args.no_detector {
            if let Some(enabled) = config.detector.enabled {
                args.no_detector = !enabled;
            }
        }
        if !args.cpu {
            args.cpu = config.detector.force_cpu.unwrap_or(false);
        }
        args.confidence_threshold = args
            .confidence_threshold
            .or(config.detector.confidence_threshold);

        args.grade_a = args.grade_a.or(config.grading.grade_a);
        args.grade_b = args.grade_b.or(config.grading.grade_b);
        args.grade_c = args.grade_c.or(config.grading.grade_c);
        // An unparseable value is left for `run` to reject
        if args.min_grade.is_none() {
            args.min_grade = config
                .grading
                .min_grade
                .as_deref()
                .and_then(|g| g.parse().ok());
        }

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.exif {
            args.exif = config.output.exif.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.models.dir);
        }

        args.config = Some(config.clone());

        args
    }

    fn config(&self) -> AppConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Jsonl)
    }

    /// Scoring policy from config with CLI thresholds applied.
    fn policy(&self) -> ScoringPolicy {
        let mut policy = self.config().policy();
        if let Some(a) = self.grade_a {
            policy.thresholds.a = a;
        }
        if let Some(b) = self.grade_b {
            policy.thresholds.b = b;
        }
        if let Some(c) = self.grade_c {
            policy.thresholds.c = c;
        }
        policy
    }

    fn model_store(&self) -> ModelStore {
        let store = self
            .models_dir
            .as_ref()
            .map_or_else(ModelStore::default, ModelStore::new);
        match self.config.as_ref().and_then(|c| c.models.base_url.as_ref()) {
            Some(url) => store.with_base_url(url.clone()),
            None => store,
        }
    }
}

/// Result of running the grade command.
#[allow(dead_code)] // Fields exposed for programmatic use
#[derive(Debug)]
pub struct GradeResult {
    /// Number of images graded.
    pub processed: usize,
    /// Number of images skipped.
    pub skipped: usize,
    /// Number of images graded below `--min-grade`.
    pub below_min_grade: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the grade command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &GradeArgs) -> Result<GradeResult> {
    info!("Running grade command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }
    check_configured_min_grade(args)?;

    let assessor = build_assessor(args)?;

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress_bar = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let output = JsonOutput::stdout();

    process_images(&source, &assessor, &output, &progress_bar, args)
}

/// A configured `min_grade` that does not parse is an error unless the
/// command line replaced it.
fn check_configured_min_grade(args: &GradeArgs) -> Result<()> {
    if args.min_grade.is_some() {
        return Ok(());
    }
    if let Some(ref g) = args.config().grading.min_grade {
        g.parse::<Grade>()
            .map_err(|e| anyhow::anyhow!("grading.min_grade: {e}"))?;
    }
    Ok(())
}

/// Build the assessor from merged args (CLI + config).
fn build_assessor(args: &GradeArgs) -> Result<QualityAssessor> {
    let config = args.config();
    let min_contrast = config
        .grading
        .min_contrast
        .unwrap_or(defaults::MIN_CONTRAST);

    let mut assessor = QualityAssessor::new(args.policy())?
        .with_catalog(config.catalog())
        .with_factors(default_factors(&config.color_config(), config.surface_config()))
        .with_config(AssessorConfig {
            min_contrast,
            ..AssessorConfig::default()
        });

    if let Some(detector) = build_detector(args, &config, min_contrast) {
        debug!("Using detector {}", detector.name());
        assessor = assessor.with_detector(detector);
    }

    Ok(assessor)
}

fn build_detector(
    args: &GradeArgs,
    config: &AppConfig,
    min_contrast: f32,
) -> Option<Box<dyn Detector>> {
    if args.no_detector {
        debug!("Detection disabled");
        return None;
    }

    let store = args.model_store();
    if let Some(path) = store.installed_path("produce-ssd") {
        let detector_config = DetectorConfig {
            score_threshold: args
                .confidence_threshold
                .unwrap_or(defaults::CONFIDENCE_THRESHOLD),
            nms_threshold: config
                .detector
                .nms_threshold
                .unwrap_or(defaults::NMS_THRESHOLD),
            ..DetectorConfig::default()
        };
        return Some(Box::new(SsdDetector::new(
            path,
            get_device(args.cpu),
            detector_config,
        )));
    }

    info!(
        "Detection model not found in {}. Run `produce-qa models fetch`; using heuristic detector.",
        store.dir().display()
    );
    Some(Box::new(HeuristicDetector {
        min_contrast,
        preprocess: PreprocessConfig::default(),
        ..HeuristicDetector::default()
    }))
}

/// Grade images and stream reports.
fn process_images(
    source: &dyn ImageSource,
    assessor: &QualityAssessor,
    output: &JsonOutput,
    progress: &dyn ProgressSink,
    args: &GradeArgs,
) -> Result<GradeResult> {
    let total = source.count_hint();
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut below_min_grade = 0usize;
    let mut all_reports: Vec<QualityReport> = Vec::new();

    for (index, image_result) in source.images().enumerate() {
        let image = match image_result {
            Ok(img) => img,
            Err(e) => {
                // Note: error message contains the path via anyhow context
                progress.on_event(ProgressEvent::Skipped {
                    path: format!("image {index}"),
                    reason: format!("{e:#}"),
                });
                skipped += 1;
                continue;
            }
        };

        let path = image.path.clone();

        progress.on_event(ProgressEvent::Started {
            path: path.clone(),
            index,
            total,
        });

        let product_id = args
            .product_id
            .clone()
            .or_else(|| image.stem())
            .unwrap_or_else(|| path.clone());
        let mut request = GradingRequest::new(product_id, image);
        if let Some(ref product_type) = args.product_type {
            request = request.with_product_type(product_type.clone());
        }

        let mut report = match assessor
            .assess(&request)
            .with_context(|| format!("Failed to grade {path}"))
        {
            Ok(report) => report,
            Err(e) => {
                progress.on_event(ProgressEvent::Skipped {
                    path,
                    reason: format!("{e:#}"),
                });
                skipped += 1;
                continue;
            }
        };

        if args.exif {
            report.exif = exif_metadata(Path::new(&path));
        }

        if args.min_grade.is_some_and(|min| report.grade > min) {
            below_min_grade += 1;
        }

        progress.on_event(ProgressEvent::Completed {
            report: Box::new(report.clone()),
        });

        match args.format() {
            OutputFormat::Jsonl => {
                output.write(&report)?;
            }
            OutputFormat::Json => {
                all_reports.push(report);
            }
        }

        processed += 1;
    }

    if matches!(args.format(), OutputFormat::Json) {
        output.write_array(&all_reports, args.pretty)?;
    }

    output.flush()?;

    progress.on_event(ProgressEvent::Finished { processed, skipped });

    let exit_code = if below_min_grade > 0 {
        ExitCode::BelowMinGrade
    } else {
        ExitCode::Success
    };

    Ok(GradeResult {
        processed,
        skipped,
        below_min_grade,
        exit_code,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: GradeArgs,
    }

    fn parse(argv: &[&str]) -> GradeArgs {
        let mut full = vec!["produce-qa"];
        full.extend_from_slice(argv);
        Wrapper::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_parse_score_and_unit() {
        assert_eq!(parse_score("85"), Ok(85.0));
        assert!(parse_score("101").is_err());
        assert!(parse_score("abc").is_err());
        assert_eq!(parse_unit("0.5"), Ok(0.5));
        assert!(parse_unit("1.5").is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: AppConfig = toml::from_str(
            r"
[general]
product_type = 'apple'

[grading]
grade_a = 90.0
grade_b = 80.0
min_grade = 'C'

[output]
format = 'json'
",
        )
        .unwrap();
        let args = GradeArgs::with_config(
            parse(&["--grade-a", "95", "--product-type", "tomato", "x.jpg"]),
            &config,
        );
        assert_eq!(args.product_type.as_deref(), Some("tomato"));
        assert_eq!(args.min_grade, Some(Grade::C));
        assert!(matches!(args.format(), OutputFormat::Json));

        let policy = args.policy();
        assert_eq!(policy.thresholds.a, 95.0);
        assert_eq!(policy.thresholds.b, 80.0);
        assert_eq!(policy.thresholds.c, 50.0);
    }

    #[test]
    fn test_config_disables_detector() {
        let config: AppConfig = toml::from_str("[detector]\nenabled = false\n").unwrap();
        let args = GradeArgs::with_config(parse(&["x.jpg"]), &config);
        assert!(args.no_detector);
        assert!(build_detector(&args, &config, 20.0).is_none());
    }

    #[test]
    fn test_missing_model_falls_back_to_heuristic() {
        let dir = tempfile::tempdir().unwrap();
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let args = GradeArgs::with_config(
            parse(&["--models-dir", &dir_arg, "x.jpg"]),
            &AppConfig::default(),
        );
        let detector = build_detector(&args, &AppConfig::default(), 20.0).unwrap();
        assert_eq!(detector.name(), "heuristic");
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let args = GradeArgs::with_config(
            parse(&["--grade-a", "40", "x.jpg"]),
            &AppConfig::default(),
        );
        assert!(build_assessor(&args).is_err());
    }

    #[test]
    fn test_bad_config_min_grade_is_an_error() {
        let config: AppConfig = toml::from_str("[grading]\nmin_grade = 'E'\n").unwrap();

        let args = GradeArgs::with_config(parse(&["x.jpg"]), &config);
        assert!(args.min_grade.is_none());
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("grading.min_grade"), "{err:#}");

        let args = GradeArgs::with_config(parse(&["--min-grade", "B", "x.jpg"]), &config);
        assert_eq!(args.min_grade, Some(Grade::B));
        assert!(check_configured_min_grade(&args).is_ok());
    }
}
