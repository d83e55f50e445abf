//! Configuration file support for produce-qa.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/produce-qa/config.toml` (lowest priority)
//! - Project-local: `.produce-qa.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use produce_qa_core::domain::{
    GradeThresholds, HueRange, ProductStandard, StandardsCatalog, DEFAULT_DEFECT_TOLERANCE,
};
use produce_qa_core::factors::{ColorConfig, SurfaceConfig};
use produce_qa_core::scoring::{DefectTolerance, FactorWeights, ScoringPolicy};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Grade thresholds and defect tolerance.
    pub grading: GradingConfig,
    /// Factor weights.
    pub weights: WeightsConfig,
    /// Detection model settings.
    pub detector: DetectorSettings,
    /// Colour gates shared by the colour and freshness factors.
    pub color: ColorSettings,
    /// Surface defect heuristics.
    pub surface: SurfaceSettings,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
    /// Extra or replacement product standards, keyed by product type.
    pub standards: BTreeMap<String, StandardConfig>,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
    /// Product type applied when none is given on the command line.
    pub product_type: Option<String>,
}

/// Grading configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Minimum score for grade A.
    pub grade_a: Option<f32>,
    /// Minimum score for grade B.
    pub grade_b: Option<f32>,
    /// Minimum score for grade C.
    pub grade_c: Option<f32>,
    /// Most defects an A-grade product may have.
    pub max_defects_a: Option<usize>,
    /// Most defects a B-grade product may have.
    pub max_defects_b: Option<usize>,
    /// Most defects a C-grade product may have.
    pub max_defects_c: Option<usize>,
    /// Grade below which the run exits with status 1.
    pub min_grade: Option<String>,
    /// Minimum colour distance separating produce from the backdrop.
    pub min_contrast: Option<f32>,
}

/// Factor weight configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    /// Size weight.
    pub size: Option<f32>,
    /// Colour weight.
    pub color: Option<f32>,
    /// Shape weight.
    pub shape: Option<f32>,
    /// Surface weight.
    pub surface: Option<f32>,
    /// Freshness weight.
    pub freshness: Option<f32>,
}

/// Detector configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Enable/disable detection.
    pub enabled: Option<bool>,
    /// Minimum detection confidence (0.0-1.0).
    pub confidence_threshold: Option<f32>,
    /// IoU above which overlapping detections are suppressed (0.0-1.0).
    pub nms_threshold: Option<f32>,
    /// Run inference on the CPU even when a GPU backend is compiled in.
    pub force_cpu: Option<bool>,
}

/// Colour factor configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    /// Hue spread in degrees at which uniformity reaches zero.
    pub inconsistency_deg: Option<f32>,
    /// Saturation a pixel needs to count towards hue statistics.
    pub min_saturation: Option<u8>,
    /// Value a pixel needs to count towards hue statistics.
    pub min_value: Option<u8>,
}

/// Surface heuristic configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Luma below which a produce pixel counts as dark.
    pub dark_threshold: Option<u8>,
    /// Minimum dark patch area in pixels.
    pub min_spot_area: Option<u64>,
    /// Spot count above which the defect is high severity.
    pub high_spot_count: Option<usize>,
    /// Dark fraction above which the produce is treated as dark by nature.
    pub max_dark_fraction: Option<f32>,
    /// Lab chroma distance marking a blemish pixel.
    pub blemish_chroma_delta: Option<f32>,
    /// Gabor energy above which texture is irregular.
    pub texture_energy_threshold: Option<f32>,
    /// Sobel magnitude counted as an edge.
    pub edge_threshold: Option<f32>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Mirror to download models from.
    pub base_url: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Include EXIF metadata.
    pub exif: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

/// A product standard as written in TOML.
///
/// ```toml
/// [standards.pear]
/// hue = [60.0, 90.0]
/// size_range = [5000.0, 40000.0]
/// circularity = 0.6
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StandardConfig {
    /// Hue interval in degrees; wraps when the first value is larger.
    pub hue: (f32, f32),
    /// Saturation range, default 50-255.
    pub saturation: Option<(u8, u8)>,
    /// Value range, default 50-255.
    pub value: Option<(u8, u8)>,
    /// Expected area in analysis-frame pixels.
    pub size_range: (f32, f32),
    /// Expected circularity.
    pub circularity: f32,
    /// Tolerated blemish fraction.
    pub defect_tolerance: Option<f32>,
}

impl StandardConfig {
    /// Builds the core standard named `name`.
    #[must_use]
    pub fn to_standard(&self, name: &str) -> ProductStandard {
        ProductStandard {
            name: name.trim().to_lowercase(),
            hue: HueRange::new(self.hue.0, self.hue.1),
            saturation: self.saturation.unwrap_or((50, 255)),
            value: self.value.unwrap_or((50, 255)),
            size_range: self.size_range,
            circularity: self.circularity,
            defect_tolerance: self.defect_tolerance.unwrap_or(DEFAULT_DEFECT_TOLERANCE),
        }
    }
}

fn check_unit(name: &str, value: Option<f32>) -> Result<(), String> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(format!("{name} must be 0.0-1.0, got {v}")),
        _ => Ok(()),
    }
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/produce-qa/config.toml`
    /// 2. Project-local: `.produce-qa.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("grading.grade_a", self.grading.grade_a),
            ("grading.grade_b", self.grading.grade_b),
            ("grading.grade_c", self.grading.grade_c),
        ] {
            if let Some(v) = value {
                if !(0.0..=100.0).contains(&v) {
                    return Err(format!("{name} must be 0-100, got {v}"));
                }
            }
        }
        if let Some(ref g) = self.grading.min_grade {
            g.parse::<produce_qa_core::Grade>()
                .map_err(|e| format!("grading.min_grade: {e}"))?;
        }

        for (name, value) in [
            ("weights.size", self.weights.size),
            ("weights.color", self.weights.color),
            ("weights.shape", self.weights.shape),
            ("weights.surface", self.weights.surface),
            ("weights.freshness", self.weights.freshness),
        ] {
            check_unit(name, value)?;
        }
        self.policy().validate()?;

        check_unit("detector.confidence_threshold", self.detector.confidence_threshold)?;
        check_unit("detector.nms_threshold", self.detector.nms_threshold)?;

        if let Some(deg) = self.color.inconsistency_deg {
            if !(1.0..=180.0).contains(&deg) {
                return Err(format!("color.inconsistency_deg must be 1-180, got {deg}"));
            }
        }
        self.surface_config().validate()?;

        for (name, standard) in &self.standards {
            standard.to_standard(name).validate()?;
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);
        self.general.product_type = other
            .general
            .product_type
            .or_else(|| self.general.product_type.take());

        // Grading
        let g = &mut self.grading;
        g.grade_a = other.grading.grade_a.or(g.grade_a);
        g.grade_b = other.grading.grade_b.or(g.grade_b);
        g.grade_c = other.grading.grade_c.or(g.grade_c);
        g.max_defects_a = other.grading.max_defects_a.or(g.max_defects_a);
        g.max_defects_b = other.grading.max_defects_b.or(g.max_defects_b);
        g.max_defects_c = other.grading.max_defects_c.or(g.max_defects_c);
        g.min_grade = other.grading.min_grade.or_else(|| g.min_grade.take());
        g.min_contrast = other.grading.min_contrast.or(g.min_contrast);

        // Weights
        let w = &mut self.weights;
        w.size = other.weights.size.or(w.size);
        w.color = other.weights.color.or(w.color);
        w.shape = other.weights.shape.or(w.shape);
        w.surface = other.weights.surface.or(w.surface);
        w.freshness = other.weights.freshness.or(w.freshness);

        // Detector
        let d = &mut self.detector;
        d.enabled = other.detector.enabled.or(d.enabled);
        d.confidence_threshold = other.detector.confidence_threshold.or(d.confidence_threshold);
        d.nms_threshold = other.detector.nms_threshold.or(d.nms_threshold);
        d.force_cpu = other.detector.force_cpu.or(d.force_cpu);

        // Colour
        let c = &mut self.color;
        c.inconsistency_deg = other.color.inconsistency_deg.or(c.inconsistency_deg);
        c.min_saturation = other.color.min_saturation.or(c.min_saturation);
        c.min_value = other.color.min_value.or(c.min_value);

        // Surface
        let s = &mut self.surface;
        s.dark_threshold = other.surface.dark_threshold.or(s.dark_threshold);
        s.min_spot_area = other.surface.min_spot_area.or(s.min_spot_area);
        s.high_spot_count = other.surface.high_spot_count.or(s.high_spot_count);
        s.max_dark_fraction = other.surface.max_dark_fraction.or(s.max_dark_fraction);
        s.blemish_chroma_delta = other.surface.blemish_chroma_delta.or(s.blemish_chroma_delta);
        s.texture_energy_threshold = other
            .surface
            .texture_energy_threshold
            .or(s.texture_energy_threshold);
        s.edge_threshold = other.surface.edge_threshold.or(s.edge_threshold);

        // Models
        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.base_url = other.models.base_url.or_else(|| self.models.base_url.take());

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.exif = other.output.exif.or(self.output.exif);
        self.output.progress = other.output.progress.or(self.output.progress);

        // Standards: whole entries replace same-named ones
        self.standards.extend(other.standards);
    }

    /// Scoring policy from the configured weights, thresholds and tolerance.
    #[must_use]
    pub fn policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            weights: self.weights(),
            thresholds: self.thresholds(),
            tolerance: self.defect_tolerance(),
            ..ScoringPolicy::default()
        }
    }

    /// Grade thresholds with defaults filled in.
    #[must_use]
    pub fn thresholds(&self) -> GradeThresholds {
        let d = GradeThresholds::default();
        GradeThresholds {
            a: self.grading.grade_a.unwrap_or(d.a),
            b: self.grading.grade_b.unwrap_or(d.b),
            c: self.grading.grade_c.unwrap_or(d.c),
        }
    }

    /// Defect tolerance with defaults filled in.
    #[must_use]
    pub fn defect_tolerance(&self) -> DefectTolerance {
        let d = DefectTolerance::default();
        DefectTolerance {
            max_defects_a: self.grading.max_defects_a.unwrap_or(d.max_defects_a),
            max_defects_b: self.grading.max_defects_b.unwrap_or(d.max_defects_b),
            max_defects_c: self.grading.max_defects_c.unwrap_or(d.max_defects_c),
        }
    }

    /// Factor weights with defaults filled in.
    #[must_use]
    pub fn weights(&self) -> FactorWeights {
        let d = FactorWeights::default();
        FactorWeights {
            size: self.weights.size.unwrap_or(d.size),
            color: self.weights.color.unwrap_or(d.color),
            shape: self.weights.shape.unwrap_or(d.shape),
            surface: self.weights.surface.unwrap_or(d.surface),
            freshness: self.weights.freshness.unwrap_or(d.freshness),
        }
    }

    /// Colour gates with defaults filled in.
    #[must_use]
    pub fn color_config(&self) -> ColorConfig {
        let d = ColorConfig::default();
        let c = &self.color;
        ColorConfig {
            inconsistency_deg: c.inconsistency_deg.unwrap_or(d.inconsistency_deg),
            min_saturation: c.min_saturation.unwrap_or(d.min_saturation),
            min_value: c.min_value.unwrap_or(d.min_value),
        }
    }

    /// Surface heuristics with defaults filled in.
    #[must_use]
    pub fn surface_config(&self) -> SurfaceConfig {
        let d = SurfaceConfig::default();
        let s = &self.surface;
        SurfaceConfig {
            dark_threshold: s.dark_threshold.unwrap_or(d.dark_threshold),
            min_spot_area: s.min_spot_area.unwrap_or(d.min_spot_area),
            high_spot_count: s.high_spot_count.unwrap_or(d.high_spot_count),
            max_dark_fraction: s.max_dark_fraction.unwrap_or(d.max_dark_fraction),
            blemish_chroma_delta: s.blemish_chroma_delta.unwrap_or(d.blemish_chroma_delta),
            texture_energy_threshold: s
                .texture_energy_threshold
                .unwrap_or(d.texture_energy_threshold),
            edge_threshold: s.edge_threshold.unwrap_or(d.edge_threshold),
            boundary_margin: d.boundary_margin,
        }
    }

    /// Built-in standards overlaid with the configured ones.
    ///
    /// Invalid configured standards are skipped with a warning.
    #[must_use]
    pub fn catalog(&self) -> StandardsCatalog {
        let mut catalog = StandardsCatalog::builtin();
        for (name, config) in &self.standards {
            let standard = config.to_standard(name);
            match standard.validate() {
                Ok(()) => catalog.insert(standard),
                Err(e) => warn!("Ignoring product standard: {e}"),
            }
        }
        catalog
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("produce-qa").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.produce-qa.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".produce-qa.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
