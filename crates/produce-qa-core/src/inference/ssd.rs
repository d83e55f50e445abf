//! Single-shot produce and defect detector.
//!
//! A `BlazeBlock` backbone (depthwise separable convolutions with residual
//! connections) feeding two anchor heads: 2 anchors per cell on a 16×16 map
//! and 6 per cell on an 8×8 map, 896 anchors in total. Every anchor predicts
//! one sigmoid score per class and a box offset relative to its centre.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use tracing::debug;

use super::{nms, sigmoid, LazyModel};
use crate::domain::{BoundingBox, Detection, Detector};

/// Input image size.
pub const INPUT_SIZE: usize = 128;

/// Number of anchor boxes.
pub const NUM_ANCHORS: usize = 896;

const ANCHORS_16: usize = 2;
const ANCHORS_8: usize = 6;

/// `(in, out, kernel, stride)` of the blocks producing the 16×16 map.
pub(crate) const BACKBONE_16: [(usize, usize, usize, usize); 11] = [
    (24, 24, 3, 1),
    (24, 28, 3, 1),
    (28, 32, 3, 2),
    (32, 36, 3, 1),
    (36, 42, 3, 1),
    (42, 48, 3, 2),
    (48, 56, 3, 1),
    (56, 64, 3, 1),
    (64, 72, 3, 1),
    (72, 80, 3, 1),
    (80, 88, 3, 1),
];

/// `(in, out, kernel, stride)` of the blocks producing the 8×8 map.
pub(crate) const BACKBONE_8: [(usize, usize, usize, usize); 5] = [
    (88, 96, 3, 2),
    (96, 96, 3, 1),
    (96, 96, 3, 1),
    (96, 96, 3, 1),
    (96, 96, 3, 1),
];

/// Detector settings.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Class labels in model output order.
    pub classes: Vec<String>,
    /// Minimum sigmoid score for a detection.
    pub score_threshold: f32,
    /// IoU above which overlapping detections of one class are merged.
    pub nms_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            classes: ["produce", "blemish", "bruise", "rot", "mold", "damage"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            score_threshold: 0.5,
            nms_threshold: 0.45,
        }
    }
}

/// Depthwise separable block with a residual connection.
///
/// Convolutions carry biases (batch norm folded in).
struct BlazeBlock {
    depthwise: Conv2d,
    pointwise: Conv2d,
    channel_pad: usize,
    stride: usize,
}

impl BlazeBlock {
    fn new(
        (in_channels, out_channels, kernel_size, stride): (usize, usize, usize, usize),
        vb: &VarBuilder,
    ) -> Result<Self> {
        let padding = if stride == 2 { 0 } else { (kernel_size - 1) / 2 };
        let depthwise = conv2d(
            in_channels,
            in_channels,
            kernel_size,
            Conv2dConfig {
                stride,
                padding,
                groups: in_channels,
                dilation: 1,
            },
            vb.pp("depthwise"),
        )?;
        let pointwise = conv2d(
            in_channels,
            out_channels,
            1,
            Conv2dConfig::default(),
            vb.pp("pointwise"),
        )?;
        Ok(Self {
            depthwise,
            pointwise,
            channel_pad: out_channels.saturating_sub(in_channels),
            stride,
        })
    }
}

impl Module for BlazeBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let padded = if self.stride == 2 {
            x.pad_with_zeros(2, 0, 2)?.pad_with_zeros(3, 0, 2)?
        } else {
            x.clone()
        };
        let h = self.depthwise.forward(&padded)?.relu()?;
        let h = self.pointwise.forward(&h)?;

        let residual = if self.stride == 2 {
            x.max_pool2d(2)?
        } else {
            x.clone()
        };
        let residual = if self.channel_pad > 0 {
            residual.pad_with_zeros(1, 0, self.channel_pad)?
        } else {
            residual
        };
        (h + residual)?.relu()
    }
}

/// Network weights and anchors.
pub struct ProduceNet {
    conv0: Conv2d,
    backbone_16: Vec<BlazeBlock>,
    backbone_8: Vec<BlazeBlock>,
    classifier_16: Conv2d,
    regressor_16: Conv2d,
    classifier_8: Conv2d,
    regressor_8: Conv2d,
    anchors: Vec<[f32; 2]>,
    num_classes: usize,
    device: Device,
}

impl ProduceNet {
    /// Builds the network for `num_classes` classes.
    ///
    /// # Errors
    ///
    /// Returns an error if a weight is missing or has the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder, num_classes: usize) -> Result<Self> {
        let device = vb.device().clone();
        let conv0 = conv2d(
            3,
            24,
            5,
            Conv2dConfig {
                stride: 2,
                padding: 0,
                ..Conv2dConfig::default()
            },
            vb.pp("conv0"),
        )?;

        let backbone_16 = BACKBONE_16
            .iter()
            .enumerate()
            .map(|(i, cfg)| BlazeBlock::new(*cfg, &vb.pp(format!("backbone1.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        let backbone_8 = BACKBONE_8
            .iter()
            .enumerate()
            .map(|(i, cfg)| BlazeBlock::new(*cfg, &vb.pp(format!("backbone2.{i}"))))
            .collect::<Result<Vec<_>>>()?;

        let head = |in_c: usize, out_c: usize, name: &str| {
            conv2d(in_c, out_c, 1, Conv2dConfig::default(), vb.pp(name))
        };
        let classifier_16 = head(88, ANCHORS_16 * num_classes, "classifier_16")?;
        let regressor_16 = head(88, ANCHORS_16 * 4, "regressor_16")?;
        let classifier_8 = head(96, ANCHORS_8 * num_classes, "classifier_8")?;
        let regressor_8 = head(96, ANCHORS_8 * 4, "regressor_8")?;

        Ok(Self {
            conv0,
            backbone_16,
            backbone_8,
            classifier_16,
            regressor_16,
            classifier_8,
            regressor_8,
            anchors: generate_anchors(),
            num_classes,
            device,
        })
    }

    /// Resizes to the input size and normalizes to `[-1, 1]`, NCHW.
    fn preprocess(&self, image: &image::DynamicImage) -> Result<Tensor> {
        let rgb = image
            .resize_exact(
                INPUT_SIZE as u32,
                INPUT_SIZE as u32,
                image::imageops::FilterType::Triangle,
            )
            .to_rgb8();
        let data: Vec<f32> = rgb
            .pixels()
            .flat_map(|p| p.0.map(|c| f32::from(c) / 127.5 - 1.0))
            .collect();
        Tensor::from_vec(data, (1, INPUT_SIZE, INPUT_SIZE, 3), &self.device)?
            .permute((0, 3, 1, 2))?
            .to_dtype(DType::F32)
            .context("Failed to preprocess image")
    }

    /// Raw class logits `(896, classes)` and box offsets `(896, 4)`.
    fn forward(&self, x: &Tensor) -> Result<(Tensor, Tensor)> {
        let x = x.pad_with_zeros(2, 1, 2)?.pad_with_zeros(3, 1, 2)?;
        let mut h = self.conv0.forward(&x)?.relu()?;
        for block in &self.backbone_16 {
            h = block.forward(&h)?;
        }
        let map_16 = h.clone();
        for block in &self.backbone_8 {
            h = block.forward(&h)?;
        }
        let map_8 = h;

        let n16 = 16 * 16 * ANCHORS_16;
        let n8 = 8 * 8 * ANCHORS_8;
        let flatten = |t: Tensor, n: usize, width: usize| -> Result<Tensor> {
            Ok(t.permute((0, 2, 3, 1))?.reshape((n, width))?)
        };
        let c = self.num_classes;
        let scores = Tensor::cat(
            &[
                flatten(self.classifier_16.forward(&map_16)?, n16, c)?,
                flatten(self.classifier_8.forward(&map_8)?, n8, c)?,
            ],
            0,
        )?;
        let boxes = Tensor::cat(
            &[
                flatten(self.regressor_16.forward(&map_16)?, n16, 4)?,
                flatten(self.regressor_8.forward(&map_8)?, n8, 4)?,
            ],
            0,
        )?;
        Ok((scores, boxes))
    }
}

/// Anchor centres in normalized coordinates, in head output order.
fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for (size, per_cell) in [(16u8, ANCHORS_16), (8u8, ANCHORS_8)] {
        for y in 0..size {
            for x in 0..size {
                let centre = [
                    (f32::from(x) + 0.5) / f32::from(size),
                    (f32::from(y) + 0.5) / f32::from(size),
                ];
                anchors.extend(std::iter::repeat(centre).take(per_cell));
            }
        }
    }
    anchors
}

/// A scored box before conversion to pixels.
#[derive(Debug, Clone)]
struct Candidate {
    class: usize,
    score: f32,
    corners: [f32; 4],
}

/// Turns raw head output into per-class, suppressed candidates.
fn decode(
    scores: &[Vec<f32>],
    boxes: &[Vec<f32>],
    anchors: &[[f32; 2]],
    config: &DetectorConfig,
) -> Vec<Candidate> {
    let size = INPUT_SIZE as f32;
    let mut candidates = Vec::new();
    for ((logits, offsets), anchor) in scores.iter().zip(boxes).zip(anchors) {
        let cx = anchor[0] + offsets[0] / size;
        let cy = anchor[1] + offsets[1] / size;
        let w = offsets[2] / size;
        let h = offsets[3] / size;
        let corners = [
            (cx - w / 2.0).clamp(0.0, 1.0),
            (cy - h / 2.0).clamp(0.0, 1.0),
            (cx + w / 2.0).clamp(0.0, 1.0),
            (cy + h / 2.0).clamp(0.0, 1.0),
        ];
        for (class, &logit) in logits.iter().enumerate() {
            let score = sigmoid(logit);
            if score >= config.score_threshold {
                candidates.push(Candidate {
                    class,
                    score,
                    corners,
                });
            }
        }
    }

    let mut kept = Vec::new();
    for class in 0..config.classes.len() {
        let of_class: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.class == class)
            .cloned()
            .collect();
        kept.extend(nms(of_class, config.nms_threshold, |c| c.score, |c| c.corners));
    }
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept
}

/// Model-backed detector. Weights load on the first `detect` call.
pub struct SsdDetector {
    model: LazyModel<ProduceNet>,
    config: DetectorConfig,
}

impl SsdDetector {
    /// Creates a detector for the weights at `path`. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, device: Device, config: DetectorConfig) -> Self {
        let num_classes = config.classes.len();
        Self {
            model: LazyModel::new(
                path,
                device,
                Box::new(move |vb| ProduceNet::new(vb, num_classes)),
            ),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Whether the weights have been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }
}

impl Detector for SsdDetector {
    fn name(&self) -> &'static str {
        "produce-ssd"
    }

    fn detect(&self, image: &image::DynamicImage) -> Result<Vec<Detection>> {
        let net = self
            .model
            .get()
            .with_context(|| format!("Failed to load {}", self.model.path().display()))?;
        let input = net.preprocess(image)?;
        let (scores, boxes) = net.forward(&input)?;
        let scores = scores.to_vec2::<f32>()?;
        let boxes = boxes.to_vec2::<f32>()?;

        let candidates = decode(&scores, &boxes, &net.anchors, &self.config);
        debug!(count = candidates.len(), "Decoded detections");

        Ok(candidates
            .into_iter()
            .map(|c| Detection {
                label: self.config.classes[c.class].clone(),
                confidence: c.score,
                bbox: BoundingBox::from_normalized(c.corners, image.width(), image.height()),
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    use safetensors::tensor::TensorView;

    fn conv_shapes(
        name: &str,
        out_c: usize,
        in_per_group: usize,
        k: usize,
    ) -> Vec<(String, Vec<usize>)> {
        vec![
            (format!("{name}.weight"), vec![out_c, in_per_group, k, k]),
            (format!("{name}.bias"), vec![out_c]),
        ]
    }

    fn weight_shapes(num_classes: usize) -> Vec<(String, Vec<usize>)> {
        let mut shapes = conv_shapes("conv0", 24, 3, 5);
        let backbones = [("backbone1", &BACKBONE_16[..]), ("backbone2", &BACKBONE_8[..])];
        for (prefix, blocks) in backbones {
            for (i, (in_c, out_c, k, _)) in blocks.iter().enumerate() {
                let block = format!("{prefix}.{i}");
                shapes.extend(conv_shapes(&format!("{block}.depthwise"), *in_c, 1, *k));
                shapes.extend(conv_shapes(&format!("{block}.pointwise"), *out_c, *in_c, 1));
            }
        }
        shapes.extend(conv_shapes("classifier_16", ANCHORS_16 * num_classes, 88, 1));
        shapes.extend(conv_shapes("regressor_16", ANCHORS_16 * 4, 88, 1));
        shapes.extend(conv_shapes("classifier_8", ANCHORS_8 * num_classes, 96, 1));
        shapes.extend(conv_shapes("regressor_8", ANCHORS_8 * 4, 96, 1));
        shapes
    }

    fn zero_weights(num_classes: usize) -> tempfile::NamedTempFile {
        let shapes = weight_shapes(num_classes);
        let buffers: Vec<(String, Vec<usize>, Vec<f32>)> = shapes
            .into_iter()
            .map(|(name, shape)| {
                let len = shape.iter().product();
                (name, shape, vec![0.0f32; len])
            })
            .collect();
        let views: HashMap<String, TensorView<'_>> = buffers
            .iter()
            .map(|(name, shape, data)| {
                let view = TensorView::new(
                    safetensors::Dtype::F32,
                    shape.clone(),
                    bytemuck::cast_slice(data),
                )
                .expect("valid view");
                (name.clone(), view)
            })
            .collect();
        let bytes = safetensors::serialize(&views, &None).expect("serialize");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&bytes).expect("write");
        file
    }

    #[test]
    fn test_anchor_layout() {
        let anchors = generate_anchors();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        assert_eq!(anchors[0], [0.5 / 16.0, 0.5 / 16.0]);
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[512], [0.5 / 8.0, 0.5 / 8.0]);
    }

    #[test]
    fn test_decode_thresholds_and_suppresses() {
        let config = DetectorConfig {
            classes: vec!["produce".into(), "rot".into()],
            ..DetectorConfig::default()
        };
        let anchors = vec![[0.5, 0.5], [0.5, 0.5], [0.1, 0.1]];
        let scores = vec![vec![3.0, -5.0], vec![2.0, -5.0], vec![-5.0, 1.0]];
        let boxes = vec![
            vec![0.0, 0.0, 64.0, 64.0],
            vec![1.0, 1.0, 64.0, 64.0],
            vec![0.0, 0.0, 12.8, 12.8],
        ];
        let found = decode(&scores, &boxes, &anchors, &config);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].class, 0);
        assert_eq!(found[1].class, 1);
        assert!((found[0].corners[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_missing_weights_error_without_panic() {
        let detector = SsdDetector::new(
            "/nonexistent/produce-ssd.safetensors",
            Device::Cpu,
            DetectorConfig::default(),
        );
        let img = image::DynamicImage::new_rgb8(64, 64);
        assert!(detector.detect(&img).is_err());
        assert!(!detector.is_loaded());
    }

    #[test]
    fn test_zero_weights_run_end_to_end() {
        let config = DetectorConfig {
            score_threshold: 0.6,
            ..DetectorConfig::default()
        };
        let file = zero_weights(config.classes.len());
        let detector = SsdDetector::new(file.path(), Device::Cpu, config);
        let img = image::DynamicImage::new_rgb8(200, 150);
        let detections = detector.detect(&img).expect("inference runs");
        // Zero logits give sigmoid 0.5, below the 0.6 threshold.
        assert!(detections.is_empty());
        assert!(detector.is_loaded());
        assert_eq!(detector.name(), "produce-ssd");
    }
}
