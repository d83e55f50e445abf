//! Convolution filters over `f32` planes.

use super::Mask;

/// Single-channel `f32` image. Row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Plane {
    /// A zero-filled plane.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Plane holding the luma values of `image`.
    #[must_use]
    pub fn from_luma(image: &image::GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.pixels().map(|p| f32::from(p.0[0])).collect(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw values, row-major.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    fn clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        self.data[y * self.width as usize + x]
    }

    /// Applies `f` to every value.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Correlates with a square `size`×`size` kernel, replicating borders.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn convolve(&self, kernel: &[f32], size: usize) -> Self {
        debug_assert_eq!(kernel.len(), size * size);
        let mut out = Self::new(self.width, self.height);
        if self.data.is_empty() {
            return out;
        }
        let half = (size / 2) as i64;
        let w = self.width as usize;
        for y in 0..self.height as usize {
            for x in 0..w {
                let mut acc = 0.0;
                for (ky, row) in kernel.chunks_exact(size).enumerate() {
                    let sy = y as i64 + ky as i64 - half;
                    for (kx, k) in row.iter().enumerate() {
                        acc += k * self.clamped(x as i64 + kx as i64 - half, sy);
                    }
                }
                out.data[y * w + x] = acc;
            }
        }
        out
    }

    /// Convolves with the same 1-D kernel horizontally then vertically.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn convolve_separable(&self, kernel: &[f32]) -> Self {
        let half = (kernel.len() / 2) as i64;
        let w = self.width as usize;
        let pass = |src: &Self, horizontal: bool| {
            let mut out = Self::new(src.width, src.height);
            for y in 0..src.height as usize {
                for x in 0..w {
                    let acc: f32 = kernel
                        .iter()
                        .enumerate()
                        .map(|(i, k)| {
                            let o = i as i64 - half;
                            if horizontal {
                                k * src.clamped(x as i64 + o, y as i64)
                            } else {
                                k * src.clamped(x as i64, y as i64 + o)
                            }
                        })
                        .sum();
                    out.data[y * w + x] = acc;
                }
            }
            out
        };
        if self.data.is_empty() {
            return self.clone();
        }
        pass(&pass(self, true), false)
    }

    /// Gaussian blur with an odd kernel `size`; sigma derived from the size.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn gaussian_blur(&self, size: usize) -> Self {
        let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
        self.convolve_separable(&gaussian_kernel(size, sigma))
    }

    /// 4-neighbour Laplacian.
    #[must_use]
    pub fn laplacian(&self) -> Self {
        const K: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];
        self.convolve(&K, 3)
    }

    /// Sobel gradient magnitude.
    #[must_use]
    pub fn sobel_magnitude(&self) -> Self {
        const GX: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
        const GY: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];
        let gx = self.convolve(&GX, 3);
        let gy = self.convolve(&GY, 3);
        Self {
            width: self.width,
            height: self.height,
            data: gx
                .data
                .iter()
                .zip(&gy.data)
                .map(|(a, b)| a.hypot(*b))
                .collect(),
        }
    }

    /// Values selected by `mask` (all values when `None`).
    pub fn masked<'a>(&'a self, mask: Option<&'a Mask>) -> impl Iterator<Item = f32> + 'a {
        self.data
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask.map_or(true, |m| m.get_index(*i)))
            .map(|(_, &v)| v)
    }

    /// Mean and population variance over `mask`. `(0, 0)` when nothing selected.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    #[must_use]
    pub fn mean_variance(&self, mask: Option<&Mask>) -> (f32, f32) {
        let (n, sum, sum_sq) = self
            .masked(mask)
            .fold((0u64, 0.0f64, 0.0f64), |(n, s, sq), v| {
                let v = f64::from(v);
                (n + 1, s + v, sq + v * v)
            });
        if n == 0 {
            return (0.0, 0.0);
        }
        let mean = sum / n as f64;
        let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
        (mean as f32, variance as f32)
    }
}

/// Normalized 1-D Gaussian kernel.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as f32;
    let raw: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - half;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

/// Real part of a Gabor kernel, `size`×`size`, row-major.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn gabor_kernel(
    size: usize,
    sigma: f32,
    theta: f32,
    lambda: f32,
    gamma: f32,
    psi: f32,
) -> Vec<f32> {
    let half = (size / 2) as f32;
    let (sin_t, cos_t) = theta.sin_cos();
    let mut kernel = Vec::with_capacity(size * size);
    for j in 0..size {
        let y = j as f32 - half;
        for i in 0..size {
            let x = i as f32 - half;
            let xr = x * cos_t + y * sin_t;
            let yr = -x * sin_t + y * cos_t;
            let envelope =
                (-(xr * xr + gamma * gamma * yr * yr) / (2.0 * sigma * sigma)).exp();
            kernel.push(envelope * (2.0 * std::f32::consts::PI * xr / lambda + psi).cos());
        }
    }
    kernel
}
