//! Foreground segmentation, connected components and contour geometry.

use std::f32::consts::{PI, SQRT_2};

use super::Histogram;

/// Binary pixel mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// An empty mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// A mask selecting every pixel.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![true; width as usize * height as usize],
        }
    }

    /// Builds a mask from a per-pixel predicate.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
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

    /// Whether `(x, y)` is selected. Out-of-bounds is unselected.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx]
    }

    /// Whether the pixel at row-major index `i` is selected.
    #[must_use]
    pub fn get_index(&self, i: usize) -> bool {
        self.data.get(i).copied().unwrap_or(false)
    }

    /// Selects or clears `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize] = value;
        }
    }

    /// Row-major iterator over the selection flags.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.data.iter().copied()
    }

    /// Number of selected pixels.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.data.iter().filter(|&&b| b).count() as u64
    }

    /// Pixels selected in both masks.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| *a && *b)
                .collect(),
        }
    }

    /// Shrinks the selection by `radius` pixels (8-neighbourhood, repeated).
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn erode(&self, radius: u32) -> Self {
        let mut current = self.clone();
        for _ in 0..radius {
            let prev = current.clone();
            for y in 0..self.height {
                for x in 0..self.width {
                    let (xi, yi) = (i64::from(x), i64::from(y));
                    if prev.get(xi, yi)
                        && !NEIGHBORS
                            .iter()
                            .all(|(dx, dy)| prev.get(xi + dx, yi + dy))
                    {
                        current.set(x, y, false);
                    }
                }
            }
        }
        current
    }

    /// Pixels not selected.
    #[must_use]
    pub fn not(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|b| !b).collect(),
        }
    }
}

/// Mean colour of the one-pixel frame border.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn background_color(rgb: &image::RgbImage) -> [f32; 3] {
    let (w, h) = rgb.dimensions();
    let mut sum = [0.0f64; 3];
    let mut n = 0u64;
    for (x, y, p) in rgb.enumerate_pixels() {
        if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
            for (s, c) in sum.iter_mut().zip(p.0) {
                *s += f64::from(c);
            }
            n += 1;
        }
    }
    if n == 0 {
        return [0.0; 3];
    }
    #[allow(clippy::cast_possible_truncation)]
    sum.map(|s| (s / n as f64) as f32)
}

/// Separates the subject from a roughly uniform background.
///
/// Pixels whose RGB distance from the border colour exceeds
/// `max(otsu, min_contrast)` are foreground.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn foreground_mask(rgb: &image::RgbImage, min_contrast: f32) -> Mask {
    let bg = background_color(rgb);
    let distances: Vec<f32> = rgb
        .pixels()
        .map(|p| {
            p.0.iter()
                .zip(bg)
                .map(|(&c, b)| (f32::from(c) - b).powi(2))
                .sum::<f32>()
                .sqrt()
        })
        .collect();
    let hist = Histogram::from_values(distances.iter().map(|d| d.min(255.0) as u8));
    let threshold = f32::from(hist.otsu_threshold()).max(min_contrast);
    Mask {
        width: rgb.width(),
        height: rgb.height(),
        data: distances.iter().map(|&d| d > threshold).collect(),
    }
}

/// Geometry of one connected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStats {
    /// Label in [`Components::labels`], starting at 1.
    pub label: u32,
    /// Pixel count.
    pub area: u64,
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column.
    pub max_x: u32,
    /// Bottom row.
    pub max_y: u32,
    sum_x: u64,
    sum_y: u64,
}

impl ComponentStats {
    /// Bounding box width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Bounding box height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Area divided by bounding box area.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fill_ratio(&self) -> f32 {
        self.area as f32 / (u64::from(self.width()) * u64::from(self.height())) as f32
    }

    /// Short side over long side of the bounding box.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = (self.width() as f32, self.height() as f32);
        w.min(h) / w.max(h)
    }

    /// Centre of mass.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn centroid(&self) -> (f32, f32) {
        let n = self.area.max(1) as f32;
        (self.sum_x as f32 / n, self.sum_y as f32 / n)
    }

    /// Whether the component touches the edge of a `width`×`height` frame.
    #[must_use]
    pub const fn touches_border(&self, width: u32, height: u32) -> bool {
        self.min_x == 0 || self.min_y == 0 || self.max_x + 1 >= width || self.max_y + 1 >= height
    }
}

/// 8-connected component labelling of a mask.
#[derive(Debug, Clone)]
pub struct Components {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    stats: Vec<ComponentStats>,
}

const NEIGHBORS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl Components {
    /// Labels the selected pixels of `mask`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    #[must_use]
    pub fn label(mask: &Mask) -> Self {
        let (w, h) = (mask.width, mask.height);
        let mut labels = vec![0u32; mask.data.len()];
        let mut stats = Vec::new();
        let mut stack = Vec::new();

        for start in 0..mask.data.len() {
            if !mask.data[start] || labels[start] != 0 {
                continue;
            }
            let label = stats.len() as u32 + 1;
            let sx = (start % w as usize) as u32;
            let sy = (start / w as usize) as u32;
            let mut s = ComponentStats {
                label,
                area: 0,
                min_x: sx,
                min_y: sy,
                max_x: sx,
                max_y: sy,
                sum_x: 0,
                sum_y: 0,
            };
            labels[start] = label;
            stack.push((sx, sy));
            while let Some((x, y)) = stack.pop() {
                s.area += 1;
                s.sum_x += u64::from(x);
                s.sum_y += u64::from(y);
                s.min_x = s.min_x.min(x);
                s.min_y = s.min_y.min(y);
                s.max_x = s.max_x.max(x);
                s.max_y = s.max_y.max(y);
                for (dx, dy) in NEIGHBORS {
                    let (nx, ny) = (i64::from(x) + dx, i64::from(y) + dy);
                    if !mask.get(nx, ny) {
                        continue;
                    }
                    let idx = ny as usize * w as usize + nx as usize;
                    if labels[idx] == 0 {
                        labels[idx] = label;
                        stack.push((nx as u32, ny as u32));
                    }
                }
            }
            stats.push(s);
        }

        Self {
            width: w,
            height: h,
            labels,
            stats,
        }
    }

    /// Per-component statistics, in label order.
    #[must_use]
    pub fn stats(&self) -> &[ComponentStats] {
        &self.stats
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether no component was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Row-major label per pixel, 0 for background.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// The largest component (first one on ties).
    #[must_use]
    pub fn largest(&self) -> Option<&ComponentStats> {
        self.stats
            .iter()
            .rev()
            .max_by_key(|s| s.area)
    }

    /// Components with at least `min_area` pixels.
    pub fn at_least(&self, min_area: u64) -> impl Iterator<Item = &ComponentStats> {
        self.stats.iter().filter(move |s| s.area >= min_area)
    }

    /// Mask of the pixels carrying `label`.
    #[must_use]
    pub fn mask_of(&self, label: u32) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self.labels.iter().map(|&l| l == label).collect(),
        }
    }
}

fn direction_index(dx: i64, dy: i64) -> Option<usize> {
    NEIGHBORS.iter().position(|&d| d == (dx, dy))
}

/// Perimeter of the outer contour of the component containing the first
/// selected pixel (raster order).
///
/// Moore-neighbour tracing, clockwise in image coordinates; straight steps
/// count 1 and diagonal steps √2. A single isolated pixel has perimeter 0.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
#[must_use]
pub fn contour_perimeter(mask: &Mask) -> f32 {
    let Some(first) = mask.data.iter().position(|&b| b) else {
        return 0.0;
    };
    let w = mask.width as usize;
    let start = ((first % w) as i64, (first / w) as i64);

    // Raster order guarantees the west neighbour of the start is background.
    let mut search_from = 4usize;
    let mut current = start;
    let mut first_move: Option<usize> = None;
    let mut perimeter = 0.0f32;
    let max_steps = 4 * mask.count() + 8;

    for _ in 0..max_steps {
        let found = (0..8)
            .map(|i| (search_from + i) % 8)
            .find(|&d| mask.get(current.0 + NEIGHBORS[d].0, current.1 + NEIGHBORS[d].1));
        let Some(dir) = found else {
            return 0.0;
        };
        if current == start {
            match first_move {
                Some(m) if m == dir => break,
                None => first_move = Some(dir),
                Some(_) => {}
            }
        }

        perimeter += if dir % 2 == 0 { 1.0 } else { SQRT_2 };
        let prev = NEIGHBORS[(dir + 7) % 8];
        let step = NEIGHBORS[dir];
        current = (current.0 + step.0, current.1 + step.1);
        // The last background pixel examined, seen from the new position.
        search_from = direction_index(prev.0 - step.0, prev.1 - step.1).unwrap_or(0);
    }
    perimeter
}

/// Isoperimetric ratio `4πA/P²`, capped at 1. Zero when `perimeter` is 0.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn circularity(area: u64, perimeter: f32) -> f32 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    (4.0 * PI * area as f32 / (perimeter * perimeter)).min(1.0)
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    fn rect(w: u32, h: u32, x0: u32, y0: u32, rw: u32, rh: u32) -> Mask {
        Mask::from_fn(w, h, |x, y| x >= x0 && x < x0 + rw && y >= y0 && y < y0 + rh)
    }

    fn disc(size: u32, r: f32) -> Mask {
        let c = size as f32 / 2.0;
        Mask::from_fn(size, size, |x, y| {
            let (dx, dy) = (x as f32 + 0.5 - c, y as f32 + 0.5 - c);
            dx * dx + dy * dy <= r * r
        })
    }

    #[test]
    fn test_mask_basics() {
        let mut m = Mask::new(3, 2);
        m.set(1, 1, true);
        m.set(9, 9, true);
        assert_eq!(m.count(), 1);
        assert!(m.get(1, 1));
        assert!(!m.get(-1, 0));
        assert_eq!(m.not().count(), 5);
        assert_eq!(m.and(&Mask::full(3, 2)).count(), 1);
    }

    #[test]
    fn test_erode_shrinks_rectangle() {
        let m = rect(20, 20, 2, 2, 10, 8);
        assert_eq!(m.erode(1).count(), 8 * 6);
        assert_eq!(m.erode(2).count(), 6 * 4);
        assert_eq!(m.erode(0), m);
        assert_eq!(m.erode(10).count(), 0);
    }

    #[test]
    fn test_rectangle_perimeter() {
        let m = rect(20, 20, 3, 4, 10, 6);
        assert!((contour_perimeter(&m) - 28.0).abs() < 1e-4);
    }

    #[test]
    fn test_line_perimeter_counts_both_sides() {
        let m = rect(10, 3, 2, 1, 5, 1);
        assert!((contour_perimeter(&m) - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_single_pixel_and_empty() {
        assert!(contour_perimeter(&rect(5, 5, 2, 2, 1, 1)).abs() < f32::EPSILON);
        assert!(contour_perimeter(&Mask::new(5, 5)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_disc_is_circular() {
        let m = disc(100, 30.0);
        let c = circularity(m.count(), contour_perimeter(&m));
        assert!(c > 0.8, "disc circularity {c}");
    }

    #[test]
    fn test_thin_rectangle_is_not_circular() {
        let m = rect(120, 20, 5, 5, 100, 8);
        let c = circularity(m.count(), contour_perimeter(&m));
        assert!(c < 0.4, "strip circularity {c}");
    }

    #[test]
    fn test_components_eight_connected() {
        let mut m = Mask::new(6, 6);
        m.set(0, 0, true);
        m.set(1, 1, true);
        m.set(4, 4, true);
        let comps = Components::label(&m);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps.largest().map(|s| s.area), Some(2));
        assert_eq!(comps.at_least(2).count(), 1);
        assert_eq!(comps.mask_of(1).count(), 2);
    }

    #[test]
    fn test_component_geometry() {
        let comps = Components::label(&rect(20, 20, 2, 5, 8, 4));
        let s = comps.largest().copied().unwrap();
        assert_eq!((s.width(), s.height()), (8, 4));
        assert!((s.fill_ratio() - 1.0).abs() < 1e-6);
        assert!((s.aspect_ratio() - 0.5).abs() < 1e-6);
        let (cx, cy) = s.centroid();
        assert!((cx - 5.5).abs() < 1e-4 && (cy - 6.5).abs() < 1e-4);
        assert!(!s.touches_border(20, 20));
    }

    #[test]
    fn test_foreground_mask_on_disc() {
        let img = image::RgbImage::from_fn(60, 60, |x, y| {
            let (dx, dy) = (x as f32 - 30.0, y as f32 - 30.0);
            if dx * dx + dy * dy < 400.0 {
                image::Rgb([200, 30, 30])
            } else {
                image::Rgb([250, 250, 250])
            }
        });
        let mask = foreground_mask(&img, 20.0);
        let area = mask.count();
        assert!((1150..1350).contains(&area), "area {area}");
    }

    #[test]
    fn test_foreground_mask_uniform_is_empty() {
        let img = image::RgbImage::from_pixel(30, 30, image::Rgb([120, 120, 120]));
        assert_eq!(foreground_mask(&img, 20.0).count(), 0);
    }
}
