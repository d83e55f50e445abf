//! Per-product-type quality expectations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hue interval in degrees. Wraps through 0 when `min > max` (e.g. reds, 345-20).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueRange {
    /// Start of the interval (0-360).
    pub min: f32,
    /// End of the interval (0-360).
    pub max: f32,
}

impl HueRange {
    /// Creates a hue range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether `hue` (degrees) falls inside the range.
    #[must_use]
    pub fn contains(&self, hue: f32) -> bool {
        if self.min <= self.max {
            (self.min..=self.max).contains(&hue)
        } else {
            hue >= self.min || hue <= self.max
        }
    }
}

/// Expectations for one product type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStandard {
    /// Product type name (lowercase).
    pub name: String,
    /// Ideal hue.
    pub hue: HueRange,
    /// Ideal saturation range (0-255).
    pub saturation: (u8, u8),
    /// Ideal value/brightness range (0-255).
    pub value: (u8, u8),
    /// Expected object area in analysis-frame pixels.
    pub size_range: (f32, f32),
    /// Expected circularity (1.0 = disc).
    pub circularity: f32,
    /// Tolerated blemish coverage as a fraction of the produce area.
    pub defect_tolerance: f32,
}

impl ProductStandard {
    /// Whether an HSV pixel (hue in degrees, s/v 0-255) matches the ideal colour.
    #[must_use]
    pub fn matches_color(&self, hue: f32, saturation: u8, value: u8) -> bool {
        self.hue.contains(hue)
            && (self.saturation.0..=self.saturation.1).contains(&saturation)
            && (self.value.0..=self.value.1).contains(&value)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let name = &self.name;
        for (label, deg) in [("hue.min", self.hue.min), ("hue.max", self.hue.max)] {
            if !(0.0..=360.0).contains(&deg) {
                return Err(format!("standards.{name}.{label} must be 0-360, got {deg}"));
            }
        }
        if self.saturation.0 > self.saturation.1 || self.value.0 > self.value.1 {
            return Err(format!("standards.{name}: saturation/value ranges are inverted"));
        }
        if !(self.size_range.0 >= 0.0 && self.size_range.0 <= self.size_range.1) {
            return Err(format!(
                "standards.{name}.size_range must satisfy 0 <= min <= max, got {:?}",
                self.size_range
            ));
        }
        if !(0.0..=1.0).contains(&self.circularity) {
            return Err(format!(
                "standards.{name}.circularity must be 0.0-1.0, got {}",
                self.circularity
            ));
        }
        if !(0.0..=1.0).contains(&self.defect_tolerance) || self.defect_tolerance == 0.0 {
            return Err(format!(
                "standards.{name}.defect_tolerance must be in (0.0, 1.0], got {}",
                self.defect_tolerance
            ));
        }
        Ok(())
    }
}

/// Blemish coverage tolerated when no standard applies.
pub const DEFAULT_DEFECT_TOLERANCE: f32 = 0.05;

#[allow(clippy::too_many_arguments)]
fn standard(
    name: &str,
    hue: (f32, f32),
    saturation: (u8, u8),
    value: (u8, u8),
    size_range: (f32, f32),
    circularity: f32,
    defect_tolerance: f32,
) -> ProductStandard {
    ProductStandard {
        name: name.to_string(),
        hue: HueRange::new(hue.0, hue.1),
        saturation,
        value,
        size_range,
        circularity,
        defect_tolerance,
    }
}

/// Lookup table of product standards keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct StandardsCatalog {
    standards: BTreeMap<String, ProductStandard>,
}

impl StandardsCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with the built-in produce standards.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for s in [
            standard("apple", (345.0, 20.0), (100, 255), (100, 255), (5_000.0, 50_000.0), 0.7, 0.1),
            standard("tomato", (345.0, 30.0), (100, 255), (100, 255), (3_000.0, 30_000.0), 0.8, 0.05),
            standard("banana", (40.0, 60.0), (100, 255), (100, 255), (8_000.0, 40_000.0), 0.3, 0.15),
            standard("orange", (20.0, 50.0), (100, 255), (100, 255), (4_000.0, 35_000.0), 0.75, 0.1),
            standard("cabbage", (100.0, 160.0), (50, 255), (50, 255), (10_000.0, 80_000.0), 0.6, 0.2),
            standard("potato", (30.0, 50.0), (30, 100), (80, 200), (2_000.0, 25_000.0), 0.5, 0.3),
        ] {
            catalog.insert(s);
        }
        catalog
    }

    /// Adds or replaces a standard.
    pub fn insert(&mut self, standard: ProductStandard) {
        let key = standard.name.trim().to_lowercase();
        self.standards.insert(key, standard);
    }

    /// Looks up a standard, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn get(&self, product_type: &str) -> Option<&ProductStandard> {
        self.standards.get(&product_type.trim().to_lowercase())
    }

    /// All standards, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ProductStandard> {
        self.standards.values()
    }

    /// Number of standards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.standards.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.standards.is_empty()
    }
}
