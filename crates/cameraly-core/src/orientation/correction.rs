//! Per-manufacturer rotation corrections.
//!
//! Some vendors report the camera sensor orientation off by a fixed amount
//! for all of their devices. The table is an ordered list of rules scanned
//! linearly; the first rule whose manufacturer (and model, when given)
//! substrings match wins. No match means no correction.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::LensDirection;

/// One device quirk rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCorrection {
    /// Case-insensitive substring of the manufacturer name.
    pub manufacturer_match: Cow<'static, str>,
    /// Case-insensitive substring of the model name; `None` matches any model.
    #[serde(default)]
    pub model_match: Option<Cow<'static, str>>,
    /// Clockwise offset added to the rotation, in degrees.
    pub rotation_offset_degrees: u16,
    /// Lens the rule applies to; `None` applies to both.
    #[serde(default)]
    pub applies_to_lens_direction: Option<LensDirection>,
}

impl DeviceCorrection {
    /// A rule for every model and lens of a manufacturer.
    pub const fn manufacturer(name: &'static str, offset: u16) -> Self {
        Self {
            manufacturer_match: Cow::Borrowed(name),
            model_match: None,
            rotation_offset_degrees: offset,
            applies_to_lens_direction: None,
        }
    }

    /// Whether this rule covers the given device and lens.
    pub fn matches(&self, manufacturer: &str, model: &str, lens: LensDirection) -> bool {
        if let Some(direction) = self.applies_to_lens_direction {
            if direction != lens {
                return false;
            }
        }
        if !contains_ignore_case(manufacturer, &self.manufacturer_match) {
            return false;
        }
        match &self.model_match {
            Some(pattern) => contains_ignore_case(model, pattern),
            None => true,
        }
    }
}

/// Corrections found through field testing.
pub const BUILT_IN_CORRECTIONS: &[DeviceCorrection] = &[
    DeviceCorrection::manufacturer("samsung", 90),
    DeviceCorrection::manufacturer("xiaomi", 270),
];

/// An immutable, ordered correction table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionTable {
    rules: Vec<DeviceCorrection>,
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self::built_in()
    }
}

impl CorrectionTable {
    /// The built-in table.
    pub fn built_in() -> Self {
        Self {
            rules: BUILT_IN_CORRECTIONS.to_vec(),
        }
    }

    /// The built-in table with `overrides` consulted first.
    pub fn with_overrides(overrides: impl IntoIterator<Item = DeviceCorrection>) -> Self {
        let mut rules: Vec<DeviceCorrection> = overrides.into_iter().collect();
        rules.extend_from_slice(BUILT_IN_CORRECTIONS);
        Self { rules }
    }

    /// An empty table; every lookup yields zero.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// First matching rule, if any.
    pub fn lookup(&self, manufacturer: &str, model: &str, lens: LensDirection) -> Option<&DeviceCorrection> {
        self.rules
            .iter()
            .find(|rule| rule.matches(manufacturer, model, lens))
    }

    /// Offset in degrees for the device, 0 when no rule matches.
    pub fn offset_for(&self, manufacturer: &str, model: &str, lens: LensDirection) -> u16 {
        self.lookup(manufacturer, model, lens)
            .map(|rule| rule.rotation_offset_degrees % 360)
            .unwrap_or(0)
    }

    pub fn rules(&self) -> &[DeviceCorrection] {
        &self.rules
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
