//! Mass and length unit conversion.
//!
//! Mass is always persisted in kilograms; the display unit is a user
//! preference. Length values (body height) are persisted in centimetres.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exact international avoirdupois pound.
pub const KG_PER_LB: f64 = 0.453_592_37;

pub const CM_PER_INCH: f64 = 2.54;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown unit: {0}")]
pub struct UnitParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    #[default]
    Kg,
    Lb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    #[default]
    Cm,
    In,
}

impl MassUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Lb => "lb",
        }
    }

    /// Convert a value expressed in this unit to kilograms.
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            Self::Kg => value,
            Self::Lb => value * KG_PER_LB,
        }
    }

    /// Convert a kilogram value into this unit.
    pub fn from_kg(self, kg: f64) -> f64 {
        match self {
            Self::Kg => kg,
            Self::Lb => kg / KG_PER_LB,
        }
    }

    pub fn convert(self, value: f64, to: MassUnit) -> f64 {
        to.from_kg(self.to_kg(value))
    }
}

impl LengthUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cm => "cm",
            Self::In => "in",
        }
    }

    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            Self::Cm => value,
            Self::In => value * CM_PER_INCH,
        }
    }

    pub fn from_cm(self, cm: f64) -> f64 {
        match self {
            Self::Cm => cm,
            Self::In => cm / CM_PER_INCH,
        }
    }

    pub fn convert(self, value: f64, to: LengthUnit) -> f64 {
        to.from_cm(self.to_cm(value))
    }
}

impl FromStr for MassUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" | "kgs" | "kilogram" | "kilograms" => Ok(Self::Kg),
            "lb" | "lbs" | "pound" | "pounds" => Ok(Self::Lb),
            other => Err(UnitParseError(other.to_string())),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => Ok(Self::Cm),
            "in" | "inch" | "inches" => Ok(Self::In),
            other => Err(UnitParseError(other.to_string())),
        }
    }
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to a fixed number of decimals for display.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
