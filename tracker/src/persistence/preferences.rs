//! Typed view over the preference key/value table.

use serde::{Deserialize, Serialize};
use training::{LengthUnit, MassUnit};

use super::traits::PreferenceRepository;
use super::PersistenceError;

pub const KEY_MASS_UNIT: &str = "mass_unit";
pub const KEY_LENGTH_UNIT: &str = "length_unit";
pub const KEY_WEEKLY_GOAL: &str = "weekly_goal";
pub const KEY_DISPLAY_NAME: &str = "display_name";
pub const KEY_HEIGHT_CM: &str = "height_cm";
pub const KEY_BODYWEIGHT_KG: &str = "bodyweight_kg";

pub const DEFAULT_WEEKLY_GOAL: u32 = 3;

/// User preferences. Missing or unparseable values fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub mass_unit: MassUnit,
    pub length_unit: LengthUnit,
    pub weekly_goal: u32,
    pub display_name: Option<String>,
    pub height_cm: Option<f64>,
    pub bodyweight_kg: Option<f64>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            mass_unit: MassUnit::default(),
            length_unit: LengthUnit::default(),
            weekly_goal: DEFAULT_WEEKLY_GOAL,
            display_name: None,
            height_cm: None,
            bodyweight_kg: None,
        }
    }
}

impl Preferences {
    pub async fn load<P: PreferenceRepository>(repo: &P) -> Result<Self, PersistenceError> {
        let mut prefs = Self::default();
        for (key, value) in repo.list_preferences().await? {
            if let Err(reason) = prefs.apply(&key, &value) {
                tracing::warn!(key = %key, value = %value, "Ignoring preference: {}", reason);
            }
        }
        Ok(prefs)
    }

    /// Validate and store one preference, keeping the typed view in sync.
    pub async fn set<P: PreferenceRepository>(
        &mut self,
        repo: &P,
        key: &str,
        value: &str,
    ) -> Result<(), PersistenceError> {
        self.apply(key, value)
            .map_err(PersistenceError::InvalidValue)?;
        repo.set_preference(key, value).await
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            KEY_MASS_UNIT => {
                self.mass_unit = value.parse::<MassUnit>().map_err(|e| e.to_string())?
            }
            KEY_LENGTH_UNIT => {
                self.length_unit = value.parse::<LengthUnit>().map_err(|e| e.to_string())?
            }
            KEY_WEEKLY_GOAL => {
                self.weekly_goal = value
                    .parse::<u32>()
                    .map_err(|e| e.to_string())?
                    .max(1)
            }
            KEY_DISPLAY_NAME => self.display_name = Some(value.to_string()),
            KEY_HEIGHT_CM => self.height_cm = Some(parse_positive(value)?),
            KEY_BODYWEIGHT_KG => self.bodyweight_kg = Some(parse_positive(value)?),
            other => return Err(format!("unknown preference '{other}'")),
        }
        Ok(())
    }
}

fn parse_positive(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        Ok(v) => Err(format!("{v} is not a positive number")),
        Err(e) => Err(e.to_string()),
    }
}
