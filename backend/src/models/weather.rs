use serde::{Deserialize, Serialize};
use std::fmt;

/// Ambient weather reported alongside a detection pass.
///
/// Parsing never fails: an unrecognized label is kept verbatim and carries the
/// neutral multiplier, so a mislabelled weather feed degrades the schedule
/// instead of blocking it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCondition {
    Clear,
    Normal,
    Rain,
    Snow,
    Fog,
    Unrecognized(String),
}

impl WeatherCondition {
    /// Parse a weather label (case-insensitive).
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "clear" => WeatherCondition::Clear,
            "normal" | "" => WeatherCondition::Normal,
            "rain" => WeatherCondition::Rain,
            "snow" => WeatherCondition::Snow,
            "fog" => WeatherCondition::Fog,
            _ => WeatherCondition::Unrecognized(label.to_string()),
        }
    }

    /// Load multiplier applied for this weather.
    pub fn factor(&self) -> f64 {
        match self {
            WeatherCondition::Clear | WeatherCondition::Normal => 1.0,
            WeatherCondition::Rain => 1.2,
            WeatherCondition::Snow => 1.4,
            WeatherCondition::Fog => 1.15,
            WeatherCondition::Unrecognized(_) => 1.0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, WeatherCondition::Unrecognized(_))
    }

    pub fn label(&self) -> &str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Normal => "normal",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Unrecognized(label) => label,
        }
    }
}

impl Default for WeatherCondition {
    fn default() -> Self {
        WeatherCondition::Normal
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for WeatherCondition {
    fn from(label: String) -> Self {
        WeatherCondition::parse(&label)
    }
}

impl From<&str> for WeatherCondition {
    fn from(label: &str) -> Self {
        WeatherCondition::parse(label)
    }
}

impl From<WeatherCondition> for String {
    fn from(weather: WeatherCondition) -> Self {
        weather.label().to_string()
    }
}
