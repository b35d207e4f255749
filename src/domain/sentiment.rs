use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentClassification {
    /// Sentinel for "no data", never produced by `from_score`.
    DataUnavailable,
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl fmt::Display for SentimentClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataUnavailable => write!(f, "Data Unavailable"),
            Self::ExtremeFear => write!(f, "Extreme Fear"),
            Self::Fear => write!(f, "Fear"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Greed => write!(f, "Greed"),
            Self::ExtremeGreed => write!(f, "Extreme Greed"),
        }
    }
}

impl SentimentClassification {
    /// Band for a 0-100 score (thresholds 25/45/55/75).
    ///
    /// Upstream classification text is never trusted; every stored value is
    /// re-classified here so `value` and `classification` always agree.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => Self::ExtremeFear,
            25..=44 => Self::Fear,
            45..=55 => Self::Neutral,
            56..=75 => Self::Greed,
            _ => Self::ExtremeGreed,
        }
    }

    pub fn color_hex(&self) -> &'static str {
        match self {
            Self::DataUnavailable => "#404040",
            Self::ExtremeFear => "#FF4500",  // Orange Red
            Self::Fear => "#FFA500",         // Orange
            Self::Neutral => "#808080",      // Gray
            Self::Greed => "#90EE90",        // Light Green
            Self::ExtremeGreed => "#008000", // Green
        }
    }
}
