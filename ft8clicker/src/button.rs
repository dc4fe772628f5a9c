//! Logical buttons of the FT8 application that can be learned.

use {
    serde::{Deserialize, Serialize},
    strum::Display,
};

pub const ENABLE_TX: &str = "enable_tx";
/// "Tx 6" sends the CQ message.
pub const SEND_CQ: &str = "tx6";

/// Every band button, lowest frequency first. Band cycling follows this order.
pub const ALL_BANDS: &[&str] = &[
    "160m", "80m", "40m", "30m", "20m", "17m", "15m", "12m", "10m", "6m", "2m", "70cm",
];

pub const DEFAULT_VISIBLE_BANDS: &[&str] = &["40m", "20m", "17m", "15m", "12m", "10m"];

pub const DEFAULT_BAND: &str = "40m";

pub fn is_band(id: &str) -> bool {
    ALL_BANDS.contains(&id)
}

/// Whether `id` names a button this program knows how to learn.
pub fn is_managed(id: &str) -> bool {
    id == ENABLE_TX || id == SEND_CQ || is_band(id)
}

pub fn display_name(id: &str) -> &str {
    match id {
        ENABLE_TX => "Enable Tx",
        SEND_CQ => "Tx 6",
        _ => id,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ButtonState {
    Active,
    Inactive,
    #[default]
    Unknown,
}

impl ButtonState {
    /// Short label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            ButtonState::Active => "ON",
            ButtonState::Inactive => "OFF",
            ButtonState::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != ButtonState::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_managed_ids() {
        assert!(is_managed("enable_tx"));
        assert!(is_managed("tx6"));
        assert!(is_managed("70cm"));
        assert!(!is_managed("tx5"));
        assert!(!is_band("tx6"));
        assert_eq!(display_name("tx6"), "Tx 6");
        assert_eq!(display_name("20m"), "20m");
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ButtonState::Inactive).unwrap(),
            "\"inactive\""
        );
        assert_eq!(ButtonState::Active.to_string(), "active");
        assert_eq!(ButtonState::Active.label(), "ON");
    }
}
