use {
    crate::{
        button::{ALL_BANDS, DEFAULT_VISIBLE_BANDS, ENABLE_TX},
        registry::ButtonRegistry,
    },
    anyhow::Context as _,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::{io, path::PathBuf, time::Duration},
    tracing::{info, warn},
};

pub const CLICK_INTERVAL_RANGE: (f64, f64) = (0.1, 3.0);
pub const CQ_TIME_RANGE: (u32, u32) = (60, 3000);
pub const CQS_PER_BAND_RANGE: (u32, u32) = (0, 100);
pub const APP_MINUTES_RANGE: (u32, u32) = (5, 240);

/// User-adjustable timing and band options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between checks of the "Enable Tx" button.
    pub click_interval: f64,
    pub visible_bands: Vec<String>,
    /// Seconds between CQ calls.
    pub cq_time: u32,
    /// CQs to call on a band before moving to the next one; 0 disables band cycling.
    pub cqs_remaining: u32,
    /// Seconds before the session stops by itself; 0 means no limit.
    pub app_time: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            click_interval: 0.5,
            visible_bands: DEFAULT_VISIBLE_BANDS.iter().map(|s| s.to_string()).collect(),
            cq_time: 90,
            cqs_remaining: 10,
            app_time: 30 * 60,
        }
    }
}

/// A partial change to [`Config`]. Out-of-range values are clamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub click_interval: Option<f64>,
    pub visible_bands: Option<Vec<String>>,
    pub cq_time: Option<u32>,
    pub cqs_per_band: Option<u32>,
    /// Session limit in minutes; 0 removes the limit.
    pub app_minutes: Option<u32>,
}

impl Config {
    pub fn click_interval(&self) -> Duration {
        let seconds = if self.click_interval.is_finite() {
            self.click_interval
                .clamp(CLICK_INTERVAL_RANGE.0, CLICK_INTERVAL_RANGE.1)
        } else {
            Config::default().click_interval
        };
        Duration::from_secs_f64(seconds)
    }

    pub fn is_visible(&self, band: &str) -> bool {
        self.visible_bands.iter().any(|b| b == band)
    }

    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(interval) = update.click_interval {
            if interval.is_finite() {
                self.click_interval = interval.clamp(CLICK_INTERVAL_RANGE.0, CLICK_INTERVAL_RANGE.1);
            }
        }
        if let Some(bands) = update.visible_bands {
            self.visible_bands = ALL_BANDS
                .iter()
                .filter(|band| bands.iter().any(|b| b == *band))
                .map(|band| band.to_string())
                .collect();
        }
        if let Some(cq_time) = update.cq_time {
            self.cq_time = cq_time.clamp(CQ_TIME_RANGE.0, CQ_TIME_RANGE.1);
        }
        if let Some(cqs) = update.cqs_per_band {
            self.cqs_remaining = cqs.clamp(CQS_PER_BAND_RANGE.0, CQS_PER_BAND_RANGE.1);
        }
        if let Some(minutes) = update.app_minutes {
            self.app_time = if minutes == 0 {
                0
            } else {
                minutes.clamp(APP_MINUTES_RANGE.0, APP_MINUTES_RANGE.1) * 60
            };
        }
    }
}

/// Everything stored in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub config: Config,
    #[serde(default)]
    pub learned_buttons: ButtonRegistry,
    /// Keys this version does not know about, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn from_value(mut value: Value) -> anyhow::Result<Self> {
        if upgrade_legacy(&mut value) {
            info!("upgraded settings from an older format");
        }
        serde_json::from_value(value).context("invalid settings")
    }
}

/// Rewrites older layouts of the learned buttons in place. Returns whether anything changed.
pub fn upgrade_legacy(value: &mut Value) -> bool {
    let Some(buttons) = value
        .get_mut("learned_buttons")
        .and_then(Value::as_object_mut)
    else {
        return false;
    };
    let mut changed = false;
    if !buttons.contains_key(ENABLE_TX) {
        if let Some(button) = buttons.remove("tx_enable") {
            buttons.insert(ENABLE_TX.into(), button);
            changed = true;
        }
    }
    for button in buttons.values_mut() {
        let Some(button) = button.as_object_mut() else {
            continue;
        };
        let Some(color) = button.remove("color") else {
            continue;
        };
        let key = match &color {
            Value::String(key) => key.clone(),
            Value::Array(channels) => format!(
                "({})",
                channels.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
            ),
            other => other.to_string(),
        };
        let mut states = Map::new();
        states.insert(key, Value::String("inactive".into()));
        button.insert("states".into(), Value::Object(states));
        changed = true;
    }
    changed
}

/// Reads and writes the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the settings, falling back to defaults when the file is missing or unreadable.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                info!("no settings at {:?}, using defaults", self.path);
                Settings::default()
            }
            Err(err) => {
                warn!("failed to load settings, using defaults: {err:?}");
                Settings::default()
            }
        }
    }

    fn try_load(&self) -> anyhow::Result<Option<Settings>> {
        let text = match fs_err::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {:?}", self.path))?;
        Settings::from_value(value).map(Some)
    }

    /// Writes a temporary sibling and renames it over the file.
    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        fs_err::write(&tmp, json)?;
        fs_err::rename(&tmp, &self.path)?;
        Ok(())
    }
}
