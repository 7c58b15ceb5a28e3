use crate::game::gameplay::PlayMode;
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard};

const CONFIG_PATH: &str = "keystep.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    pub fn parse(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

pub const MIN_MUSIC_RATE: f32 = 0.25;
pub const MAX_MUSIC_RATE: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Silence before chart step zero when a run starts.
    pub lead_in_ms: u32,
    /// Audio drift tolerated before the device is re-seeked. 0 disables.
    pub resync_threshold_ms: u32,
    pub default_mode: PlayMode,
    /// Playback rate of the headless music device.
    pub music_rate: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            lead_in_ms: 2000,
            resync_threshold_ms: 40,
            default_mode: PlayMode::Play,
            music_rate: 1.0,
        }
    }
}

impl Config {
    /// Populates a config from parsed INI data, keeping defaults for missing
    /// or malformed keys.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let log_level = match conf.get("Options", "LogLevel") {
            Some(v) => LogLevel::from_str(&v).unwrap_or_else(|()| {
                warn!("Unknown LogLevel '{v}', using {}.", default.log_level.as_str());
                default.log_level
            }),
            None => default.log_level,
        };
        let default_mode = match conf.get("Options", "DefaultMode") {
            Some(v) => PlayMode::from_str(&v).unwrap_or_else(|()| {
                warn!("Unknown DefaultMode '{v}', using {}.", default.default_mode.as_str());
                default.default_mode
            }),
            None => default.default_mode,
        };
        let lead_in_ms = conf
            .get("Options", "LeadInMs")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(default.lead_in_ms);
        let resync_threshold_ms = conf
            .get("Options", "ResyncThresholdMs")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(default.resync_threshold_ms);
        let music_rate = conf
            .get("Options", "MusicRate")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|r| r.is_finite())
            .map_or(default.music_rate, |r| r.clamp(MIN_MUSIC_RATE, MAX_MUSIC_RATE));

        Self {
            log_level,
            lead_in_ms,
            resync_threshold_ms,
            default_mode,
            music_rate,
        }
    }

    fn to_ini_string(&self) -> String {
        // [Options] keys in alphabetical order
        let mut content = String::new();
        content.push_str("[Options]\n");
        content.push_str(&format!("DefaultMode={}\n", self.default_mode.as_str()));
        content.push_str(&format!("LeadInMs={}\n", self.lead_in_ms));
        content.push_str(&format!("LogLevel={}\n", self.log_level.as_str()));
        content.push_str(&format!("MusicRate={}\n", self.music_rate));
        content.push_str(&format!("ResyncThresholdMs={}\n", self.resync_threshold_ms));
        content.push('\n');
        content
    }
}

static CONFIG: LazyLock<Mutex<Config>> = LazyLock::new(|| Mutex::new(Config::default()));

#[inline(always)]
fn lock() -> MutexGuard<'static, Config> {
    CONFIG.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// --- File I/O ---

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    std::fs::write(CONFIG_PATH, Config::default().to_ini_string())
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            let cfg = Config::from_ini(&conf);
            *lock() = cfg;
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values."),
    }
}

pub fn get() -> Config {
    *lock()
}
