use serde::Deserialize;
use serde_with::DeserializeFromStr;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::schedule::EntryKind;

const CONFIG_PATH_ENV_VAR: &str = "STAMPCAL_CONFIG_FILE";

/// Common install locations of a font covering traditional Chinese.
const FONT_LOCATIONS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansTC-Regular.otf",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, DeserializeFromStr)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default = "Person::default_color")]
    pub color: HexColor,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: Option<PathBuf>,
    pub scale: u32,
    pub background: HexColor,
    pub quality: u8,
    pub font: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub tick_rate_ms: u64,
    pub default_kind: EntryKind,
    pub people: Vec<Person>,
    pub export: ExportConfig,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        HexColor { r, g, b }
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for HexColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || Error::new(ErrorKind::ConfigParse, &format!("invalid colour '{}'", s));

        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| invalid());

        Ok(HexColor::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Person {
    fn default_color() -> HexColor {
        HexColor::new(0x1d, 0x4e, 0xd8)
    }

    pub fn new(name: &str, color: HexColor) -> Self {
        Person {
            name: name.to_owned(),
            color,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: None,
            scale: 2,
            background: HexColor::new(0x1e, 0x29, 0x3b),
            quality: 100,
            font: None,
        }
    }
}

impl ExportConfig {
    pub fn scale(&self) -> u32 {
        self.scale.clamp(1, 8)
    }

    pub fn quality(&self) -> u8 {
        self.quality.clamp(1, 100)
    }

    /// Target directory of exported images; the download directory unless
    /// configured otherwise.
    pub fn directory(&self) -> PathBuf {
        self.directory
            .as_deref()
            .map(expand_home)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Font files to try in order; a configured font is the only candidate.
    pub fn font_candidates(&self) -> Vec<PathBuf> {
        match &self.font {
            Some(font) => vec![expand_home(font)],
            None => FONT_LOCATIONS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            title: "伸動保健室預約月曆".to_owned(),
            tick_rate_ms: 500,
            default_kind: EntryKind::Class,
            people: vec![
                Person::new("CHARLES", HexColor::new(0x1d, 0x4e, 0xd8)),
                Person::new("OLLIE", HexColor::new(0x15, 0x80, 0x3d)),
            ],
            export: ExportConfig::default(),
        }
    }
}

impl Config {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(50))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_owned(),
    }
}

pub(crate) fn find_configfile_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
        locations.push(PathBuf::from(path));
    }

    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("stampcal").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".stampcal.toml"));
    }

    locations
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|err| Error::from(err).with_msg(&format!("cannot read {}", path.display())))?;

    Config::from_toml(&content).map_err(|err| {
        let msg = format!(
            "{}: {}",
            path.display(),
            err.message.as_deref().unwrap_or_default()
        );
        err.with_msg(&msg)
    })
}

/// Loads the explicitly given config file, or the first existing one of the
/// default locations, or falls back to the defaults.
pub fn load_suitable_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path);
    }

    if let Some(found) = find_configfile_locations()
        .into_iter()
        .find(|candidate| candidate.is_file())
    {
        log::info!("Loading configuration from {}", found.display());
        return load_config(&found);
    }

    log::info!("No configuration file found, using defaults");
    Ok(Config::default())
}
