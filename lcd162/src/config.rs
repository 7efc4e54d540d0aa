use dotenv::var;
use eyre::eyre;
use lcd162_gpio::lcd::hd44780::backlight::{BacklightCurve, DEFAULT_BACKLIGHT_PERCENT};
use lcd162_gpio::lcd::hd44780::timing::Timing;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILE_VAR: &str = "LCD162_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "lcd162.json";

/// Where the registers live.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// In memory, with every write and delay recorded.
    Sim,
    /// A memory-mapped register image.
    Raw,
}

impl FromStr for Backend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sim" => Ok(Backend::Sim),
            "raw" => Ok(Backend::Raw),
            _ => Err(eyre!("Unknown backend `{}`, expected `sim` or `raw`", s)),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sim => write!(f, "sim"),
            Backend::Raw => write!(f, "raw"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Register image mapped by the raw backend.
    pub register_image: PathBuf,
    pub clock_hz: u32,
    /// Backlight brightness after init, in percent.
    pub backlight: u8,
    /// `clamped` or `wrapping`.
    pub backlight_curve: String,
    pub greeting: String,
    /// How far to count on the second row.
    pub counter: i16,
}

impl Config {
    fn path() -> PathBuf {
        let config_str = var_os(CONFIG_FILE_VAR);
        let config_str: &OsStr = config_str
            .as_deref()
            .unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
        Path::new(config_str).to_path_buf()
    }

    pub fn try_load() -> Option<Self> {
        let config_path = Self::path();
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let file = std::fs::File::create(Self::path())?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Overrides values with the `LCD162_*` variables that are set.
    pub fn apply_env(&mut self) -> eyre::Result<()> {
        if let Ok(backend) = var("LCD162_BACKEND") {
            self.backend = backend.parse::<Backend>()?;
        }
        if let Ok(path) = var("LCD162_REGISTER_IMAGE") {
            self.register_image = path.into();
        }
        if let Ok(clock_hz) = var("LCD162_CLOCK_HZ") {
            self.clock_hz = clock_hz.parse::<u32>()?;
        }
        if let Ok(backlight) = var("LCD162_BACKLIGHT") {
            self.backlight = backlight.parse::<u8>()?;
        }
        if let Ok(curve) = var("LCD162_BACKLIGHT_CURVE") {
            self.backlight_curve = curve;
        }
        if let Ok(greeting) = var("LCD162_GREETING") {
            self.greeting = greeting;
        }
        if let Ok(counter) = var("LCD162_COUNTER") {
            self.counter = counter.parse::<i16>()?;
        }
        Ok(())
    }

    pub fn curve(&self) -> eyre::Result<BacklightCurve> {
        Ok(self.backlight_curve.parse::<BacklightCurve>()?)
    }

    pub fn timing(&self) -> eyre::Result<Timing> {
        if self.clock_hz == 0 {
            return Err(eyre!("Clock frequency must not be 0"));
        }
        Ok(Timing::for_clock(self.clock_hz))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: Backend::Sim,
            register_image: PathBuf::from("lcd162.regs"),
            clock_hz: Timing::DEFAULT_CLOCK_HZ,
            backlight: DEFAULT_BACKLIGHT_PERCENT,
            backlight_curve: BacklightCurve::default().to_string(),
            greeting: "Hello, LCD!".to_string(),
            counter: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "backend": "raw", "counter": 3 }"#).unwrap();
        assert_eq!(config.backend, Backend::Raw);
        assert_eq!(config.counter, 3);
        assert_eq!(config.clock_hz, 16_000_000);
        assert_eq!(config.backlight, 60);
        assert_eq!(config.curve().unwrap(), BacklightCurve::Clamped);
    }

    #[test]
    fn default_config_round_trips() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }

    #[test]
    fn bad_values_are_reported() {
        let config = Config {
            backlight_curve: "linear".to_string(),
            clock_hz: 0,
            ..Config::default()
        };
        assert!(config.curve().is_err());
        assert!(config.timing().is_err());
        assert!("spi".parse::<Backend>().is_err());
        assert_eq!("sim".parse::<Backend>().unwrap(), Backend::Sim);
    }

    #[test]
    fn file_and_env_overrides() {
        let path = std::env::temp_dir().join(format!("lcd162-config-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        // Only this test touches the process environment.
        unsafe {
            std::env::set_var(CONFIG_FILE_VAR, &path);
        }
        assert_eq!(Config::path(), path);
        assert_eq!(Config::try_load(), None);

        let config = Config {
            greeting: "Saved".to_string(),
            clock_hz: 8_000_000,
            ..Config::default()
        };
        config.save().unwrap();
        let mut loaded = Config::try_load().unwrap();
        assert_eq!(loaded, config);

        unsafe {
            std::env::set_var("LCD162_BACKEND", "raw");
            std::env::set_var("LCD162_COUNTER", "42");
            std::env::set_var("LCD162_BACKLIGHT_CURVE", "wrapping");
        }
        let applied = loaded.apply_env();
        unsafe {
            std::env::set_var("LCD162_COUNTER", "many");
        }
        let rejected = loaded.clone().apply_env();
        unsafe {
            for name in [
                CONFIG_FILE_VAR,
                "LCD162_BACKEND",
                "LCD162_COUNTER",
                "LCD162_BACKLIGHT_CURVE",
            ] {
                std::env::remove_var(name);
            }
        }
        std::fs::remove_file(&path).unwrap();

        applied.unwrap();
        assert!(rejected.is_err());
        assert_eq!(loaded.backend, Backend::Raw);
        assert_eq!(loaded.counter, 42);
        assert_eq!(loaded.curve().unwrap(), BacklightCurve::Wrapping);
        assert_eq!(loaded.greeting, "Saved");
        assert_eq!(loaded.timing().unwrap().clock_hz, 8_000_000);
    }
}
