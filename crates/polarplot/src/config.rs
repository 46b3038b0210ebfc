use anyhow::{Context, Result};
use polarplot_core::MotionConfig;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tracing::debug;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "polarplot.toml";

/// Main configuration for the plotter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Machine geometry and motion limits
    #[serde(default)]
    pub motion: MotionConfig,

    /// Motor controller connection
    #[serde(default)]
    pub serial: SerialConfig,
}

/// Serial output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device the step frames are written to
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// 5, 6, 7 or 8
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// 1 or 2
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    #[serde(default)]
    pub parity: Parity,

    #[serde(default)]
    pub flow_control: FlowControl,

    /// How long a single write may block before the run fails
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            flow_control: FlowControl::default(),
            write_timeout_ms: default_write_timeout(),
        }
    }
}

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    57_600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_write_timeout() -> u64 {
    1000
}

impl SerialConfig {
    /// Port builder carrying every line setting.
    pub fn builder(&self) -> Result<serialport::SerialPortBuilder> {
        let data_bits = match self.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => anyhow::bail!("serial.data_bits must be 5, 6, 7 or 8, got {other}"),
        };
        let stop_bits = match self.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => anyhow::bail!("serial.stop_bits must be 1 or 2, got {other}"),
        };
        let parity = match self.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let flow_control = match self.flow_control {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        };

        Ok(serialport::new(&self.device, self.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(self.write_timeout_ms)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            anyhow::bail!("serial.device cannot be empty");
        }
        if self.baud_rate == 0 {
            anyhow::bail!("serial.baud_rate must be positive");
        }
        if self.write_timeout_ms == 0 {
            anyhow::bail!("serial.write_timeout_ms must be positive");
        }
        self.builder().map(drop)
    }
}

impl Config {
    /// Load configuration from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            // TOML first, then JSON
            _ => Self::from_toml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    /// Load `path` if it exists, otherwise start from the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    /// Parse configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config as TOML")
    }

    /// Save to `path`, as JSON when the extension says so and TOML otherwise
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => {
                serde_json::to_string_pretty(self).context("failed to serialize config as JSON")?
            }
            _ => self.to_toml()?,
        };
        fs::write(path, content)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.motion.validate().context("invalid motion settings")?;

        self.serial.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[motion]
anchor_separation_mm = 1000.0
start_left_mm = 700.0
start_right_mm = 750.0
max_speed_mm_s = 60.0

[motion.surface]
min_x = -400.0
max_x = 400.0
min_y = 200.0
max_y = 1000.0

[serial]
device = "/dev/ttyACM0"
baud_rate = 115200
parity = "even"
flow_control = "hardware"
"#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.motion.anchor_separation_mm, 1000.0);
        assert_eq!(config.motion.max_speed_mm_s, 60.0);
        assert_eq!(config.motion.surface.max_y, 1000.0);
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.flow_control, FlowControl::Hardware);
        assert_eq!(config.serial.data_bits, 8);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "motion": {
                "anchor_separation_mm": 900.0,
                "tick_period_us": 4096
            },
            "serial": { "device": "COM3" }
        }"#;

        let config = Config::from_json(json).unwrap();
        assert_eq!(config.motion.anchor_separation_mm, 900.0);
        assert_eq!(config.motion.tick_period_us, 4096);
        assert_eq!(config.motion.accel_mm_s2, MotionConfig::default().accel_mm_s2);
        assert_eq!(config.serial.device, "COM3");
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 57_600);
        assert_eq!(config.serial.stop_bits, 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_line_settings() {
        for toml in [
            "[serial]\ndata_bits = 9\n",
            "[serial]\nstop_bits = 3\n",
            "[serial]\nbaud_rate = 0\n",
        ] {
            let config = Config::from_toml(toml).unwrap();
            assert!(config.validate().is_err(), "{toml}");
        }
        assert!(Config::from_toml("[serial]\nparity = \"mark\"\n").is_err());
    }

    #[test]
    fn test_invalid_motion() {
        let config = Config::from_toml("[motion]\nstart_left_mm = 100.0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid motion settings"));
    }

    #[test]
    fn test_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.motion.start_left_mm = 650.0;

        for name in ["plotter.toml", "plotter.json"] {
            let path = dir.path().join(name);
            config.write(&path).unwrap();
            assert_eq!(Config::from_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(Config::from_file(dir.path().join("absent.toml")).is_err());
    }
}
