use anyhow::{ensure, Context};
use ftmcore::ingest::IngestConfig;
use ftmcore::source::{SerialConfig, DEFAULT_BAUD_RATE};
use ftmcore::Grammar;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM7";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyUSB0";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    pub port: String,
    pub baud_rate: u32,
    pub output: PathBuf,
    pub grammar: Grammar,
    pub timeout_ms: u64,
    pub echo_lines: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            output: PathBuf::from("ftm_data.csv"),
            grammar: Grammar::Session,
            timeout_ms: 1000,
            echo_lines: true,
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub output: Option<PathBuf>,
    pub grammar: Option<Grammar>,
    pub timeout_ms: Option<u64>,
    pub echo_lines: Option<bool>,
}

impl LoggerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading logger config {}", path_ref.display()))?;
        let config: LoggerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing logger config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            port: overrides.port.unwrap_or(self.port),
            baud_rate: overrides.baud_rate.unwrap_or(self.baud_rate),
            output: overrides.output.unwrap_or(self.output),
            grammar: overrides.grammar.unwrap_or(self.grammar),
            timeout_ms: overrides.timeout_ms.unwrap_or(self.timeout_ms),
            echo_lines: overrides.echo_lines.unwrap_or(self.echo_lines),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.port.trim().is_empty(), "serial port name is empty");
        ensure!(self.baud_rate > 0, "baud rate must be positive");
        ensure!(self.timeout_ms > 0, "read timeout must be positive");
        ensure!(!self.output.as_os_str().is_empty(), "output path is empty");
        Ok(())
    }

    pub fn to_serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    pub fn to_ingest_config(&self) -> IngestConfig {
        IngestConfig {
            grammar: self.grammar,
            echo_lines: self.echo_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_device_settings() {
        let cfg = LoggerConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.to_serial_config().timeout, Duration::from_secs(1));
        assert_eq!(cfg.output, PathBuf::from("ftm_data.csv"));
        cfg.validate().unwrap();
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"port: COM3\ngrammar: summary\noutput: ranges.csv\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = LoggerConfig::load(&path).unwrap();
        assert_eq!(cfg.port, "COM3");
        assert_eq!(cfg.grammar, Grammar::Summary);
        assert_eq!(cfg.output, PathBuf::from("ranges.csv"));
        assert_eq!(cfg.baud_rate, 115_200);
    }

    #[test]
    fn config_load_rejects_unknown_grammar() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"grammar: burst\n").unwrap();
        let path = temp.into_temp_path();
        assert!(LoggerConfig::load(&path).is_err());
    }

    #[test]
    fn explicit_flags_override_file_values() {
        let cfg = LoggerConfig {
            port: "COM3".into(),
            timeout_ms: 500,
            ..Default::default()
        }
        .with_overrides(ConfigOverrides {
            port: Some("/dev/ttyACM0".into()),
            echo_lines: Some(false),
            ..Default::default()
        });
        assert_eq!(cfg.port, "/dev/ttyACM0");
        assert_eq!(cfg.timeout_ms, 500);
        assert!(!cfg.to_ingest_config().echo_lines);
    }

    #[test]
    fn bundled_sample_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/ftmlogger.yaml");
        let cfg = LoggerConfig::load(path).unwrap();
        assert_eq!(
            cfg,
            LoggerConfig {
                port: "/dev/ttyUSB0".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = LoggerConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
