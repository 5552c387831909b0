//! Byte sources feeding the line reader.
//!
//! The serial port is the production source. A captured text file can stand
//! in for it when replaying a recorded session.

use crate::prelude::{IngestError, IngestResult};
use crate::reader::LineReader;
use serialport::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Upper bound on how long a silent device can delay a cancellation check.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection parameters for the ranging device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

pub type SerialLineReader = LineReader<Box<dyn SerialPort>>;

/// Opens the port 8N1 without flow control and wraps it in a line reader.
pub fn open_serial(config: &SerialConfig) -> IngestResult<SerialLineReader> {
    let port = serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.timeout)
        .open()
        .map_err(|err| {
            IngestError::source_failure(format!("opening serial port {}", config.port), err.into())
        })?;
    Ok(LineReader::new(port))
}

/// Opens a captured device transcript for replay.
pub fn open_replay<P: AsRef<Path>>(path: P) -> IngestResult<LineReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        IngestError::source_failure(format!("opening replay file {}", path.display()), err)
    })?;
    Ok(LineReader::new(file))
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (usb.manufacturer, usb.product),
            _ => (None, None),
        };
        Self {
            name: info.port_name,
            manufacturer,
            product,
        }
    }
}

/// USB CDC ports first, then USB serial adapters, then everything else.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("COM") {
        return (2, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (3, 0, basename.to_string())
}

/// Lists serial ports the OS reports, in a stable order.
pub fn list_ports() -> IngestResult<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|err| IngestError::source_failure("enumerating serial ports", err.into()))?;
    let mut ports: Vec<PortInfo> = ports.into_iter().map(PortInfo::from).collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports.dedup_by(|a, b| a.name == b.name);
    Ok(ports)
}
