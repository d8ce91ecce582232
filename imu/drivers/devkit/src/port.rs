use std::fmt::Write as _;
use std::io::BufReader;
use std::time::Duration;

use imu_traits::{ByteSource, ImuError, ReaderSource};
use serialport::{ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};
use tracing::{debug, info};

/// Default wait for data before a read gives back what it has.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

const READ_BUFFER_SIZE: usize = 1024;

/// Serial connection to the dev kit, read one delimited frame at a time.
pub struct SerialSource {
    port_name: String,
    inner: ReaderSource<BufReader<Box<dyn SerialPort>>>,
}

impl SerialSource {
    /// Opens `port_name` (e.g. `/dev/ttyACM1` or `COM3`) and discards any
    /// stale input already buffered by the driver.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ImuError> {
        if baud_rate == 0 {
            return Err(ImuError::ConfigurationError(format!(
                "invalid baud rate 0 for {}",
                port_name
            )));
        }
        let serial_port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()?;
        info!("Opened port: {} [{} baud]", port_name, baud_rate);

        let mut source = Self {
            port_name: port_name.to_string(),
            inner: ReaderSource::new(BufReader::with_capacity(READ_BUFFER_SIZE, serial_port)),
        };
        source.clear()?;
        Ok(source)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> Result<u32, ImuError> {
        Ok(self.port().baud_rate()?)
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), ImuError> {
        self.port_mut().set_timeout(timeout)?;
        Ok(())
    }

    fn port(&self) -> &dyn SerialPort {
        &**self.inner.get_ref().get_ref()
    }

    fn port_mut(&mut self) -> &mut dyn SerialPort {
        &mut **self.inner.get_mut().get_mut()
    }

    fn clear(&mut self) -> Result<(), ImuError> {
        let pending = self.port().bytes_to_read()?;
        self.port_mut().clear(ClearBuffer::Input)?;
        debug!("Cleared {} stale bytes from {}", pending, self.port_name);
        Ok(())
    }
}

impl ByteSource for SerialSource {
    fn read_until(&mut self, delimiter: u8, max_size: usize) -> Result<Vec<u8>, ImuError> {
        self.inner.read_until(delimiter, max_size)
    }
}

/// A serial port as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: String,
    pub description: String,
    pub hardware_id: String,
}

impl From<SerialPortInfo> for PortDescription {
    fn from(info: SerialPortInfo) -> Self {
        let (description, hardware_id) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = usb
                    .product
                    .or(usb.manufacturer)
                    .unwrap_or_else(|| "USB serial device".to_string());
                let serial = usb
                    .serial_number
                    .map(|s| format!(" SER={}", s))
                    .unwrap_or_default();
                (
                    description,
                    format!("USB VID:PID={:04X}:{:04X}{}", usb.vid, usb.pid, serial),
                )
            }
            SerialPortType::PciPort => ("PCI serial device".to_string(), "PCI".to_string()),
            SerialPortType::BluetoothPort => {
                ("Bluetooth serial device".to_string(), "BLUETOOTH".to_string())
            }
            SerialPortType::Unknown => ("n/a".to_string(), "n/a".to_string()),
        };

        Self {
            name: info.port_name,
            description,
            hardware_id,
        }
    }
}

pub fn list_ports() -> Result<Vec<PortDescription>, ImuError> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(PortDescription::from).collect())
}

pub fn format_ports(ports: &[PortDescription]) -> String {
    if ports.is_empty() {
        return "There are no serial ports available in the system.\n".to_string();
    }

    let mut out = format!("There are {} serial ports available:\n", ports.len());
    for port in ports {
        let _ = writeln!(
            out,
            "\t# Port: {}: {} [{}]",
            port.name, port.description, port.hardware_id
        );
    }
    out
}

pub fn print_ports() -> Result<(), ImuError> {
    print!("{}", format_ports(&list_ports()?));
    Ok(())
}
