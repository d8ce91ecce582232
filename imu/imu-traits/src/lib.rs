use std::io::{self, BufRead};
use std::sync::mpsc;

use thiserror::Error;

mod sample;

pub use sample::{Axis, Sample, Vector3, SAMPLE_LEN};

// --- Standard Error Type ---
#[derive(Debug, Error)]
pub enum ImuError {
    /// Error opening or configuring the serial device
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),
    /// Error reading from the transport
    #[error("Read error: {0}")]
    Io(#[from] io::Error),
    /// The transport reported end of stream
    #[error("Device disconnected")]
    Disconnected,
    /// Error handing a sample to its consumer
    #[error("Write error: {0}")]
    WriteError(String),
    /// Error during device configuration or setup
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Error sending to another thread
    #[error("Command send error: {0}")]
    CommandSendError(String),
    #[error("Invalid sample length: expected 6 values, got {0}")]
    InvalidSampleLength(usize),
}

impl From<mpsc::SendError<Sample>> for ImuError {
    fn from(err: mpsc::SendError<Sample>) -> Self {
        ImuError::CommandSendError(format!("Failed to send sample: {}", err))
    }
}

// --- Collaborators ---

/// Transport that hands out delimiter-terminated chunks of bytes.
pub trait ByteSource {
    /// Blocks until `delimiter` has been read or `max_size` bytes have
    /// accumulated, and returns everything read including the delimiter.
    ///
    /// A source with a read timeout returns whatever arrived before the
    /// timeout, which may be nothing.
    fn read_until(&mut self, delimiter: u8, max_size: usize) -> Result<Vec<u8>, ImuError>;
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_until(&mut self, delimiter: u8, max_size: usize) -> Result<Vec<u8>, ImuError> {
        (**self).read_until(delimiter, max_size)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_until(&mut self, delimiter: u8, max_size: usize) -> Result<Vec<u8>, ImuError> {
        (**self).read_until(delimiter, max_size)
    }
}

/// Consumer of decoded samples.
pub trait SampleSink {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError>;
}

impl SampleSink for Vec<Sample> {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        self.push(sample);
        Ok(())
    }
}

impl SampleSink for mpsc::Sender<Sample> {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        self.send(sample)?;
        Ok(())
    }
}

impl<K: SampleSink + ?Sized> SampleSink for &mut K {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        (**self).accept(sample)
    }
}

impl<K: SampleSink + ?Sized> SampleSink for Box<K> {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        (**self).accept(sample)
    }
}

/// An absent sink drops every sample.
impl<K: SampleSink> SampleSink for Option<K> {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        match self {
            Some(sink) => sink.accept(sample),
            None => Ok(()),
        }
    }
}

/// Hands each sample to both sinks, first to second.
impl<A: SampleSink, B: SampleSink> SampleSink for (A, B) {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        self.0.accept(sample)?;
        self.1.accept(sample)
    }
}

// --- Byte sources ---

/// [`ByteSource`] over any buffered reader, e.g. a captured stream or a
/// buffered serial port.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> ByteSource for ReaderSource<R> {
    fn read_until(&mut self, delimiter: u8, max_size: usize) -> Result<Vec<u8>, ImuError> {
        read_delimited(&mut self.reader, delimiter, max_size)
    }
}

/// Reads up to and including `delimiter`, stopping early after `max_size`
/// bytes.
///
/// A read timeout ends the call with the bytes gathered so far. End of stream
/// with nothing gathered is [`ImuError::Disconnected`].
pub fn read_delimited<R: BufRead + ?Sized>(
    reader: &mut R,
    delimiter: u8,
    max_size: usize,
) -> Result<Vec<u8>, ImuError> {
    let mut frame = Vec::new();

    while frame.len() < max_size {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(frame),
            Err(e) => return Err(e.into()),
        };

        if available.is_empty() {
            if frame.is_empty() {
                return Err(ImuError::Disconnected);
            }
            return Ok(frame);
        }

        let room = max_size - frame.len();
        let window = &available[..available.len().min(room)];
        let (used, found) = match window.iter().position(|&b| b == delimiter) {
            Some(idx) => (idx + 1, true),
            None => (window.len(), false),
        };
        frame.extend_from_slice(&window[..used]);
        reader.consume(used);

        if found {
            break;
        }
    }

    Ok(frame)
}
