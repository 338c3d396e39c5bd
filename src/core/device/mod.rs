//! Serial query client for Ouman controllers.
//!
//! The controller speaks a plain-text line protocol: the host writes a query
//! identifier terminated by `\r`, the device answers with one text line. An
//! empty answer means the query failed. There is no session or handshake.

use std::{
    io::{self, Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, trace};

pub mod error;
pub mod models;

pub use error::DeviceError;
pub use models::{DeviceModel, Models, QueryKey};

/// Read timeout used when none is configured.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest reply accepted before the line is treated as noise.
pub const MAX_REPLY_LEN: usize = 256;

const QUERY_TERMINATOR: u8 = b'\r';

/// Anything that can answer a query with a text reply.
pub trait QueryChannel {
    /// Sends `query` and returns the trimmed reply. An empty string means the
    /// device had no answer.
    fn query(&mut self, query: &str) -> Result<String, DeviceError>;
}

impl<T: QueryChannel + ?Sized> QueryChannel for &mut T {
    fn query(&mut self, query: &str) -> Result<String, DeviceError> {
        (**self).query(query)
    }
}

/// Line-oriented query client over a byte port.
pub struct DeviceClient<P> {
    port: P,
}

impl DeviceClient<Box<dyn SerialPort>> {
    /// Opens `path` with the model's line settings (8N1 at the model's baud
    /// rate) and drops any stale input.
    pub fn open(path: &str, model: &DeviceModel, timeout: Duration) -> Result<Self, DeviceError> {
        let port_open_error = |source| DeviceError::PortOpen {
            path: path.to_string(),
            source,
        };

        let port = serialport::new(path, model.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(timeout)
            .open()
            .map_err(port_open_error)?;
        port.clear(ClearBuffer::All).map_err(port_open_error)?;

        debug!(
            "Opened {} at {} baud for {} (timeout {:?})",
            path, model.baud_rate, model.name, timeout
        );
        Ok(Self::new(port))
    }
}

impl<P: Read + Write> DeviceClient<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    fn send(&mut self, query: &str) -> Result<(), DeviceError> {
        let write_error = |source| DeviceError::Write {
            query: query.to_string(),
            source,
        };
        let mut frame = Vec::with_capacity(query.len() + 1);
        frame.extend_from_slice(query.as_bytes());
        frame.push(QUERY_TERMINATOR);

        self.port.write_all(&frame).map_err(write_error)?;
        self.port.flush().map_err(write_error)
    }

    /// Reads one line. Leading terminators are skipped; a timeout or EOF ends
    /// the line with whatever arrived so far. A line longer than
    /// `MAX_REPLY_LEN` is a read error.
    fn receive(&mut self, query: &str) -> Result<String, DeviceError> {
        let mut line = Vec::with_capacity(32);
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => match byte[0] {
                    b'\r' | b'\n' if line.is_empty() => continue,
                    b'\r' | b'\n' => break,
                    _ if line.len() == MAX_REPLY_LEN => {
                        return Err(DeviceError::Read {
                            query: query.to_string(),
                            source: io::Error::new(
                                io::ErrorKind::InvalidData,
                                format!("reply exceeds {} bytes without a terminator", MAX_REPLY_LEN),
                            ),
                        })
                    }
                    b => line.push(b),
                },
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    trace!("Read timed out for '{}' after {} byte(s)", query, line.len());
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(DeviceError::Read {
                        query: query.to_string(),
                        source,
                    })
                }
            }
        }

        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: Read + Write> QueryChannel for DeviceClient<P> {
    fn query(&mut self, query: &str) -> Result<String, DeviceError> {
        self.send(query)?;
        self.receive(query)
    }
}
