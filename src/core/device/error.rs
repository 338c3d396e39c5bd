use thiserror::Error;

/// Errors raised while talking to the heating controller.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The serial device could not be opened or configured.
    #[error("Failed to open serial device {path}: {source}")]
    PortOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// Writing a query to the device failed.
    #[error("Failed to send query '{query}'")]
    Write {
        query: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the reply failed for a reason other than a timeout.
    #[error("Failed to read reply for '{query}'")]
    Read {
        query: String,
        #[source]
        source: std::io::Error,
    },

    /// The requested model is not in the protocol table.
    #[error("Unknown Ouman device: {0}")]
    UnknownModel(String),
}
