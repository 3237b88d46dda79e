use std::time::Duration;
use thiserror::Error;

/// Erreurs du catalogue et du transport SADP
#[derive(Error, Debug)]
pub enum SadpError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{field} required for {command} command")]
    MissingField {
        field: &'static str,
        command: &'static str,
    },

    #[error("MAC address required when target IP is 0.0.0.0")]
    NoRoute,

    #[error("invalid target address '{0}'")]
    InvalidTarget(String),

    #[error("failed to enumerate network interfaces: {0}")]
    Interfaces(#[source] std::io::Error),

    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),

    #[error("failed to send command: {0}")]
    Send(#[source] std::io::Error),

    #[error("failed to read response: {0}")]
    Read(#[source] std::io::Error),

    #[error("no response (timeout after {0:?})")]
    Timeout(Duration),

    #[error("no response from device with MAC {0} (timeout)")]
    NoResponseFromMac(String),

    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::se::SeError),
}
