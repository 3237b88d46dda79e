use thiserror::Error;

/// Erreurs des utilitaires réseau
#[derive(Error, Debug)]
pub enum NetError {
    #[error("invalid CIDR '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("prefix {0} is too large to expand (at most 24 host bits, /8 for IPv4)")]
    PrefixTooLarge(String),

    #[error("failed to read ARP table: {0}")]
    Arp(#[source] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("connection timeout to {0}")]
    ConnectTimeout(String),

    #[error("connection failed to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send request: {0}")]
    Send(#[source] std::io::Error),

    #[error("failed to read response: {0}")]
    Read(#[source] std::io::Error),

    #[error("invalid HTTP response: {0}")]
    MalformedResponse(String),
}
