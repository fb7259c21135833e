mod stdout;
#[cfg(feature = "webhook")]
mod webhook;

use stdout::StdoutLogger;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A generic heartbeat message to keep external systems informed
/// that certwright is still healthy
#[derive(Debug, Serialize)]
pub struct Heartbeat {
    /// Can be used to identify this particular instance in redundant
    /// environments
    pub identifier: String,
}

/// Issued when a certificate has been signed and stored
#[derive(Debug, Serialize)]
pub struct CertificateIssued {
    pub serial: String,
    pub issuer: String,
    pub registration_id: i64,
    pub common_name: String,
    pub names: Vec<String>,
    /// SHA-256 of the certificate DER, hex encoded
    pub digest: String,
    /// Unix seconds
    pub not_before: i64,
    /// Unix seconds
    pub not_after: i64,
}

/// Issued when errors or notable events occur within the system
#[derive(Debug, Serialize)]
pub struct InternalMessage {
    /// The severity of the log message
    pub severity: Severity,
    /// Extra data to be passed
    pub message: String,
}

#[derive(Debug, Serialize)]
pub enum Log {
    CertificateIssued(CertificateIssued),
    InternalMessage(InternalMessage),
    Heartbeat(Heartbeat),
}

#[derive(Default, Deserialize)]
pub struct LoggingConfiguration {
    /// Reported in heartbeats
    identifier: Option<String>,
    stdout: Option<stdout::Config>,
    #[cfg(feature = "webhook")]
    webhook: Option<webhook::Config>,
}

#[derive(Debug)]
pub enum LoggingError {
    SerializationError(String),
    CommunicationError(String),
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggingError::SerializationError(e) => write!(f, "Could not serialize log: {}", e),
            LoggingError::CommunicationError(e) => write!(f, "Could not deliver log: {}", e),
        }
    }
}

/// To implement a new logger, it must implement the `send_log` function
/// and return success or failure.
pub trait CertwrightLogger {
    fn send_log(&self, log: &Log) -> Result<(), LoggingError>;
}

/// Fan logs out to every configured logger until all senders are gone.
/// Loggers that talk to the network spawn their work onto `runtime`.
pub fn start_logging_thread(
    config: LoggingConfiguration,
    log_receiver: Receiver<Log>,
    #[allow(unused_variables)] runtime: Handle,
) {
    let identifier = config.identifier.unwrap_or_else(|| String::from("certwright"));

    // Configure the different loggers
    let stdout_logger = match config.stdout {
        Some(config) => {
            println!("Configured logger: stdout");
            Some(StdoutLogger::new(config))
        }
        None => None,
    };

    #[cfg(feature = "webhook")]
    let webhook_logger = match config.webhook {
        Some(config) => {
            println!("Configured logger: webhook");
            Some(webhook::WebhookLogger::new(config, runtime))
        }
        None => None,
    };

    // Main logging loop
    loop {
        let log = match log_receiver.recv_timeout(Duration::from_secs(300)) {
            Ok(l) => l,
            Err(RecvTimeoutError::Timeout) => Log::Heartbeat(Heartbeat {
                identifier: identifier.clone(),
            }),
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(logger) = &stdout_logger {
            if let Err(e) = logger.send_log(&log) {
                error!("Could not write log to stdout: {}", e);
            }
        }

        #[cfg(feature = "webhook")]
        if let Some(logger) = &webhook_logger {
            if let Err(e) = logger.send_log(&log) {
                error!("Could not send logs to webhook: {}", e);
            }
        }
    }

    info!("Logging thread has shut down");
}
