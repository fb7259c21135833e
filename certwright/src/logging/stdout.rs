use super::{CertwrightLogger, Log, LoggingError, Severity};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {}

pub struct StdoutLogger {}

impl StdoutLogger {
    pub fn new(_config: Config) -> Self {
        Self {}
    }
}

impl CertwrightLogger for StdoutLogger {
    fn send_log(&self, log: &Log) -> Result<(), LoggingError> {
        match log {
            Log::CertificateIssued(ci) => info!(
                "Certificate issued with serial: [{}] By issuer: [{}] For registration: [{}] Names: [{}] SHA256: [{}]",
                ci.serial,
                ci.issuer,
                ci.registration_id,
                ci.names.join(", "),
                ci.digest,
            ),
            Log::InternalMessage(im) => match im.severity {
                Severity::Error => error!("{}", im.message),
                Severity::Warning => warn!("{}", im.message),
                Severity::Info => info!("{}", im.message),
            },
            Log::Heartbeat(hb) => debug!("Heartbeat from {}", hb.identifier),
        }
        Ok(())
    }
}
