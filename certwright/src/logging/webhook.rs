use super::{CertwrightLogger, Log, LoggingError};

use serde::Deserialize;
use tokio::runtime::Handle;

use std::time::Duration;

/// The struct that defines the Webhook specific configuration of the logging
/// service.
#[derive(Deserialize)]
pub struct Config {
    pub auth_header: Option<String>,
    pub url: String,
    /// Seconds to wait for the webhook to answer
    pub timeout: u8,
}

/// The specific logger that is configured from the `Config` struct.
pub struct WebhookLogger {
    /// A tokio runtime to send logs on
    runtime: Handle,
    /// A reqwest client configured with the webhook timeout. None if the
    /// client could not be built, in which case every send fails.
    client: Option<reqwest::Client>,
    config: Config,
}

impl WebhookLogger {
    pub fn new(config: Config, runtime: Handle) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout.into()))
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                error!("Could not create webhook client: {}", e);
                None
            }
        };

        Self { runtime, client, config }
    }
}

impl CertwrightLogger for WebhookLogger {
    /// Send a log to the webhook. Sending a log will not block sending logs
    /// to other loggers (like stdout) but it does mean delivery failures
    /// are only reported in the operational log.
    fn send_log(&self, log: &Log) -> Result<(), LoggingError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| LoggingError::CommunicationError(String::from("no webhook client")))?;

        let data = serde_json::to_string(log)
            .map_err(|e| LoggingError::SerializationError(e.to_string()))?;

        let request = client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .body(data);

        let request = match &self.config.auth_header {
            Some(auth) => request.header("Authorization", auth),
            None => request,
        };

        self.runtime.spawn(async move {
            if let Err(e) = request.send().await {
                error!("Could not log to webhook: {}", e);
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::logging::CertificateIssued;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn posts_json_with_authorization() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config {
            auth_header: Some(String::from("Bearer certwright-test")),
            url: format!("http://{}/logs", listener.local_addr().unwrap()),
            timeout: 5,
        };
        let logger = WebhookLogger::new(config, Handle::current());

        let log = Log::CertificateIssued(CertificateIssued {
            serial: String::from("11aa"),
            issuer: String::from("intermediate"),
            registration_id: 42,
            common_name: String::from("not-example.com"),
            names: vec![String::from("not-example.com")],
            digest: String::from("00ff"),
            not_before: 1_700_000_000,
            not_after: 1_731_536_000,
        });
        logger.send_log(&log).unwrap();

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = vec![];
        let mut buffer = [0u8; 4096];
        while !String::from_utf8_lossy(&received).ends_with("}}") {
            let read = socket.read(&mut buffer).await.unwrap();
            if read == 0 {
                break;
            }
            received.extend_from_slice(&buffer[..read]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();

        let request = String::from_utf8_lossy(&received).to_string();
        assert!(request.starts_with("POST /logs "));
        let lowered = request.to_lowercase();
        assert!(lowered.contains("authorization: bearer certwright-test"));
        assert!(lowered.contains("content-type: application/json"));

        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["CertificateIssued"]["serial"], "11aa");
        assert_eq!(body["CertificateIssued"]["registration_id"], 42);
    }

    #[test]
    fn missing_client_is_a_communication_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let logger = WebhookLogger {
            runtime: runtime.handle().clone(),
            client: None,
            config: Config {
                auth_header: None,
                url: String::from("http://127.0.0.1:1/"),
                timeout: 1,
            },
        };

        let log = Log::Heartbeat(crate::logging::Heartbeat {
            identifier: String::from("certwright"),
        });
        assert!(matches!(logger.send_log(&log), Err(LoggingError::CommunicationError(_))));
    }
}
