#[macro_use]
extern crate log;

use certwright::config::{self, ConfigurationError};
use certwright::logging::start_logging_thread;

use tokio::runtime::Handle;

/// Accept either a PEM block or raw DER
fn decode_request(contents: &[u8]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if contents.starts_with(b"-----BEGIN") {
        let parsed = pem::parse(contents)?;
        return Ok(parsed.contents().to_vec());
    }
    Ok(contents.to_vec())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let settings = match config::configure().await {
        Ok(settings) => settings,
        Err(ConfigurationError::ValidateOnly) => {
            println!("Configuration was validated");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for issuer in settings.authority.issuers() {
        issuer.print_signing_info();
    }

    let log_receiver = settings.log_receiver;
    let logging_configuration = settings.logging_configuration;
    let runtime = Handle::current();
    let logging_thread = std::thread::spawn(move || {
        start_logging_thread(logging_configuration, log_receiver, runtime);
    });

    let request = decode_request(&tokio::fs::read(&settings.csr_path).await?)?;
    let result = settings.authority.issue_certificate(&request, settings.registration_id).await;

    for (name, value) in settings.stats.snapshot() {
        debug!("{}: {}", name, value);
    }

    // Dropping the authority closes the log channel so the logging thread
    // flushes and exits
    drop(settings.authority);
    if logging_thread.join().is_err() {
        error!("Logging thread panicked");
    }

    let issued = result?;
    let encoded = pem::encode(&pem::Pem::new("CERTIFICATE", issued.der));

    match settings.output {
        Some(path) => {
            tokio::fs::write(&path, encoded).await?;
            println!("Wrote certificate with serial {} to {}", issued.serial, path);
        }
        None => print!("{}", encoded),
    }

    Ok(())
}
