//! Age checks requested over HTTP.

use super::DeviceService;
use crate::device::{Command, Response};
use crate::error::DeviceError;
use crate::validation::{MinimumAge, Pin};
use tracing::{info, warn};

/// Every way a `CHK_AGE` request can end. Callers map each to its own
/// outward result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Denied,
    /// No connection to the device could be established.
    Unreachable(String),
    /// The device stayed silent for the whole exchange window.
    Timeout,
    /// The device answered with an unexpected line, kept verbatim.
    Anomaly(String),
    /// The link failed mid-exchange and was closed.
    LinkLost(String),
}

impl VerificationOutcome {
    /// Status word for the two answers a caller can act on.
    pub fn status(&self) -> Option<&'static str> {
        match self {
            Self::Verified => Some("VERIFIED"),
            Self::Denied => Some("DENIED"),
            _ => None,
        }
    }
}

/// Turns a validated `(min_age, pin)` pair into a device answer.
#[derive(Debug, Clone)]
pub struct VerificationRequestHandler {
    service: DeviceService,
}

impl VerificationRequestHandler {
    pub fn new(service: DeviceService) -> Self {
        Self { service }
    }

    pub async fn verify(&self, min_age: MinimumAge, pin: &Pin) -> VerificationOutcome {
        let command = Command::check_age(min_age, pin);
        let result = self
            .service
            .exchange(&command, &self.service.timings().verification)
            .await;

        let outcome = classify(result);
        match &outcome {
            VerificationOutcome::Verified | VerificationOutcome::Denied => {
                info!(min_age = min_age.get(), status = ?outcome.status(), "age check answered")
            }
            other => warn!(min_age = min_age.get(), outcome = ?other, "age check failed"),
        }
        outcome
    }
}

/// Exact matching: only the bare literals count as answers.
fn classify(result: Result<Response, DeviceError>) -> VerificationOutcome {
    match result {
        Ok(Response::Verified) => VerificationOutcome::Verified,
        Ok(Response::Denied) => VerificationOutcome::Denied,
        Ok(Response::Empty) => VerificationOutcome::Timeout,
        Ok(other) => VerificationOutcome::Anomaly(other.text().to_string()),
        Err(e) if e.is_unreachable() => VerificationOutcome::Unreachable(e.to_string()),
        Err(e) => VerificationOutcome::LinkLost(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortError;

    #[test]
    fn test_classify_answers() {
        assert_eq!(
            classify(Ok(Response::Verified)),
            VerificationOutcome::Verified
        );
        assert_eq!(classify(Ok(Response::Denied)), VerificationOutcome::Denied);
        assert_eq!(classify(Ok(Response::Empty)), VerificationOutcome::Timeout);
    }

    #[test]
    fn test_ok_is_an_anomaly_for_age_checks() {
        assert_eq!(
            classify(Ok(Response::Ok)),
            VerificationOutcome::Anomaly("OK".into())
        );
        assert_eq!(
            classify(Ok(Response::parse("VERIFIED!"))),
            VerificationOutcome::Anomaly("VERIFIED!".into())
        );
    }

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            classify(Err(DeviceError::NoPort)),
            VerificationOutcome::Unreachable(_)
        ));
        assert!(matches!(
            classify(Err(DeviceError::LinkLost {
                port: "COM3".into(),
                source: PortError::config("unplugged"),
            })),
            VerificationOutcome::LinkLost(_)
        ));
    }

    #[test]
    fn test_status_words() {
        assert_eq!(VerificationOutcome::Verified.status(), Some("VERIFIED"));
        assert_eq!(VerificationOutcome::Denied.status(), Some("DENIED"));
        assert_eq!(VerificationOutcome::Timeout.status(), None);
    }
}
