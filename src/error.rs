#[cfg(feature = "rest-api")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
#[cfg(feature = "rest-api")]
use serde_json::json;

use crate::port::PortError;
use thiserror::Error;

/// Failures of the device communication layer.
///
/// None of these are fatal to the process. Empty and unrecognized replies
/// are not errors at this level: they are [`crate::device::Response`]
/// classifications, interpreted by the workflows.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No port identifier was supplied and auto-detection found nothing.
    #[error("No serial port found for the device")]
    NoPort,

    /// The port could not be opened.
    #[error("Could not open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: PortError,
    },

    /// An exchange was attempted on a closed link.
    #[error("Device link is not open")]
    NotConnected,

    /// The link failed mid-exchange. It has been closed and will be
    /// reopened on next use.
    #[error("Serial communication failed on {port}: {source}")]
    LinkLost {
        port: String,
        #[source]
        source: PortError,
    },
}

impl DeviceError {
    /// True when no connection to the device could be established.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::NoPort | Self::Connection { .. } | Self::NotConnected
        )
    }
}

/// A specialized `Result` type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Error returned by the HTTP boundary.
///
/// Each variant maps to its own status code so callers can tell a busy or
/// unplugged device from bad input.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Device not connected")]
    DeviceUnreachable,
    #[error("No response from device (timeout)")]
    Timeout,
    #[error("Invalid response from device")]
    Anomaly(String),
    #[error("Serial communication failed")]
    LinkLost,
    #[error("An internal server error occurred")]
    Internal,
}

/// Allows Axum to convert `ApiError` into an HTTP response.
#[cfg(feature = "rest-api")]
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::DeviceUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Anomaly(_) | Self::LinkLost | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match &self {
            Self::Anomaly(details) => json!({ "error": self.to_string(), "details": details }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<crate::validation::ValidationError> for ApiError {
    fn from(err: crate::validation::ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_classification() {
        assert!(DeviceError::NoPort.is_unreachable());
        assert!(DeviceError::NotConnected.is_unreachable());
        assert!(DeviceError::Connection {
            port: "COM3".into(),
            source: PortError::not_found("COM3"),
        }
        .is_unreachable());
        assert!(!DeviceError::LinkLost {
            port: "COM3".into(),
            source: PortError::config("gone"),
        }
        .is_unreachable());
    }

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::Connection {
            port: "/dev/ttyUSB0".into(),
            source: PortError::not_found("/dev/ttyUSB0"),
        };
        assert_eq!(
            err.to_string(),
            "Could not open serial port /dev/ttyUSB0: Serial port not found: /dev/ttyUSB0"
        );
    }

    #[cfg(feature = "rest-api")]
    #[test]
    fn test_api_error_status_codes() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::DeviceUnreachable, StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (ApiError::Anomaly("?".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::LinkLost, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
