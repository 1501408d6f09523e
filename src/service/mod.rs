//! Service layer between the callers and the device.
//!
//! The CLI and the HTTP handlers never touch the link directly; they hold a
//! [`DeviceService`] and go through the workflow that matches their task.
//!
//! # Architecture
//!
//! ```text
//! provisioning CLI ──> ProvisioningWorkflow ────────┐
//!                                                   ├──> DeviceService ──> AccessSerializer
//! POST /verify-age ──> VerificationRequestHandler ──┘
//! ```

mod provisioning;
mod verification;

pub use provisioning::{ProvisionOutcome, ProvisioningWorkflow, SelfTest};
pub use verification::{VerificationOutcome, VerificationRequestHandler};

use crate::device::{
    AccessSerializer, Command, DeviceLink, ExchangeTiming, ExchangeTimings, Response,
};
use crate::error::DeviceResult;
use serde::Serialize;

/// Shared entry point to the device: one serializer plus per-call-site timings.
#[derive(Debug, Clone)]
pub struct DeviceService {
    serializer: AccessSerializer,
    timings: ExchangeTimings,
}

/// Snapshot of the link, as reported by `/device/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl DeviceService {
    pub fn new(link: DeviceLink, timings: ExchangeTimings) -> Self {
        Self {
            serializer: AccessSerializer::new(link),
            timings,
        }
    }

    pub fn timings(&self) -> &ExchangeTimings {
        &self.timings
    }

    pub fn serializer(&self) -> &AccessSerializer {
        &self.serializer
    }

    /// One serialized exchange, opening the link first if needed.
    pub async fn exchange(
        &self,
        command: &Command,
        timing: &ExchangeTiming,
    ) -> DeviceResult<Response> {
        self.serializer.exchange(command, timing).await
    }

    /// Open the link now instead of on first use.
    pub async fn connect(&self) -> DeviceResult<String> {
        let mut access = self.serializer.acquire().await;
        access.ensure_open().await?;
        Ok(access.port_name().unwrap_or_default().to_string())
    }

    /// Current link state. Waits behind any exchange in progress.
    pub async fn status(&self) -> LinkStatus {
        let access = self.serializer.acquire().await;
        LinkStatus {
            connected: access.is_open(),
            port: access.port_name().map(str::to_string),
        }
    }

    pub async fn close(&self) {
        self.serializer.close().await;
    }

    pub fn provisioning(&self) -> ProvisioningWorkflow {
        ProvisioningWorkflow::new(self.clone())
    }

    pub fn verification(&self) -> VerificationRequestHandler {
        VerificationRequestHandler::new(self.clone())
    }
}
