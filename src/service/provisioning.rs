//! Writing a citizen identity onto the device.

use super::DeviceService;
use crate::device::{Command, Response};
use crate::error::DeviceResult;
use crate::validation::{CitizenIdentity, MinimumAge, Pin};
use std::fmt;
use tracing::{info, warn};

/// Device acknowledgement of a stored identity.
const ACCEPTED: &str = "OK";

/// Result of the `CHK_AGE:18` check run right after provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfTest {
    Over18,
    Under18,
    /// Anything else, including silence or a lost link, with what was seen.
    Inconclusive(String),
}

impl fmt::Display for SelfTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Over18 => f.write_str("device confirms citizen is over 18 years old"),
            Self::Under18 => f.write_str("device confirms citizen is under 18 years old"),
            Self::Inconclusive(seen) => write!(f, "inconclusive ({seen})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The device acknowledged `SET_ID`.
    Provisioned { self_test: SelfTest },
    /// The device answered something other than an acknowledgement, or nothing.
    Rejected { response: Response },
}

impl ProvisionOutcome {
    pub fn is_provisioned(&self) -> bool {
        matches!(self, Self::Provisioned { .. })
    }
}

/// Sends `SET_ID` and, on success, the age self-test.
#[derive(Debug, Clone)]
pub struct ProvisioningWorkflow {
    service: DeviceService,
}

impl ProvisioningWorkflow {
    pub fn new(service: DeviceService) -> Self {
        Self { service }
    }

    /// Provision `identity`.
    ///
    /// Link failures on `SET_ID` are returned as errors. The self-test never
    /// fails the provisioning: any problem there is reported as
    /// [`SelfTest::Inconclusive`].
    pub async fn provision(&self, identity: &CitizenIdentity) -> DeviceResult<ProvisionOutcome> {
        let timings = self.service.timings();
        let response = self
            .service
            .exchange(&Command::set_id(identity), &timings.provisioning)
            .await?;

        if !response.contains(ACCEPTED) {
            warn!(response = %response, "device rejected identity");
            return Ok(ProvisionOutcome::Rejected { response });
        }
        info!("identity stored on device");

        let self_test = self.self_test(identity.pin()).await;
        info!(result = %self_test, "post-provisioning self-test");
        Ok(ProvisionOutcome::Provisioned { self_test })
    }

    async fn self_test(&self, pin: &Pin) -> SelfTest {
        let command = Command::check_age(MinimumAge::ADULT, pin);
        match self
            .service
            .exchange(&command, &self.service.timings().verification)
            .await
        {
            Ok(response) => classify_self_test(&response),
            Err(e) => SelfTest::Inconclusive(e.to_string()),
        }
    }
}

/// Substring match, checking the affirmative literal first.
fn classify_self_test(response: &Response) -> SelfTest {
    if response.contains("VERIFIED") {
        SelfTest::Over18
    } else if response.contains("DENIED") {
        SelfTest::Under18
    } else {
        SelfTest::Inconclusive(response.to_string())
    }
}
