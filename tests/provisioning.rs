//! Provisioning workflow against scripted devices.

mod common;

use common::{firmware, MockDevice};
use pretty_assertions::assert_eq;
use zkpass_bridge::device::Response;
use zkpass_bridge::service::{ProvisionOutcome, SelfTest};
use zkpass_bridge::validation::CitizenIdentity;

fn identity(dob: &str, pin: &str) -> CitizenIdentity {
    CitizenIdentity::new("Ada", "Lovelace", dob, "123456789", "F", pin).unwrap()
}

#[tokio::test]
async fn provision_then_self_test_over_18() {
    let device = MockDevice::new(|line| {
        if line.starts_with("SET_ID:") {
            Some("OK".into())
        } else if line == "CHK_AGE:18,1234" {
            Some("VERIFIED".into())
        } else {
            None
        }
    });

    let outcome = device
        .service()
        .provisioning()
        .provision(&identity("1990-12-10", "1234"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ProvisionOutcome::Provisioned {
            self_test: SelfTest::Over18
        }
    );
    assert_eq!(
        device.port.written_lines(),
        vec![
            "SET_ID:Ada,Lovelace,1990-12-10,123456789,F,1234",
            "CHK_AGE:18,1234",
        ]
    );
}

#[tokio::test]
async fn self_test_reports_minor() {
    let device = MockDevice::new(firmware());
    let outcome = device
        .service()
        .provisioning()
        .provision(&identity("2015-06-01", "5555"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ProvisionOutcome::Provisioned {
            self_test: SelfTest::Under18
        }
    );
}

#[tokio::test]
async fn silent_self_test_is_inconclusive_not_failure() {
    let device = MockDevice::new(|line| line.starts_with("SET_ID:").then(|| "OK".into()));
    let outcome = device
        .service()
        .provisioning()
        .provision(&identity("1990-12-10", "1234"))
        .await
        .unwrap();

    assert!(outcome.is_provisioned());
    assert!(matches!(
        outcome,
        ProvisionOutcome::Provisioned {
            self_test: SelfTest::Inconclusive(_)
        }
    ));
}

#[tokio::test]
async fn acknowledgement_may_be_decorated() {
    let device = MockDevice::new(|line| {
        if line.starts_with("SET_ID:") {
            Some("OK: identity stored".into())
        } else {
            Some("VERIFIED".into())
        }
    });
    let outcome = device
        .service()
        .provisioning()
        .provision(&identity("1990-12-10", "1234"))
        .await
        .unwrap();
    assert!(outcome.is_provisioned());
}

#[tokio::test]
async fn rejection_skips_self_test() {
    let device = MockDevice::replying("ERR:FLASH");
    let outcome = device
        .service()
        .provisioning()
        .provision(&identity("1990-12-10", "1234"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ProvisionOutcome::Rejected {
            response: Response::Unrecognized("ERR:FLASH".into())
        }
    );
    assert_eq!(device.port.written_lines().len(), 1);
}

#[tokio::test]
async fn silent_device_is_a_rejection() {
    let device = MockDevice::silent();
    let outcome = device
        .service()
        .provisioning()
        .provision(&identity("1990-12-10", "1234"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ProvisionOutcome::Rejected {
            response: Response::Empty
        }
    );
}

#[tokio::test]
async fn unreachable_device_is_an_error() {
    let device = MockDevice::new(firmware());
    device.connector.set_fail(true);
    let err = device
        .service()
        .provisioning()
        .provision(&identity("1990-12-10", "1234"))
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}
