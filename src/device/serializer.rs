//! Mutual exclusion over the single physical device.
//!
//! Every exchange, from any number of HTTP requests or the CLI, goes
//! through one `AccessSerializer`. Holding an [`ExclusiveAccess`] guard is
//! the only way to reach the [`DeviceLink`], so two exchanges can never
//! overlap on the wire. Waiting for the guard has no timeout: callers queue
//! until the device is free, and the exchange window is the only clock.

use super::channel::CommandChannel;
use super::link::DeviceLink;
use super::protocol::{Command, Response};
use super::settings::ExchangeTiming;
use crate::error::DeviceResult;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Shared handle to the device link. Clones refer to the same link.
#[derive(Debug, Clone)]
pub struct AccessSerializer {
    link: Arc<Mutex<DeviceLink>>,
}

/// Exclusive access to the link, released on drop.
#[derive(Debug)]
pub struct ExclusiveAccess<'a> {
    guard: MutexGuard<'a, DeviceLink>,
}

impl AccessSerializer {
    /// Take ownership of the process's only device link.
    pub fn new(link: DeviceLink) -> Self {
        Self {
            link: Arc::new(Mutex::new(link)),
        }
    }

    /// Wait until no other caller holds the link.
    pub async fn acquire(&self) -> ExclusiveAccess<'_> {
        let waited = Instant::now();
        let guard = self.link.lock().await;
        trace!(
            waited_ms = waited.elapsed().as_millis() as u64,
            "device access acquired"
        );
        ExclusiveAccess { guard }
    }

    /// Acquire the link, open it if needed, and run one exchange.
    pub async fn exchange(
        &self,
        command: &Command,
        timing: &ExchangeTiming,
    ) -> DeviceResult<Response> {
        let mut access = self.acquire().await;
        access.ensure_open().await?;
        CommandChannel::new(&mut access).exchange(command, timing).await
    }

    /// Close the link once current work has finished.
    pub async fn close(&self) {
        self.acquire().await.close();
    }
}

impl Deref for ExclusiveAccess<'_> {
    type Target = DeviceLink;

    fn deref(&self) -> &DeviceLink {
        &self.guard
    }
}

impl DerefMut for ExclusiveAccess<'_> {
    fn deref_mut(&mut self) -> &mut DeviceLink {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{LinkSettings, PortSource};
    use crate::port::{MockConnector, MockSerialPort};
    use std::time::Duration;

    fn serializer(connector: &MockConnector) -> AccessSerializer {
        AccessSerializer::new(DeviceLink::new(
            PortSource::Fixed("MOCK0".into()),
            Arc::new(connector.clone()),
            LinkSettings {
                read_timeout: Duration::from_millis(50),
                settle_delay: Duration::ZERO,
            },
        ))
    }

    #[tokio::test]
    async fn test_second_acquire_waits_for_release() {
        let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
        let serializer = serializer(&connector);

        let first = serializer.acquire().await;
        let contender = serializer.clone();
        let waiter = tokio::spawn(async move {
            let started = Instant::now();
            let _access = contender.acquire().await;
            started.elapsed()
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        drop(first);
        let waited = waiter.await.unwrap();
        assert!(waited >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_exchange_opens_lazily() {
        let port = MockSerialPort::new("MOCK0").with_responder(|_| Some("OK".into()));
        let connector = MockConnector::new(port);
        let serializer = serializer(&connector);
        assert_eq!(connector.attempts(), 0);

        let timing = ExchangeTiming {
            response_wait: Duration::from_millis(1),
            poll_window: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
        };
        let command = Command::new(crate::device::Verb::CheckAge, ["18", "1234"]).unwrap();
        let response = serializer.exchange(&command, &timing).await.unwrap();
        assert_eq!(response, Response::Ok);
        assert_eq!(connector.attempts(), 1);

        serializer.close().await;
        serializer.close().await;
        assert!(!serializer.acquire().await.is_open());
    }
}
