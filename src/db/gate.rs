//! Bounded admission in front of the single connection.

use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::timeout;

use crate::config::{ADMIT_TIMEOUT, MAX_WAITING_OPS};
use crate::error::{Error, Result};

/// Counting gate in front of the connection. Holding a permit means the
/// operation is admitted and may wait on the connection lock; admission
/// itself is bounded by a deadline, the lock wait is not.
pub(crate) struct OperationGate {
    slots: Semaphore,
    admit_timeout: Duration,
}

impl OperationGate {
    pub(crate) fn new() -> Self {
        Self::with_limits(MAX_WAITING_OPS, ADMIT_TIMEOUT)
    }

    pub(crate) fn with_limits(slots: usize, admit_timeout: Duration) -> Self {
        OperationGate {
            slots: Semaphore::new(slots),
            admit_timeout,
        }
    }

    /// Waits for an operation slot. When the deadline expires the operation
    /// is rejected without ever touching the connection.
    pub(crate) async fn admit(&self) -> Result<SemaphorePermit<'_>> {
        match timeout(self.admit_timeout, self.slots.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => Err(Error::GateTimeout(self.admit_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_released_slot_admits_next_waiter() {
        let gate = OperationGate::with_limits(2, Duration::from_millis(200));
        let first = gate.admit().await.unwrap();
        let _second = gate.admit().await.unwrap();
        drop(first);
        let _third = gate.admit().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_times_out_when_slots_stay_busy() {
        // The deadline bounds admission only; a slot once held is never
        // revoked, so the second caller is the one that times out.
        let gate = OperationGate::with_limits(1, Duration::from_secs(10));
        let _held = gate.admit().await.unwrap();
        match gate.admit().await {
            Err(Error::GateTimeout(waited)) => assert_eq!(waited, Duration::from_secs(10)),
            other => panic!("expected gate timeout, got {other:?}"),
        }
    }
}
