//! Single-slot hand-off points between stages
//!
//! A hand-off point carries exactly one parcel from one producer to one
//! consumer over its lifetime. It is a thin wrapper over a tokio oneshot
//! channel: the sender is consumed by `send`, so a second value cannot be
//! written, and a sender dropped without sending closes the point.

use super::core::{StageFailure, StageResult};
use crate::error::{SchedulerError, SchedulerResult};
use tokio::sync::oneshot;

/// What travels through a hand-off point: the value (or the failure that
/// replaced it) and the results of every stage it has passed through
#[derive(Debug)]
pub struct Parcel<T> {
    value: Result<T, StageFailure>,
    trail: Vec<StageResult>,
}

impl<T> Parcel<T> {
    /// Parcel for the head of a pipeline
    pub fn seed(value: T) -> Self {
        Self {
            value: Ok(value),
            trail: Vec::new(),
        }
    }

    pub fn new(value: Result<T, StageFailure>, trail: Vec<StageResult>) -> Self {
        Self { value, trail }
    }

    pub fn value(&self) -> Result<&T, &StageFailure> {
        self.value.as_ref()
    }

    pub fn trail(&self) -> &[StageResult] {
        &self.trail
    }

    pub fn into_parts(self) -> (Result<T, StageFailure>, Vec<StageResult>) {
        (self.value, self.trail)
    }
}

/// Producer end; consumed by the single `send`
#[derive(Debug)]
pub struct HandoffSender<T> {
    inner: oneshot::Sender<Parcel<T>>,
}

impl<T> HandoffSender<T> {
    /// Populate the hand-off point
    ///
    /// Gives the parcel back if the consumer end is already gone.
    pub fn send(self, parcel: Parcel<T>) -> Result<(), Parcel<T>> {
        self.inner.send(parcel)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer end of a hand-off point
#[derive(Debug)]
pub struct HandoffPoint<T> {
    inner: oneshot::Receiver<Parcel<T>>,
}

impl<T> HandoffPoint<T> {
    /// Wait for the parcel
    ///
    /// Fails with `HandoffClosed` if the producer went away without sending.
    pub async fn recv(self) -> SchedulerResult<Parcel<T>> {
        self.inner.await.map_err(|_| SchedulerError::HandoffClosed)
    }
}

/// Create a connected sender and hand-off point
pub fn handoff<T>() -> (HandoffSender<T>, HandoffPoint<T>) {
    let (tx, rx) = oneshot::channel();
    (HandoffSender { inner: tx }, HandoffPoint { inner: rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_carries_one_parcel() {
        let (tx, point) = handoff::<u32>();
        tx.send(Parcel::seed(5)).unwrap();

        let parcel = point.recv().await.unwrap();
        assert_eq!(parcel.value(), Ok(&5));
        assert!(parcel.trail().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_sender_closes_point() {
        let (tx, point) = handoff::<u32>();
        drop(tx);

        let err = point.recv().await.unwrap_err();
        assert!(matches!(err, SchedulerError::HandoffClosed));
    }

    #[test]
    fn test_send_to_dropped_point_returns_parcel() {
        let (tx, point) = handoff::<String>();
        drop(point);

        let parcel = tx.send(Parcel::seed("kept".to_string())).unwrap_err();
        let (value, _) = parcel.into_parts();
        assert_eq!(value.unwrap(), "kept");
    }
}
