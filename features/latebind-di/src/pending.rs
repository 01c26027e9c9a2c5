use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::FutureExt;
use futures_channel::oneshot;

use crate::{
    binding::{Binding, InFlight},
    errors::ModuleError,
    identifier::ModuleId,
    types::Instance,
};

/// What a waiter eventually receives
pub(crate) type Settlement = Result<Instance, ModuleError>;

pub(crate) type SettlementSender = oneshot::Sender<Settlement>;
pub(crate) type SettlementReceiver = oneshot::Receiver<Settlement>;

/// A parked require, waiting for its module to be registered
///
/// Settling consumes the request, so it can never be settled twice.
pub(crate) struct PendingRequest {
    id: ModuleId,
    sender: SettlementSender,
}

impl PendingRequest {
    pub(crate) fn new(id: ModuleId) -> (Self, SettlementReceiver) {
        let (sender, receiver) = oneshot::channel();
        (PendingRequest { id, sender }, receiver)
    }

    pub(crate) fn id(&self) -> &ModuleId {
        &self.id
    }

    /// True once the waiting [Require] was dropped
    pub(crate) fn is_abandoned(&self) -> bool {
        self.sender.is_canceled()
    }

    pub(crate) fn settle(self, settlement: Settlement) {
        // Error only means the waiter is gone
        if self.sender.send(settlement).is_err() {
            tracing::trace!(module = %self.id, "Waiter dropped before settlement");
        }
    }
}

/// Settles all requests with a clone of the same result
///
/// Must be called without holding the container lock
pub(crate) fn settle_all(requests: Vec<PendingRequest>, settlement: &Settlement) {
    for request in requests {
        request.settle(settlement.clone());
    }
}

/// Future returned by [Container::require_single](crate::Container::require_single)
///
/// The lookup already happened when the future was created,
/// polling only waits for the outcome.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Require {
    state: RequireState,
}

enum RequireState {
    /// Outcome was known when requiring
    Done(Option<Settlement>),
    /// Bound to a registration which is still running
    InFlight(InFlight),
    /// Parked in the container ledger
    Parked {
        id: ModuleId,
        receiver: SettlementReceiver,
    },
}

impl Require {
    pub(crate) fn done(settlement: Settlement) -> Self {
        Require {
            state: RequireState::Done(Some(settlement)),
        }
    }

    pub(crate) fn bound(binding: Binding) -> Self {
        match binding {
            Binding::Ready(instance) => Self::done(Ok(instance)),
            Binding::InFlight(in_flight) => Require {
                state: RequireState::InFlight(in_flight),
            },
        }
    }

    pub(crate) fn parked(id: ModuleId, receiver: SettlementReceiver) -> Self {
        Require {
            state: RequireState::Parked { id, receiver },
        }
    }

    /// True if this require had to park a request in the container
    pub fn is_parked(&self) -> bool {
        matches!(self.state, RequireState::Parked { .. })
    }
}

impl Future for Require {
    type Output = Settlement;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            RequireState::Done(settlement) => Poll::Ready(
                settlement
                    .take()
                    .expect("Require polled after completion"),
            ),
            RequireState::InFlight(in_flight) => in_flight.poll_unpin(cx),
            RequireState::Parked { id, receiver } => match receiver.poll_unpin(cx) {
                Poll::Ready(Ok(settlement)) => Poll::Ready(settlement),
                // Sender was dropped together with the container ledger
                Poll::Ready(Err(oneshot::Canceled)) => {
                    Poll::Ready(Err(ModuleError::ContainerDropped(id.clone())))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn settled_request_delivers_to_receiver() {
        let (request, receiver) = PendingRequest::new(ModuleId::from("a"));
        assert_eq!(request.id(), &ModuleId::from("a"));

        request.settle(Ok(Instance::new(7_i32)));
        let instance = block_on(Require::parked(ModuleId::from("a"), receiver)).unwrap();
        assert_eq!(instance.downcast_ref::<i32>(), Some(&7));
    }

    #[test]
    fn settling_a_dropped_waiter_is_silent() {
        let (request, receiver) = PendingRequest::new(ModuleId::from("a"));
        drop(receiver);
        request.settle(Ok(Instance::new(1_i32)));
    }

    #[test]
    fn dropping_the_require_abandons_the_request() {
        let (request, receiver) = PendingRequest::new(ModuleId::from("a"));
        let require = Require::parked(ModuleId::from("a"), receiver);
        assert!(!request.is_abandoned());

        drop(require);
        assert!(request.is_abandoned());
    }

    #[test]
    fn dropped_request_reports_container_dropped() {
        let (request, receiver) = PendingRequest::new(ModuleId::from("a"));
        let require = Require::parked(ModuleId::from("a"), receiver);
        assert!(require.is_parked());
        drop(request);

        let err = block_on(require).unwrap_err();
        assert!(matches!(err, ModuleError::ContainerDropped(id) if id == ModuleId::from("a")));
    }

    #[test]
    fn settle_all_broadcasts_the_same_instance() {
        let value = Instance::new("shared".to_string());
        let (requests, receivers): (Vec<_>, Vec<_>) = (0..3)
            .map(|_| PendingRequest::new(ModuleId::from("x")))
            .unzip();

        settle_all(requests, &Ok(value.clone()));

        for receiver in receivers {
            let instance = block_on(Require::parked(ModuleId::from("x"), receiver)).unwrap();
            assert!(instance.ptr_eq(&value));
        }
    }
}
