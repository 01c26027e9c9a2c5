use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};

use crate::{errors::ModuleError, pending::Settlement, types::Instance};

/// What a container holds for one identifier
#[derive(Clone)]
pub enum Binding {
    /// The module value
    Ready(Instance),
    /// A registration which has not completed yet
    InFlight(InFlight),
}
impl Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Ready(instance) => f.debug_tuple("Ready").field(instance).finish(),
            Binding::InFlight(_) => f.write_str("InFlight"),
        }
    }
}

impl Binding {
    pub fn ready(&self) -> Option<&Instance> {
        match self {
            Binding::Ready(instance) => Some(instance),
            Binding::InFlight(_) => None,
        }
    }

    pub fn into_ready(self) -> Option<Instance> {
        match self {
            Binding::Ready(instance) => Some(instance),
            Binding::InFlight(_) => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Binding::InFlight(_))
    }
}

/// Shared handle to a running registration
///
/// Every clone resolves to the same outcome. Whichever clone is polled first drives
/// the registered future, including the swap of the binding and settlement of waiters.
#[derive(Clone)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct InFlight(Shared<BoxFuture<'static, Settlement>>);

impl InFlight {
    pub(crate) fn new(future: impl Future<Output = Settlement> + Send + 'static) -> Self {
        InFlight(future.boxed().shared())
    }

    /// The outcome, if the registration already completed
    pub fn peek(&self) -> Option<&Settlement> {
        self.0.peek()
    }
}

impl Future for InFlight {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.poll_unpin(cx)
    }
}

/// Future returned by [Container::register_async](crate::Container::register_async)
///
/// Resolves to the registered instance once the registered future completed.
/// The binding is only swapped and waiters are only settled while something polls
/// either this future or a require which found the in-flight binding.
#[must_use = "the registration does not progress unless it is polled"]
pub struct Registration {
    state: RegistrationState,
}

enum RegistrationState {
    Failed(Option<ModuleError>),
    InFlight(InFlight),
}

impl Registration {
    pub(crate) fn failed(error: ModuleError) -> Self {
        Registration {
            state: RegistrationState::Failed(Some(error)),
        }
    }

    pub(crate) fn in_flight(in_flight: InFlight) -> Self {
        Registration {
            state: RegistrationState::InFlight(in_flight),
        }
    }
}

impl Future for Registration {
    type Output = Settlement;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            RegistrationState::Failed(error) => Poll::Ready(Err(error
                .take()
                .expect("Registration polled after completion"))),
            RegistrationState::InFlight(in_flight) => in_flight.poll_unpin(cx),
        }
    }
}
