use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, OnceLock, PoisonError},
    task::{Context, Poll},
};

use futures::FutureExt;

use crate::{
    errors::ModuleError,
    identifier::ModuleId,
    pending::{Require, Settlement},
    types::Injectable,
};

/// Lazily resolved module
///
/// Stands in for a module which might not be registered yet. Its require is parked when the
/// handle is created, so it is settled by the next matching registration.
///
/// ```rust
/// use latebind_di::Container;
///
/// let container = Container::new();
/// let service = container.lazy::<String>("service");
/// assert!(service.try_get().is_none());
///
/// container.register("service", "ready".to_string()).unwrap();
/// assert_eq!(service.get().as_str(), "ready");
/// ```
pub struct Lazy<T: Injectable>(Arc<LazyInner<T>>);
impl<T: Injectable> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Lazy(self.0.clone())
    }
}
impl<T: Injectable + Debug> Debug for Lazy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Lazy")
            .field(&self.0.id)
            .field(&self.try_get())
            .finish()
    }
}

struct LazyInner<T: Injectable> {
    id: ModuleId,
    once: OnceLock<Result<Arc<T>, ModuleError>>,
    require: Mutex<Require>,
}

impl<T: Injectable> LazyInner<T> {
    /// Must only be called while holding the require lock
    fn settle(&self, settlement: Settlement) -> &Result<Arc<T>, ModuleError> {
        let result = settlement.and_then(|instance| instance.downcast_module::<T>(&self.id));
        self.once.get_or_init(|| result)
    }
}

impl<T: Injectable> Lazy<T> {
    pub(crate) fn new(id: ModuleId, require: Require) -> Self {
        Lazy(Arc::new(LazyInner {
            id,
            once: OnceLock::new(),
            require: Mutex::new(require),
        }))
    }

    pub fn id(&self) -> &ModuleId {
        &self.0.id
    }

    /// Accesses the module
    ///
    /// # Panics
    /// - When accessed before the module was registered
    /// - When the module failed to resolve
    pub fn get(&self) -> &Arc<T> {
        self.try_get()
            .expect("Lazy module accessed before it was registered")
            .expect("Lazy module failed to resolve")
    }

    /// Try to access the module without waiting
    ///
    /// `None` while the module is not registered yet
    pub fn try_get(&self) -> Option<Result<&Arc<T>, &ModuleError>> {
        if let Some(result) = self.0.once.get() {
            return Some(result.as_ref());
        }

        // Lock require, so the result is not taken out while we check
        let mut require = self.0.require.lock().unwrap_or_else(PoisonError::into_inner);

        // Double check once - it might have been set while we waited for the lock
        if let Some(result) = self.0.once.get() {
            return Some(result.as_ref());
        }

        let settlement = (&mut *require).now_or_never()?;
        Some(self.0.settle(settlement).as_ref())
    }

    /// Resolves as soon as the module is available
    pub fn wait(&self) -> LazyFuture<'_, T> {
        LazyFuture { lazy: &self.0 }
    }
}

/// Future returned by [Lazy::wait]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct LazyFuture<'a, T: Injectable> {
    lazy: &'a LazyInner<T>,
}
impl<'a, T: Injectable> Future for LazyFuture<'a, T> {
    type Output = Result<&'a Arc<T>, &'a ModuleError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let lazy = self.lazy;
        let mut require = lazy.require.lock().unwrap_or_else(PoisonError::into_inner);

        // Check if result is ready
        if let Some(result) = lazy.once.get() {
            return Poll::Ready(result.as_ref());
        }

        match require.poll_unpin(cx) {
            Poll::Ready(settlement) => Poll::Ready(lazy.settle(settlement).as_ref()),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::Container;

    #[test]
    fn resolves_after_registration() {
        let container = Container::new();
        let lazy = container.lazy::<u64>("clock");
        assert!(lazy.try_get().is_none());
        assert!(container.has_pending_require_requests());

        container.register("clock", 1_000_u64).unwrap();
        assert!(!container.has_pending_require_requests());
        assert_eq!(**lazy.get(), 1_000);
        assert_eq!(lazy.id(), &ModuleId::from("clock"));
    }

    #[test]
    fn clones_share_the_result() {
        let container = Container::new();
        let lazy = container.lazy::<u64>("clock");
        let clone = lazy.clone();

        container.register("clock", 5_u64).unwrap();
        let waited = block_on(lazy.wait()).unwrap();
        assert!(Arc::ptr_eq(waited, clone.get()));
    }

    #[test]
    fn wrong_type_is_an_error_not_a_value() {
        let container = Container::new();
        container.register("clock", "not a number").unwrap();

        let lazy = container.lazy::<u64>("clock");
        assert!(matches!(
            lazy.try_get(),
            Some(Err(ModuleError::DowncastFailed { .. }))
        ));
    }

    #[test]
    #[should_panic(expected = "Lazy module accessed before it was registered")]
    fn get_before_registration_panics() {
        let container = Container::new();
        let lazy = container.lazy::<u64>("never");
        lazy.get();
    }
}
