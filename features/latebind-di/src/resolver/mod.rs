use std::{future::Future, sync::Arc};

use futures::future;

use crate::{
    container::Container,
    errors::ModuleError,
    identifier::ModuleId,
    types::Injectable,
};

pub mod lazy;

use lazy::Lazy;

/// Strategy for turning a module into a typed value
///
/// - `Arc<T>` waits for the module
/// - `Option<Arc<T>>` never waits, `None` if the module is not ready right now
/// - [Lazy<T>] returns a handle immediately, which can be awaited or checked later
pub trait Resolve: Sized + Send + 'static {
    fn resolve(
        container: Container,
        id: ModuleId,
    ) -> impl Future<Output = Result<Self, ModuleError>> + Send + 'static;
}

impl<T: Injectable> Resolve for Arc<T> {
    fn resolve(
        container: Container,
        id: ModuleId,
    ) -> impl Future<Output = Result<Self, ModuleError>> + Send + 'static {
        container.require::<T>(id)
    }
}

impl<T: Injectable> Resolve for Option<Arc<T>> {
    fn resolve(
        container: Container,
        id: ModuleId,
    ) -> impl Future<Output = Result<Self, ModuleError>> + Send + 'static {
        let resolved = container
            .lookup_ready(&id)
            .map(|instance| instance.downcast_module::<T>(&id))
            .transpose();
        future::ready(resolved)
    }
}

impl<T: Injectable> Resolve for Lazy<T> {
    fn resolve(
        container: Container,
        id: ModuleId,
    ) -> impl Future<Output = Result<Self, ModuleError>> + Send + 'static {
        future::ready(Ok(container.lazy::<T>(id)))
    }
}

impl Container {
    /// Resolves `id` using the strategy of `R`
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use latebind_di::Container;
    ///
    /// let container = Container::new();
    /// container.register("answer", 42_u32).unwrap();
    ///
    /// let answer = futures::executor::block_on(container.resolve::<Arc<u32>>("answer")).unwrap();
    /// assert_eq!(*answer, 42);
    /// ```
    pub fn resolve<R: Resolve>(
        &self,
        id: impl Into<ModuleId>,
    ) -> impl Future<Output = Result<R, ModuleError>> + Send + 'static {
        R::resolve(self.clone(), id.into())
    }

    /// Handle to a module which may not be registered yet
    ///
    /// The require is issued right away, so a registration on this container settles it.
    pub fn lazy<T: Injectable>(&self, id: impl Into<ModuleId>) -> Lazy<T> {
        let id = id.into();
        Lazy::new(id.clone(), self.require_single(id))
    }
}
