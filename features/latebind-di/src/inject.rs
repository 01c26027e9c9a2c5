use std::{future::Future, sync::Arc};

use futures::future::try_join_all;

use crate::{
    container::Container,
    errors::ModuleError,
    identifier::ModuleId,
    pending::Require,
    types::{DynError, Injectable, Instance},
};

/// Resolved modules, in the order their identifiers were given
#[derive(Debug, Clone)]
pub struct Dependencies {
    ids: Vec<ModuleId>,
    instances: Vec<Instance>,
}

impl Dependencies {
    pub(crate) fn new(ids: Vec<ModuleId>, instances: Vec<Instance>) -> Self {
        debug_assert_eq!(ids.len(), instances.len());
        Dependencies { ids, instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn ids(&self) -> &[ModuleId] {
        &self.ids
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    /// The dependency at `index`, downcast to `T`
    pub fn get<T: Injectable>(&self, index: usize) -> Result<Arc<T>, ModuleError> {
        match (self.ids.get(index), self.instances.get(index)) {
            (Some(id), Some(instance)) => instance.downcast_module(id),
            _ => Err(ModuleError::DependencyIndex {
                index,
                len: self.len(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &Instance)> {
        self.ids.iter().zip(self.instances.iter())
    }

    pub fn into_instances(self) -> Vec<Instance> {
        self.instances
    }
}

impl Container {
    /// Requires all `ids` at once
    ///
    /// Resolves once every module is available, keeping the order of `ids`.
    /// Fails as soon as any of the requires fails.
    pub fn require_many<I>(
        &self,
        ids: I,
    ) -> impl Future<Output = Result<Dependencies, ModuleError>> + Send + 'static
    where
        I: IntoIterator,
        I::Item: Into<ModuleId>,
    {
        // Requires are issued now, not on first poll, and only if every id is valid
        let ids: Vec<ModuleId> = ids.into_iter().map(Into::into).collect();
        let requires = ids.iter().try_for_each(ModuleId::validate).map(|()| {
            ids.iter()
                .map(|id| self.require_single(id.clone()))
                .collect::<Vec<Require>>()
        });

        async move {
            let instances = try_join_all(requires?).await?;
            Ok(Dependencies::new(ids, instances))
        }
    }

    /// Calls `function` with the modules of `ids` once all are available
    pub fn inject<I, F, R, E>(
        &self,
        ids: I,
        function: F,
    ) -> impl Future<Output = Result<R, ModuleError>> + Send + 'static
    where
        I: IntoIterator,
        I::Item: Into<ModuleId>,
        F: FnOnce(Dependencies) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Into<DynError> + 'static,
    {
        let dependencies = self.require_many(ids);
        async move {
            let dependencies = dependencies.await?;
            function(dependencies).map_err(|error| ModuleError::Inject(Arc::new(error.into())))
        }
    }

    /// [Container::inject] for functions returning a future
    pub fn inject_async<I, F, Fut, R, E>(
        &self,
        ids: I,
        function: F,
    ) -> impl Future<Output = Result<R, ModuleError>> + Send + 'static
    where
        I: IntoIterator,
        I::Item: Into<ModuleId>,
        F: FnOnce(Dependencies) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Into<DynError> + 'static,
    {
        let dependencies = self.require_many(ids);
        async move {
            let dependencies = dependencies.await?;
            function(dependencies)
                .await
                .map_err(|error| ModuleError::Inject(Arc::new(error.into())))
        }
    }

    /// Injects `ids` into `function` and registers its result as `id`
    ///
    /// The compound module settles waiters like any other registration.
    pub fn inject_and_register<I, F, R, E>(
        &self,
        id: impl Into<ModuleId>,
        ids: I,
        function: F,
    ) -> impl Future<Output = Result<Instance, ModuleError>> + Send + 'static
    where
        I: IntoIterator,
        I::Item: Into<ModuleId>,
        F: FnOnce(Dependencies) -> Result<R, E> + Send + 'static,
        R: Injectable,
        E: Into<DynError> + 'static,
    {
        let id = id.into();
        let container = self.clone();
        let injected = id.validate().map(|()| self.inject(ids, function));
        async move {
            let value = injected?.await?;
            container.register(id, value)
        }
    }

    /// Calls `function` right away with the modules of `ids` which are ready now
    ///
    /// Never waits, fails with [ModuleError::Missing] if a module is absent or still in flight.
    pub fn try_inject<I, F, R, E>(&self, ids: I, function: F) -> Result<R, ModuleError>
    where
        I: IntoIterator,
        I::Item: Into<ModuleId>,
        F: FnOnce(Dependencies) -> Result<R, E>,
        E: Into<DynError>,
    {
        let mut resolved_ids = Vec::new();
        let mut instances = Vec::new();
        for id in ids {
            let id = id.into();
            id.validate()?;
            let instance = self
                .lookup_ready(&id)
                .ok_or_else(|| ModuleError::Missing(id.clone()))?;
            resolved_ids.push(id);
            instances.push(instance);
        }

        function(Dependencies::new(resolved_ids, instances))
            .map_err(|error| ModuleError::Inject(Arc::new(error.into())))
    }
}
