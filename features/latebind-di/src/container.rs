use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use crate::{
    binding::{Binding, InFlight, Registration},
    builder::{ContainerBuilder, ContainerOptions, FallbackResolver, OverridePolicy},
    errors::ModuleError,
    identifier::ModuleId,
    pending::{settle_all, PendingRequest, Require, Settlement},
    types::{DynError, Injectable, Instance},
};

/// Registry scope binding [ModuleId]s to instances
///
/// Modules can be required before they are registered, the returned future settles once
/// a matching registration happens on this container. Cloning yields another handle to the
/// same container.
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);

struct ContainerInner {
    state: Mutex<ContainerState>,
    parent: Option<Container>,
    options: ContainerOptions,
    fallback: Option<FallbackResolver>,
}

#[derive(Default)]
struct ContainerState {
    bindings: HashMap<ModuleId, Slot>,
    /// Parked requires, in the order they were made
    ledger: Vec<PendingRequest>,
    next_generation: u64,
}

struct Slot {
    binding: Binding,
    /// Distinguishes bindings so a finishing registration only replaces its own
    generation: u64,
}

impl ContainerState {
    fn bind(&mut self, id: ModuleId, binding: Binding) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.bindings.insert(id, Slot { binding, generation });
        generation
    }

    fn is_current(&self, id: &ModuleId, generation: u64) -> bool {
        self.bindings
            .get(id)
            .is_some_and(|slot| slot.generation == generation)
    }

    /// Drops requests whose waiter is gone
    fn prune_abandoned(&mut self) {
        let before = self.ledger.len();
        self.ledger.retain(|request| !request.is_abandoned());
        let pruned = before - self.ledger.len();
        if pruned > 0 {
            tracing::trace!(pruned, "Pruned abandoned requires");
        }
    }

    /// Removes all requests for `id` from the ledger, keeping the order of the rest
    fn take_waiters(&mut self, id: &ModuleId) -> Vec<PendingRequest> {
        let (waiters, rest) = std::mem::take(&mut self.ledger)
            .into_iter()
            .partition(|request| request.id() == id);
        self.ledger = rest;
        waiters
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        let mut map = f.debug_struct("Container");
        for (id, slot) in &state.bindings {
            let val = match slot.binding {
                Binding::Ready(_) => "ready",
                Binding::InFlight(_) => "in-flight",
            };
            map.field(&id.to_string(), &val);
        }
        let pending = state
            .ledger
            .iter()
            .filter(|request| !request.is_abandoned())
            .count();
        map.field("pending", &pending);
        map.finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::from_builder(ContainerBuilder::new())
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_builder(builder: ContainerBuilder) -> Self {
        let ContainerBuilder {
            parent,
            options,
            fallback,
        } = builder;

        Container(Arc::new(ContainerInner {
            state: Mutex::new(ContainerState::default()),
            parent,
            options,
            fallback,
        }))
    }

    /// Creates a container falling back to this one, with the same options
    pub fn child(&self) -> Container {
        ContainerBuilder::new()
            .parent(self)
            .options(self.0.options.clone())
            .build()
    }

    pub fn parent(&self) -> Option<&Container> {
        self.0.parent.as_ref()
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.0.options
    }

    /// Every critical section leaves the state consistent, so a poisoned lock is safe to reuse
    fn state(&self) -> MutexGuard<'_, ContainerState> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Registration
impl Container {
    /// Registers a value using the container's default override policy
    ///
    /// All requests waiting for `id` on this container are settled with the value.
    pub fn register<T: Injectable>(
        &self,
        id: impl Into<ModuleId>,
        value: T,
    ) -> Result<Instance, ModuleError> {
        self.register_instance(id, Instance::new(value))
    }

    pub fn register_with<T: Injectable>(
        &self,
        id: impl Into<ModuleId>,
        value: T,
        policy: OverridePolicy,
    ) -> Result<Instance, ModuleError> {
        self.register_instance_with(id, Instance::new(value), policy)
    }

    pub fn register_instance(
        &self,
        id: impl Into<ModuleId>,
        instance: Instance,
    ) -> Result<Instance, ModuleError> {
        self.register_instance_with(id, instance, self.0.options.override_policy)
    }

    pub fn register_instance_with(
        &self,
        id: impl Into<ModuleId>,
        instance: Instance,
        policy: OverridePolicy,
    ) -> Result<Instance, ModuleError> {
        let id = id.into();
        id.validate()?;

        let waiters = {
            let mut state = self.state();
            if policy == OverridePolicy::Reject && state.bindings.contains_key(&id) {
                return Err(ModuleError::Duplicate(id));
            }

            state.bind(id.clone(), Binding::Ready(instance.clone()));
            state.take_waiters(&id)
        };

        tracing::debug!(
            module = %id,
            type_name = instance.type_name(),
            waiters = waiters.len(),
            "Registered module"
        );
        settle_all(waiters, &Ok(instance.clone()));

        Ok(instance)
    }

    /// Registers the value's type as identifier - see [ModuleId::of]
    pub fn provide<T: Injectable>(&self, value: T) -> Result<Instance, ModuleError> {
        self.register(ModuleId::of::<T>(), value)
    }

    /// Registers a value which is still being produced
    ///
    /// The in-flight binding is visible to [Container::get] immediately.
    /// Once `future` succeeds, the binding is swapped to the value (unless it was replaced meanwhile)
    /// and all waiters for `id` are settled with it. If `future` fails the binding is removed
    /// (unless it was replaced meanwhile) and all waiters for `id` receive [ModuleError::Rejected].
    pub fn register_async<T, E, F>(&self, id: impl Into<ModuleId>, future: F) -> Registration
    where
        T: Injectable,
        E: Into<DynError> + Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.register_async_with(id, future, self.0.options.override_policy)
    }

    pub fn register_async_with<T, E, F>(
        &self,
        id: impl Into<ModuleId>,
        future: F,
        policy: OverridePolicy,
    ) -> Registration
    where
        T: Injectable,
        E: Into<DynError> + Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let id = id.into();
        if let Err(error) = id.validate() {
            return Registration::failed(error);
        }

        let mut state = self.state();
        if policy == OverridePolicy::Reject && state.bindings.contains_key(&id) {
            return Registration::failed(ModuleError::Duplicate(id));
        }

        // Lock is held until binding, so the next generation is the one this binding gets
        let generation = state.next_generation;
        let container = Arc::downgrade(&self.0);
        let settle_id = id.clone();
        let in_flight = InFlight::new(async move {
            let settlement = future
                .await
                .map(Instance::new)
                .map_err(|error| ModuleError::rejected(&settle_id, error));

            // Container gone - nobody is left to settle
            if let Some(inner) = Weak::upgrade(&container) {
                Container(inner).complete_in_flight(&settle_id, generation, &settlement);
            }
            settlement
        });

        let bound = state.bind(id.clone(), Binding::InFlight(in_flight.clone()));
        debug_assert_eq!(bound, generation);
        drop(state);

        tracing::debug!(module = %id, "Registration in flight");
        Registration::in_flight(in_flight)
    }

    fn complete_in_flight(&self, id: &ModuleId, generation: u64, settlement: &Settlement) {
        let waiters = {
            let mut state = self.state();
            if state.is_current(id, generation) {
                match settlement {
                    Ok(instance) => {
                        if let Some(slot) = state.bindings.get_mut(id) {
                            slot.binding = Binding::Ready(instance.clone());
                        }
                    }
                    Err(_) => {
                        state.bindings.remove(id);
                    }
                }
            }
            state.take_waiters(id)
        };

        tracing::debug!(
            module = %id,
            ok = settlement.is_ok(),
            waiters = waiters.len(),
            "Registration completed"
        );
        settle_all(waiters, settlement);
    }

    /// Removes the local binding
    ///
    /// Requests waiting for `id` stay parked until it is registered again.
    pub fn unregister(&self, id: impl Into<ModuleId>) -> Option<Binding> {
        let id = id.into();
        let removed = self.state().bindings.remove(&id).map(|slot| slot.binding);
        tracing::debug!(module = %id, removed = removed.is_some(), "Unregistered module");
        removed
    }
}

// Lookup
impl Container {
    /// Local binding of `id`, never consults parents and never waits
    pub fn get(&self, id: impl Into<ModuleId>) -> Option<Binding> {
        let id = id.into();
        self.state()
            .bindings
            .get(&id)
            .map(|slot| slot.binding.clone())
    }

    pub fn contains(&self, id: impl Into<ModuleId>) -> bool {
        let id = id.into();
        self.state().bindings.contains_key(&id)
    }

    /// True if any require on this container is still waiting
    ///
    /// Requires which were dropped, for example by a timeout, do not count.
    pub fn has_pending_require_requests(&self) -> bool {
        let mut state = self.state();
        state.prune_abandoned();
        !state.ledger.is_empty()
    }

    /// Binding of `id` in this container or the closest ancestor having one
    ///
    /// Each container is read once under its own lock.
    pub(crate) fn lookup(&self, id: &ModuleId) -> Option<Binding> {
        let mut current = Some(self);
        while let Some(container) = current {
            if let Some(slot) = container.state().bindings.get(id) {
                return Some(slot.binding.clone());
            }
            current = container.parent();
        }
        None
    }

    /// Lookup across the container chain and the fallback resolver, ready values only
    pub(crate) fn lookup_ready(&self, id: &ModuleId) -> Option<Instance> {
        match self.lookup(id) {
            Some(binding) => binding.into_ready(),
            None => self.resolve_fallback(id),
        }
    }

    fn resolve_fallback(&self, id: &ModuleId) -> Option<Instance> {
        let resolved = self.0.fallback.as_ref().and_then(|fallback| fallback(id));
        if resolved.is_some() {
            tracing::trace!(module = %id, "Resolved module through fallback");
        }
        resolved
    }

    /// Requires a module, waiting until it is registered if necessary
    ///
    /// The lookup happens right away: local bindings first, then the parent chain, then the
    /// fallback resolver. If nothing is found a request is parked on this container and only
    /// a registration on this container settles it - later registrations on a parent do not.
    /// There is no timeout, a module which is never registered is waited for forever.
    /// Dropping the returned future withdraws the request.
    pub fn require_single(&self, id: impl Into<ModuleId>) -> Require {
        let id = id.into();
        if let Err(error) = id.validate() {
            return Require::done(Err(error));
        }

        if let Some(binding) = self.lookup(&id) {
            tracing::trace!(module = %id, "Required module is bound");
            return Require::bound(binding);
        }

        if let Some(instance) = self.resolve_fallback(&id) {
            return Require::done(Ok(instance));
        }

        let mut state = self.state();
        // A registration may have landed while no lock was held
        if let Some(slot) = state.bindings.get(&id) {
            return Require::bound(slot.binding.clone());
        }

        state.prune_abandoned();
        let (request, receiver) = PendingRequest::new(id.clone());
        state.ledger.push(request);
        let pending = state.ledger.len();
        drop(state);

        tracing::debug!(module = %id, pending, "Parked require until module is registered");
        Require::parked(id, receiver)
    }

    /// Typed [Container::require_single]
    pub fn require<T: Injectable>(
        &self,
        id: impl Into<ModuleId>,
    ) -> impl Future<Output = Result<Arc<T>, ModuleError>> + Send + 'static {
        let id = id.into();
        let require = self.require_single(id.clone());
        async move { require.await?.downcast_module::<T>(&id) }
    }

    /// Requires the module registered under the type of `T` - see [Container::provide]
    pub fn require_type<T: Injectable>(
        &self,
    ) -> impl Future<Output = Result<Arc<T>, ModuleError>> + Send + 'static {
        self.require::<T>(ModuleId::of::<T>())
    }
}
