use std::{fmt::Debug, sync::Arc};

use crate::{container::Container, identifier::ModuleId, types::Instance};

/// Callback consulted when a required module is bound nowhere in the container chain
///
/// The callback is synchronous and is called while the require is being made, without any
/// container lock held. A module which has to be produced asynchronously is better registered
/// through [Container::register_async], which also settles the requires waiting for it.
pub type FallbackResolver = Arc<dyn Fn(&ModuleId) -> Option<Instance> + Send + Sync>;

/// What happens when registering an identifier which is already bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// The new value replaces the old binding
    #[default]
    Replace,
    /// Registration fails with [ModuleError::Duplicate](crate::ModuleError::Duplicate)
    Reject,
}

/// Options a container is created with
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Policy used by registrations which do not pass one explicitly
    pub override_policy: OverridePolicy,
}
impl ContainerOptions {
    /// Options rejecting duplicate registrations by default
    pub fn no_override() -> Self {
        ContainerOptions {
            override_policy: OverridePolicy::Reject,
        }
    }
}

/// Builder for a [Container]
///
/// ```rust
/// use latebind_di::{Container, ContainerBuilder};
///
/// let root = Container::new();
/// let scoped = ContainerBuilder::new()
///     .parent(&root)
///     .no_override(true)
///     .build();
/// assert!(scoped.parent().is_some());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    pub(crate) parent: Option<Container>,
    pub(crate) options: ContainerOptions,
    pub(crate) fallback: Option<FallbackResolver>,
}
impl Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("has_parent", &self.parent.is_some())
            .field("options", &self.options)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        ContainerBuilder {
            parent: None,
            options: ContainerOptions::default(),
            fallback: None,
        }
    }
}
impl ContainerBuilder {
    /// Modules missing locally will be looked up in the parent chain
    pub fn parent(mut self, parent: &Container) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn no_override(mut self, no_override: bool) -> Self {
        self.options.override_policy = match no_override {
            true => OverridePolicy::Reject,
            false => OverridePolicy::Replace,
        };
        self
    }

    /// Resolver consulted after the local map and the parent chain
    ///
    /// Resolved values are handed to the requester, they are not registered.
    /// The resolver is called without any container lock held.
    pub fn fallback<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ModuleId) -> Option<Instance> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(resolver));
        self
    }

    pub fn build(self) -> Container {
        Container::from_builder(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_override() {
        let builder = ContainerBuilder::new();
        assert_eq!(builder.options.override_policy, OverridePolicy::Replace);
        assert!(builder.parent.is_none());
        assert!(builder.fallback.is_none());
    }

    #[test]
    fn no_override_toggles_policy() {
        let builder = ContainerBuilder::new().no_override(true);
        assert_eq!(builder.options.override_policy, OverridePolicy::Reject);

        let builder = builder.no_override(false);
        assert_eq!(builder.options.override_policy, OverridePolicy::Replace);

        let builder = builder.options(ContainerOptions::no_override());
        assert_eq!(builder.options.override_policy, OverridePolicy::Reject);
    }
}
