use std::sync::Arc;

use thiserror::Error;

use crate::{identifier::ModuleId, types::DynError};

/// Errors surfaced by a [Container](crate::Container)
///
/// Errors are Clone, as a single failure may have to be delivered to many waiters.
#[derive(Error, Debug, Clone)]
pub enum ModuleError {
    /// The identifier was an empty name
    #[error("Module identifier must not be empty")]
    NullIdentifier,
    /// The module is already bound and overriding was rejected
    #[error("Module '{0}' is already registered")]
    Duplicate(ModuleId),
    /// The future passed to an async registration failed
    #[error("Registration of module '{id}' failed - error: {error}")]
    Rejected { id: ModuleId, error: Arc<DynError> },

    #[error("Failed to downcast module '{id}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        id: ModuleId,
        required_type: &'static str,
        actual_type: &'static str,
    },
    /// The module is not available right now - only returned by non waiting lookups
    #[error("Module '{0}' is not available")]
    Missing(ModuleId),
    /// Positional access past the resolved dependencies
    #[error("Dependency index {index} is out of range, {len} dependencies were resolved")]
    DependencyIndex { index: usize, len: usize },
    /// The injected function failed
    #[error("Injected function failed - error: {0}")]
    Inject(Arc<DynError>),
    /// A Factory failed to build
    #[error("Factory for '{product}' failed - error: {error}")]
    FactoryFailed {
        product: &'static str,
        error: Arc<DynError>,
    },
    /// The container was dropped while a request was waiting
    #[error("Container was dropped before module '{0}' was registered")]
    ContainerDropped(ModuleId),
}

impl ModuleError {
    pub(crate) fn rejected(id: &ModuleId, error: impl Into<DynError>) -> Self {
        ModuleError::Rejected {
            id: id.clone(),
            error: Arc::new(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_the_module() {
        let err = ModuleError::Duplicate(ModuleId::from("db"));
        assert_eq!(err.to_string(), "Module 'db' is already registered");
    }

    #[test]
    fn rejected_carries_the_cause() {
        let err = ModuleError::rejected(&ModuleId::from("db"), "connection refused");
        assert_eq!(
            err.to_string(),
            "Registration of module 'db' failed - error: connection refused"
        );

        // Clones share the same cause
        let ModuleError::Rejected { error, .. } = &err else {
            panic!("expected Rejected")
        };
        let clone = err.clone();
        let ModuleError::Rejected { error: cloned, .. } = &clone else {
            panic!("expected Rejected")
        };
        assert!(Arc::ptr_eq(error, cloned));
    }

    #[test]
    fn errors_are_shareable_between_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<ModuleError>();
    }
}
