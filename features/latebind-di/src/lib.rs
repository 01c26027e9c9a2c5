//! Latebind DI is an asynchronous module registry.
//!
//! Modules are registered under a [ModuleId] and can be required before they exist:
//! a require on a missing module parks a request in the container, which is settled
//! by the next matching registration.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use futures::executor::block_on;
//! use latebind_di::Container;
//!
//! let container = Container::new();
//!
//! // Nothing is registered yet, the require is parked
//! let db = container.require::<String>("db");
//! assert!(container.has_pending_require_requests());
//!
//! container.register("db", "postgres://localhost".to_string()).unwrap();
//!
//! let db: Arc<String> = block_on(db).unwrap();
//! assert_eq!(db.as_str(), "postgres://localhost");
//! assert!(!container.has_pending_require_requests());
//! ```
//!
//! Latebind DI consists of the following components:
//!
//! 1. Container - registration, lookup and the ledger of parked requires
//! 2. Builder - container options, parent containers and fallback resolvers
//! 3. Inject - resolving many modules at once and calling functions with them
//! 4. Factories - modules constructed from other modules
//! 5. Resolver - typed access strategies, including [Lazy] handles
//!
//! Nothing here spawns tasks. Futures returned by the container are driven by whoever
//! awaits them, and a module which is never registered is waited for forever.

pub mod binding;
pub mod builder;
pub mod container;
pub mod errors;
pub mod factories;
pub mod identifier;
pub mod inject;
pub mod pending;
pub mod resolver;
pub mod types;

pub use binding::{Binding, InFlight, Registration};
pub use builder::{ContainerBuilder, ContainerOptions, FallbackResolver, OverridePolicy};
pub use container::Container;
pub use errors::ModuleError;
pub use factories::ModuleFactory;
pub use identifier::{ModuleId, Symbol};
pub use inject::Dependencies;
pub use pending::Require;
pub use resolver::{
    lazy::{Lazy, LazyFuture},
    Resolve,
};
pub use types::{DynError, Injectable, Instance, TypeInfo};
