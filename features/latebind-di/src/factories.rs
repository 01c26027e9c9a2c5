use std::{future::Future, sync::Arc};

use crate::{
    container::Container,
    errors::ModuleError,
    identifier::ModuleId,
    inject::Dependencies,
    types::{DynError, Injectable, Instance, TypeInfo},
};

/// A Factory constructing a module from other modules
pub trait ModuleFactory: Send + 'static {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Identifiers of the modules the factory needs, in the order `construct` receives them
    fn dependencies(&self) -> Vec<ModuleId>;

    /// Constructs a new instance of the factory's provided type
    ///
    /// Returns the constructed instance, or an error if the Instantiation failed
    fn construct(
        self,
        dependencies: Dependencies,
    ) -> impl Future<Output = Result<Self::Provides, impl Into<DynError>>> + Send;
}

impl Container {
    /// Waits for the factory's dependencies, then constructs its product
    pub fn initiate<F: ModuleFactory>(
        &self,
        factory: F,
    ) -> impl Future<Output = Result<Arc<F::Provides>, ModuleError>> + Send + 'static {
        let dependencies = self.require_many(factory.dependencies());
        async move {
            let dependencies = dependencies.await?;
            let product = F::supplies();
            tracing::debug!(
                product = %product,
                dependencies = dependencies.len(),
                "Constructing module from factory"
            );

            match factory.construct(dependencies).await {
                Ok(instance) => Ok(Arc::new(instance)),
                Err(error) => Err(ModuleError::FactoryFailed {
                    product: product.type_name,
                    error: Arc::new(error.into()),
                }),
            }
        }
    }

    /// [Container::initiate] and register the product as `id`
    pub fn register_factory<F: ModuleFactory>(
        &self,
        id: impl Into<ModuleId>,
        factory: F,
    ) -> impl Future<Output = Result<Instance, ModuleError>> + Send + 'static {
        let id = id.into();
        let container = self.clone();
        let initiated = id.validate().map(|()| self.initiate(factory));
        async move {
            let product = initiated?.await?;
            container.register_instance(id, Instance::from_arc(product))
        }
    }
}
