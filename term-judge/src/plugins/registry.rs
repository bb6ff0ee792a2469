//! Lookup from (operation, backend library) to builder factories.

use super::builder::{BuilderContext, PluginBuilder};
use super::{datafusion, dummy};
use crate::core::{ExecConfig, Operation, StoreConfig, DUMMY_LIBRARY};
use crate::error::{JudgeError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates a builder from the run's stores and one config's arguments.
pub type BuilderFactory =
    Arc<dyn Fn(BuilderContext) -> Result<Box<dyn PluginBuilder>> + Send + Sync>;

/// Registered builder factories, keyed by operation then library identifier.
///
/// # Examples
///
/// ```rust
/// use term_judge::core::Operation;
/// use term_judge::plugins::BuilderRegistry;
///
/// let registry = BuilderRegistry::with_defaults();
/// assert!(registry.contains(Operation::Validation, "_dummy"));
/// assert!(registry.contains(Operation::Profiling, "datafusion"));
/// assert!(!registry.contains(Operation::Inference, "frictionless"));
/// ```
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    factories: HashMap<Operation, BTreeMap<String, BuilderFactory>>,
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for operation in Operation::ALL {
            map.entry(&operation, &self.libraries(operation));
        }
        map.finish()
    }
}

impl BuilderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the dummy and DataFusion backends for every operation.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for operation in Operation::ALL {
            registry.register(operation, DUMMY_LIBRARY, move |context| {
                Ok(Box::new(dummy::DummyBuilder::new(operation, context)) as Box<dyn PluginBuilder>)
            });
        }
        registry.register(Operation::Inference, datafusion::LIBRARY, |context| {
            Ok(Box::new(datafusion::InferenceBuilder::new(context)?) as Box<dyn PluginBuilder>)
        });
        registry.register(Operation::Validation, datafusion::LIBRARY, |context| {
            Ok(Box::new(datafusion::ValidationBuilder::new(context)?) as Box<dyn PluginBuilder>)
        });
        registry.register(Operation::Profiling, datafusion::LIBRARY, |context| {
            Ok(Box::new(datafusion::ProfilingBuilder::new(context)?) as Box<dyn PluginBuilder>)
        });
        registry
    }

    /// Registers `factory` for `library`, replacing any previous entry.
    pub fn register<F>(&mut self, operation: Operation, library: impl Into<String>, factory: F)
    where
        F: Fn(BuilderContext) -> Result<Box<dyn PluginBuilder>> + Send + Sync + 'static,
    {
        self.factories
            .entry(operation)
            .or_default()
            .insert(library.into(), Arc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_builder<F>(mut self, operation: Operation, library: impl Into<String>, factory: F) -> Self
    where
        F: Fn(BuilderContext) -> Result<Box<dyn PluginBuilder>> + Send + Sync + 'static,
    {
        self.register(operation, library, factory);
        self
    }

    pub fn contains(&self, operation: Operation, library: &str) -> bool {
        self.factory(operation, library).is_some()
    }

    /// Registered library identifiers for `operation`, sorted.
    pub fn libraries(&self, operation: Operation) -> Vec<&str> {
        self.factories
            .get(&operation)
            .map(|libraries| libraries.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn factory(&self, operation: Operation, library: &str) -> Option<&BuilderFactory> {
        self.factories.get(&operation)?.get(library)
    }

    /// Instantiates the builder selected by `config`.
    pub fn create_builder(
        &self,
        operation: Operation,
        config: &ExecConfig,
        stores: &[StoreConfig],
    ) -> Result<Box<dyn PluginBuilder>> {
        let factory = self.factory(operation, &config.library).ok_or_else(|| {
            JudgeError::UnknownBackend {
                operation,
                library: config.library.clone(),
            }
        })?;

        debug!(operation = %operation, library = %config.library, "Creating plugin builder");
        factory(BuilderContext::new(stores.to_vec(), config.exec_args.clone()))
    }

    /// Instantiates one builder per config entry.
    ///
    /// Every library identifier is checked before any builder is created. If
    /// a factory fails, the builders already created are destroyed before the
    /// error is returned.
    pub fn create_builders(
        &self,
        operation: Operation,
        configs: &[ExecConfig],
        stores: &[StoreConfig],
    ) -> Result<Vec<Box<dyn PluginBuilder>>> {
        if let Some(unknown) = configs
            .iter()
            .find(|config| !self.contains(operation, &config.library))
        {
            return Err(JudgeError::UnknownBackend {
                operation,
                library: unknown.library.clone(),
            });
        }

        let mut builders = Vec::with_capacity(configs.len());
        for config in configs {
            match self.create_builder(operation, config, stores) {
                Ok(builder) => builders.push(builder),
                Err(e) => {
                    destroy_all(operation, &mut builders);
                    return Err(e);
                }
            }
        }
        Ok(builders)
    }
}

/// Destroys every builder, logging failures instead of returning them.
pub(crate) fn destroy_all(operation: Operation, builders: &mut [Box<dyn PluginBuilder>]) {
    for builder in builders {
        if let Err(e) = builder.destroy() {
            warn!(
                operation = %operation,
                library = builder.library(),
                error = %e,
                "Failed to destroy plugin builder"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataResource;
    use crate::plugins::BuildRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults_cover_every_operation() {
        let registry = BuilderRegistry::with_defaults();
        for operation in Operation::ALL {
            assert_eq!(registry.libraries(operation), vec!["_dummy", "datafusion"]);
        }
    }

    #[test]
    fn test_unknown_backend_rejected_before_any_builder() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let registry = BuilderRegistry::new().with_builder(
            Operation::Profiling,
            "counted",
            move |context| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(dummy::DummyBuilder::new(Operation::Profiling, context))
                    as Box<dyn PluginBuilder>)
            },
        );

        let configs = vec![ExecConfig::new("counted"), ExecConfig::new("ydata")];
        let err = registry
            .create_builders(Operation::Profiling, &configs, &[])
            .unwrap_err();

        assert!(matches!(
            err,
            JudgeError::UnknownBackend { operation: Operation::Profiling, ref library } if library == "ydata"
        ));
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[derive(Debug)]
    struct TrackedBuilder {
        destroyed: Arc<AtomicUsize>,
    }

    impl PluginBuilder for TrackedBuilder {
        fn operation(&self) -> Operation {
            Operation::Validation
        }

        fn library(&self) -> &str {
            "tracked"
        }

        fn build(
            &mut self,
            _request: &BuildRequest<'_>,
        ) -> Result<Vec<Box<dyn crate::plugins::Plugin>>> {
            Ok(vec![])
        }

        fn destroy(&mut self) -> Result<()> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_factory_failure_destroys_created_builders() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let registry = BuilderRegistry::new()
            .with_builder(Operation::Validation, "tracked", move |_context| {
                Ok(Box::new(TrackedBuilder {
                    destroyed: Arc::clone(&counter),
                }) as Box<dyn PluginBuilder>)
            })
            .with_builder(Operation::Validation, "unreachable", |_context| {
                Err(JudgeError::Construction("no connection".to_string()))
            });

        let configs = vec![
            ExecConfig::new("tracked"),
            ExecConfig::new("tracked"),
            ExecConfig::new("unreachable"),
        ];
        let err = registry
            .create_builders(Operation::Validation, &configs, &[])
            .unwrap_err();

        assert!(matches!(err, JudgeError::Construction(ref msg) if msg == "no connection"));
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_library_is_scoped_by_operation() {
        let registry = BuilderRegistry::new().with_builder(
            Operation::Inference,
            "schema-only",
            |context| {
                Ok(Box::new(dummy::DummyBuilder::new(Operation::Inference, context))
                    as Box<dyn PluginBuilder>)
            },
        );
        assert!(registry.contains(Operation::Inference, "schema-only"));
        assert!(registry
            .create_builder(Operation::Validation, &ExecConfig::new("schema-only"), &[])
            .is_err());
    }

    #[test]
    fn test_created_builder_receives_stores() {
        let registry = BuilderRegistry::with_defaults();
        let stores = vec![StoreConfig::local("local", "/data")];
        let mut builder = registry
            .create_builder(Operation::Inference, &ExecConfig::dummy(), &stores)
            .unwrap();

        assert_eq!(builder.library(), "_dummy");
        let resources = vec![DataResource::new("orders", "orders.csv", "local")];
        let plugins = builder.build(&BuildRequest::new(&resources)).unwrap();
        assert_eq!(plugins.len(), 1);
        builder.destroy().unwrap();
    }
}
