//! Startup orchestration.
//!
//! [`Bridge::bootstrap`] performs the whole startup sequence in its one valid
//! order: load mappings → extract the jar → apply patch units → register the
//! scratch directory → build the registry and invoker. Any failure aborts the
//! bootstrap; there is no partially-initialized bridge. The returned [`Bridge`]
//! is the explicit context object everything else hangs off - the only ambient
//! global in the crate is the load-once version guard inside the mapping table.

use std::path::PathBuf;
use std::sync::Arc;

use crate::classpath::Classpath;
use crate::composite::CompositeInstance;
use crate::mapping::{MappingSet, MappingTable, VersionKey};
use crate::patch::{BytecodePatchPipeline, PatchUnit, PipelineState};
use crate::proxy::{ProxyFactory, ProxyHandler};
use crate::reflect::ReflectiveInvoker;
use crate::runtime::{ClassRegistry, ObjectRef, Value};
use crate::Result;

/// Everything [`Bridge::bootstrap`] needs to bring the adapter up.
pub struct BridgeConfig {
    /// The target-binary release being adapted
    pub version: VersionKey,
    /// Mapping entries for that release
    pub mappings: MappingSet,
    /// Path to the target jar
    pub jar: PathBuf,
    /// Fixed scratch directory; a generated temp location when `None`
    pub scratch_dir: Option<PathBuf>,
    /// Patch units to apply before first load, in order
    pub patch_units: Vec<PatchUnit>,
}

impl BridgeConfig {
    /// A config with no patch units and a generated scratch directory.
    #[must_use]
    pub fn new(version: VersionKey, mappings: MappingSet, jar: impl Into<PathBuf>) -> Self {
        BridgeConfig {
            version,
            mappings,
            jar: jar.into(),
            scratch_dir: None,
            patch_units: Vec::new(),
        }
    }

    /// Add a patch unit.
    #[must_use]
    pub fn patch(mut self, unit: PatchUnit) -> Self {
        self.patch_units.push(unit);
        self
    }

    /// Use a fixed scratch directory.
    #[must_use]
    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }
}

/// The assembled adapter context: mappings, classpath, registry and invoker.
pub struct Bridge {
    mappings: Arc<MappingTable>,
    classpath: Arc<Classpath>,
    registry: Arc<ClassRegistry>,
    invoker: Arc<ReflectiveInvoker>,
    pipeline: BytecodePatchPipeline,
}

impl Bridge {
    /// Run the full startup sequence.
    ///
    /// # Errors
    /// Every phase failure aborts: [`crate::Error::MappingLoad`],
    /// [`crate::Error::Extraction`], [`crate::Error::PatchTargetNotFound`],
    /// [`crate::Error::StartupOrder`], plus I/O and archive errors from the jar.
    pub fn bootstrap(config: BridgeConfig) -> Result<Bridge> {
        let mappings = Arc::new(MappingTable::load(config.version, &config.mappings)?);

        let classpath = Arc::new(Classpath::new());
        classpath.push_jar(&config.jar)?;

        let mut pipeline = BytecodePatchPipeline::new(&config.jar, mappings.clone());
        if let Some(scratch) = config.scratch_dir {
            pipeline = pipeline.with_scratch_dir(scratch);
        }
        for unit in config.patch_units {
            pipeline.add_unit(unit)?;
        }
        pipeline.extract()?;
        pipeline.patch()?;
        pipeline.register(&classpath)?;

        let registry = Arc::new(ClassRegistry::new(classpath.clone()));
        let invoker = Arc::new(ReflectiveInvoker::new(mappings.clone(), registry.clone()));

        Ok(Bridge {
            mappings,
            classpath,
            registry,
            invoker,
            pipeline,
        })
    }

    /// The loaded mapping table.
    #[must_use]
    pub fn mappings(&self) -> &Arc<MappingTable> {
        &self.mappings
    }

    /// The class search path, scratch directory first.
    #[must_use]
    pub fn classpath(&self) -> &Arc<Classpath> {
        &self.classpath
    }

    /// The class registry, for binding native method implementations.
    #[must_use]
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// The shared reflective invoker.
    #[must_use]
    pub fn invoker(&self) -> &Arc<ReflectiveInvoker> {
        &self.invoker
    }

    /// Phase the patch pipeline finished in; [`PipelineState::Registered`]
    /// after a successful bootstrap.
    #[must_use]
    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Wrap an existing instance in a logical-name view.
    #[must_use]
    pub fn wrap(&self, object: ObjectRef) -> CompositeInstance {
        CompositeInstance::wrap(object, self.invoker.clone())
    }

    /// Instantiate a logical class and wrap the result.
    pub fn construct(&self, logical_class: &str, args: &[Value]) -> Result<CompositeInstance> {
        CompositeInstance::construct(logical_class, args, self.invoker.clone())
    }

    /// Create an intercepting proxy instance of a logical class.
    pub fn proxy(
        &self,
        logical_class: &str,
        handler: ProxyHandler,
        copy_fields: bool,
        ctor_args: &[Value],
    ) -> Result<CompositeInstance> {
        let factory = ProxyFactory::new(self.invoker.clone());
        let object = factory.create_proxy(logical_class, handler, copy_fields, ctor_args)?;
        Ok(self.wrap(object))
    }

    /// Invoke a static logical method.
    pub fn invoke_static(
        &self,
        logical_class: &str,
        logical_name: &str,
        args: &[Value],
    ) -> Result<Value> {
        self.invoker.invoke_static(logical_class, logical_name, args)
    }
}
