//! Deploy units straight from source.
//!
//! `deploy_link` takes the logical name of a source file, compiles it in
//! process against the host's path set, discovers every compiled type that
//! implements the [`Deployable`] lifecycle contract and hands back a single
//! lifecycle handle for them.
//!
//! # Core Concepts
//!
//! - [`Loader`]: A parent-first chain of type and resource providers. The host
//! 	supplies one; every compilation gets its own [`ArtifactLoader`] layered on
//! 	top of it so compiled types can see everything the host sees.
//!
//! - [`PathSetResolver`]: Flattens a loader chain (search roots and manifest
//! 	`Class-Path` attributes) plus configured [`Properties`] into the
//! 	de-duplicated list of existing [`PathEntry`]s the compiler searches.
//!
//! - [`SourceLocator`]: Turns a logical name such as `src:demo/unit.src` into
//! 	a source file, trying loader resources before the filesystem.
//!
//! - [`UnitCompiler`]: Drives a [`CompilerBackend`] and collects its
//! 	[`Diagnostic`]s. Any error diagnostic fails the compilation.
//!
//! - [`CapabilityScanner`]: Walks the compiled [`SymbolTable`] and keeps the
//! 	artifacts whose supertype closure contains [`DEPLOYABLE_TYPE`].
//!
//! - [`Definer`]: Materialises a compiled artifact as a [`UnitType`]. Use
//! 	[`ComponentDefiner`] for guests compiled to WebAssembly components and
//! 	[`RegistryDefiner`] for guests linked into the host.
//!
//! - [`DeployableFactory`]: The whole pipeline. One discovered type is
//! 	returned as is, several are wrapped in a [`CompositeUnit`].
//!
//! - [`Host`]: Selects a factory by prefix or extension, then creates,
//! 	initialises, starts and tracks deployments.
//!
//! # Re-exports
//!
//! `deploy_link` re-exports `Engine` and `Component` from `wasmtime` for
//! convenience. These types are defined by wasmtime; see the
//! [wasmtime docs](https://docs.rs/wasmtime/latest/wasmtime/) for details.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use async_trait::async_trait ;
//! use deploy_link::{
//! 	BackendOutput, BinaryArtifact, CompilerBackend, CompilerInvocation, Deployable,
//! 	DeployableFactory, DeploymentContext, Diagnostics, LifecycleError, PathLoader,
//! 	RegistryDefiner, TypeRegistry, UnitCompiler, DEPLOYABLE_TYPE,
//! };
//!
//! // A guest compiler reporting one deployable type for any source.
//! struct Backend ;
//!
//! impl CompilerBackend for Backend {
//! 	fn compile(
//! 		&self,
//! 		_: &CompilerInvocation<'_>,
//! 		_: &mut Diagnostics<'_>,
//! 	) -> Result<Option<BackendOutput>, std::io::Error> {
//! 		Ok( Some( BackendOutput {
//! 			artifacts: vec![ BinaryArtifact::new( "demo/Hello.unit", Vec::<u8>::new(), [ DEPLOYABLE_TYPE ]) ],
//! 			external_types: Vec::new(),
//! 		}))
//! 	}
//! }
//!
//! #[derive( Default )]
//! struct Hello { context: Option<Arc<DeploymentContext>> }
//!
//! #[async_trait]
//! impl Deployable for Hello {
//! 	fn init( &mut self, context: Arc<DeploymentContext> ) -> Result<(), LifecycleError> {
//! 		self.context = Some( context );
//! 		Ok(())
//! 	}
//! 	fn context( &self ) -> Option<&Arc<DeploymentContext>> { self.context.as_ref() }
//! 	async fn start( &mut self ) -> Result<(), LifecycleError> {
//! 		if let Some( context ) = &self.context {
//! 			context.shared_data().local_map( "greetings" ).put( "hello", "world" );
//! 		}
//! 		Ok(())
//! 	}
//! 	async fn stop( &mut self ) -> Result<(), LifecycleError> { Ok(()) }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Guest types linked into the host are looked up by their compiled name.
//! let types = TypeRegistry::new().with( "demo.Hello", || Ok( Box::new( Hello::default() ) as Box<dyn Deployable> ));
//! let factory = DeployableFactory::new( UnitCompiler::new( Backend ), Arc::new( RegistryDefiner::new( types )));
//!
//! // The host loader searches one directory for sources.
//! let dir = tempfile::tempdir()?;
//! std::fs::write( dir.path().join( "hello.src" ), "" )?;
//! let loader = PathLoader::new( "host", [ dir.path() ]).into_shared();
//!
//! let mut unit = factory.create( "src:hello.src", loader )?;
//! let context = Arc::new( DeploymentContext::new( "example", Default::default() ));
//! unit.init( Arc::clone( &context ))?;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
//! runtime.block_on( unit.start() )?;
//! assert_eq!( context.shared_data().local_map( "greetings" ).get( "hello" ).as_deref(), Some( "world" ));
//! runtime.block_on( unit.stop() )?;
//! # Ok(())
//! # }
//! ```

mod context ;
mod deployable ;
mod unit_type ;
mod loader ;
mod manifest ;
mod classpath ;
mod source_locator ;
mod symbol_table ;
mod compiler ;
mod command_backend ;
mod scanner ;
mod artifact_loader ;
mod component ;
mod composite ;
mod factory ;
mod host ;

#[doc( no_inline )]
pub use wasmtime::Engine ;
#[doc( no_inline )]
pub use wasmtime::component::Component ;

pub use context::{ DeploymentContext, SharedData, LocalMap };
pub use deployable::{ Deployable, LifecycleError, ChildFailure, DEPLOYABLE_TYPE };
pub use unit_type::{ UnitType, NativeType, TypeRegistry, InstantiationError };
pub use loader::{ Loader, PathLoader };
pub use manifest::{ Manifest, ManifestError, MANIFEST_RESOURCE };
pub use classpath::{ PathEntry, PathSetResolver, ClasspathSources, Properties, ResolverEnv };
pub use source_locator::{ SourceLocator, SourceNotFound, strip_prefix, split_prefix };
pub use symbol_table::{ BinaryArtifact, SymbolTable };
pub use compiler::{
	UnitCompiler, CompilerBackend, CompilerInvocation, BackendOutput, CompileOutput, CompileError,
	Diagnostic, Diagnostics, DiagnosticSink, Severity, SourceSpan, StderrSink, SilentSink,
	DEFAULT_MODULE_NAME, DEFAULT_TARGET_VERSION,
};
pub use command_backend::{ CommandBackend, INDEX_FILE };
pub use scanner::{ CapabilityScanner, DiscoveredType, scan_with };
pub use artifact_loader::{ ArtifactLoader, Definer, RegistryDefiner, LoadError, DefineError };
pub use component::{ ComponentDefiner, ComponentType, ComponentUnit, GuestState, LIFECYCLE_INTERFACE };
pub use composite::{ CompositeUnit, UnitState };
pub use factory::{ DeployableFactory, CreateError, CompiledTypes, compile_types, DEFAULT_PREFIX };
pub use host::{ Host, UnitFactory, DeployError, DeploymentOptions };
