//! Source-to-unit pipeline.
//!
//! [`DeployableFactory::create`] turns a logical unit name into a ready
//! [`Deployable`]:
//!
//! 1. [`SourceLocator`] finds the source file
//! 2. [`PathSetResolver`] builds the classpath for the host loader
//! 3. [`UnitCompiler`] compiles the source in memory
//! 4. [`CapabilityScanner`] picks the types implementing [`DEPLOYABLE_TYPE`]
//! 5. an [`ArtifactLoader`] over the compiled artifacts loads each of them
//! 6. each type is instantiated; a single instance is returned as is, several
//! 	are wrapped in a [`CompositeUnit`]

use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use itertools::Itertools ;
use pipe_trait::Pipe ;
use thiserror::Error ;

use crate::{
	ArtifactLoader, CapabilityScanner, CompileError, CompositeUnit, Deployable, Definer,
	DiscoveredType, InstantiationError, Loader, PathSetResolver, SourceLocator, SourceNotFound,
	SymbolTable, UnitCompiler, UnitType, DEPLOYABLE_TYPE,
};
use crate::scanner::scan_with ;



/// Prefix selecting this factory when none is configured, as in `src:unit.src`.
pub const DEFAULT_PREFIX: &str = "src" ;

/// Why [`DeployableFactory::create`] failed. None of these are retried.
#[derive( Debug, Error )]
pub enum CreateError {
	#[error( transparent )] NotFound( #[from] SourceNotFound ),
	#[error( transparent )] Compile( #[from] CompileError ),
	/// The source compiled but declares no type implementing the contract.
	#[error( "No implementation of {capability} found in {}", .source_path.display() )]
	NoImplementationFound { source_path: PathBuf, capability: String },
	#[error( transparent )] Instantiation( #[from] InstantiationError ),
}

/// Types from one compilation together with the loader that serves them.
///
/// Each type owns everything it was defined from, so the types and the units
/// they create stay valid after the loader is dropped. Keep the loader only
/// to look further names up in the same compilation.
#[derive( Debug )]
pub struct CompiledTypes {
	pub loader: Arc<ArtifactLoader>,
	pub types: Vec<( DiscoveredType, Arc<dyn UnitType> )>,
}

/// Compiles `source` for `loader` and loads every produced type accepted by
/// `predicate`.
///
/// # Errors
/// Returns the compile failure, or the first type that failed to load.
pub fn compile_types(
	compiler: &UnitCompiler,
	resolver: &PathSetResolver,
	definer: Arc<dyn Definer>,
	loader: Arc<dyn Loader>,
	source: &Path,
	predicate: impl Fn( &SymbolTable, &str ) -> bool,
) -> Result<CompiledTypes, CreateError> {

	let class_path = resolver.collect( loader.as_ref() );
	let output = compiler.compile( source, &class_path )?;
	let discovered = scan_with( &output.symbols, &output.artifacts, predicate );

	let artifact_loader = output.artifacts
		.pipe(| artifacts | ArtifactLoader::new( artifacts, loader, definer ))
		.pipe( Arc::new );
	let types = discovered.into_iter()
		.map(| discovered | artifact_loader.load_type( &discovered.name )
			.map(| unit_type | ( discovered, unit_type ))
			.map_err(| err | CreateError::Instantiation( err.into() ))
		)
		.collect::<Result<Vec<_>, _>>()?;

	Ok( CompiledTypes { loader: artifact_loader, types })

}

/// Creates deployable units from uncompiled source.
pub struct DeployableFactory {
	prefix: String,
	compiler: UnitCompiler,
	definer: Arc<dyn Definer>,
	resolver: PathSetResolver,
	locator: SourceLocator,
	scanner: CapabilityScanner,
}

impl DeployableFactory {

	/// A factory compiling with `compiler` and defining types with `definer`,
	/// using the default prefix, classpath sources and source locator.
	pub fn new( compiler: UnitCompiler, definer: Arc<dyn Definer> ) -> Self {
		Self {
			prefix: DEFAULT_PREFIX.to_string(),
			compiler,
			definer,
			resolver: PathSetResolver::default(),
			locator: SourceLocator::default(),
			scanner: CapabilityScanner::new( DEPLOYABLE_TYPE ),
		}
	}

	pub fn with_prefix( mut self, prefix: impl Into<String> ) -> Self {
		self.prefix = prefix.into();
		self
	}

	pub fn with_resolver( mut self, resolver: PathSetResolver ) -> Self {
		self.resolver = resolver ;
		self
	}

	pub fn with_locator( mut self, locator: SourceLocator ) -> Self {
		self.locator = locator ;
		self
	}

	/// Overrides the contract discovered types must implement.
	pub fn with_capability( mut self, capability: impl Into<String> ) -> Self {
		self.scanner = CapabilityScanner::new( capability );
		self
	}

	#[inline] pub fn prefix( &self ) -> &str { &self.prefix }
	#[inline] pub fn capability( &self ) -> &str { self.scanner.target() }

	/// Locates, compiles, discovers and instantiates the unit named `name`.
	///
	/// Blocks for the duration of the compilation.
	///
	/// # Errors
	/// See [`CreateError`].
	pub fn create( &self, name: &str, host_loader: Arc<dyn Loader> ) -> Result<Box<dyn Deployable>, CreateError> {

		let source = self.locator.resolve( name, host_loader.as_ref() )?;
		let compiled = compile_types(
			&self.compiler,
			&self.resolver,
			Arc::clone( &self.definer ),
			host_loader,
			&source,
			| symbols, symbol | symbols.is_subtype_of( symbol, self.scanner.target() ),
		)?;

		if compiled.types.is_empty() {
			return Err( CreateError::NoImplementationFound {
				source_path: source,
				capability: self.scanner.target().to_string(),
			});
		}

		tracing::info!(
			name,
			types = %compiled.types.iter().map(|( discovered, _ )| discovered.name.as_str() ).join( ", " ),
			"Discovered deployable types"
		);

		let instances = compiled.types.iter()
			.map(|( discovered, unit_type )| unit_type.instantiate().map(| unit | ( discovered.name.clone(), unit )))
			.collect::<Result<Vec<_>, _>>()?;

		Ok( match <[_; 1]>::try_from( instances ) {
			Ok([( _, unit )]) => unit,
			Err( instances ) => Box::new( CompositeUnit::new( instances )),
		})

	}

}

impl std::fmt::Debug for DeployableFactory {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "DeployableFactory" )
			.field( "prefix", &self.prefix )
			.field( "compiler", &self.compiler )
			.field( "resolver", &self.resolver )
			.field( "locator", &self.locator )
			.field( "scanner", &self.scanner )
			.finish_non_exhaustive()
	}
}
