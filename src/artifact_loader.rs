//! The loader serving one compilation's in-memory artifacts.

use std::collections::HashMap ;
use std::collections::hash_map::Entry ;
use std::path::PathBuf ;
use std::sync::{ Arc, PoisonError, RwLock };
use thiserror::Error ;

use crate::{ BinaryArtifact, Loader, TypeRegistry, UnitType };



#[derive( Debug, Error )]
pub enum LoadError {
	/// No loader in the chain defines the name.
	#[error( "Type not found: {0}" )] NotFound( String ),
	/// An artifact exists but could not be turned into a type.
	#[error( "Failed to define {name}: {error}" )]
	Define { name: String, #[source] error: DefineError },
}

#[derive( Debug, Error )]
pub enum DefineError {
	/// The definer has no constructor for the artifact.
	#[error( "No constructor registered for {0}" )] UnknownType( String ),
	/// The artifact's bytes are not a valid component.
	#[error( "Invalid component: {0}" )] InvalidComponent( wasmtime::Error ),
}

/// Turns a compiled artifact into a loadable type.
pub trait Definer: Send + Sync {
	/// # Errors
	/// Returns a [`DefineError`] if the artifact can't be materialised.
	fn define( &self, artifact: &BinaryArtifact ) -> Result<Arc<dyn UnitType>, DefineError> ;
}

/// Defines artifacts by looking their name up in a [`TypeRegistry`].
///
/// For guests whose code is linked into the host ahead of time: the compiler
/// still decides which types a source declares, the registry supplies their
/// constructors.
#[derive( Debug, Clone, Default )]
pub struct RegistryDefiner {
	types: TypeRegistry,
}

impl RegistryDefiner {
	pub fn new( types: TypeRegistry ) -> Self { Self { types }}
}

impl Definer for RegistryDefiner {
	fn define( &self, artifact: &BinaryArtifact ) -> Result<Arc<dyn UnitType>, DefineError> {
		let name = artifact.name();
		self.types.get( &name ).ok_or( DefineError::UnknownType( name ))
	}
}

/// A loader scoped to one compilation.
///
/// Names produced by that compilation resolve to its own artifacts first;
/// anything else is delegated to the parent. Each artifact is defined at most
/// once and the result is shared by all later lookups, from any thread.
pub struct ArtifactLoader {
	name: String,
	parent: Arc<dyn Loader>,
	definer: Arc<dyn Definer>,
	artifacts: HashMap<String, BinaryArtifact>,
	order: Vec<String>,
	defined: RwLock<HashMap<String, Arc<dyn UnitType>>>,
}

impl ArtifactLoader {

	pub fn new(
		artifacts: impl IntoIterator<Item = BinaryArtifact>,
		parent: Arc<dyn Loader>,
		definer: Arc<dyn Definer>,
	) -> Self {
		// A name emitted twice keeps its first artifact.
		let mut order = Vec::new();
		let mut served = HashMap::new();
		for artifact in artifacts {
			if let Entry::Vacant( slot ) = served.entry( artifact.name() ) {
				order.push( slot.key().clone() );
				slot.insert( artifact );
			}
		}
		Self {
			name: format!( "artifacts<{}>", parent.name() ),
			parent,
			definer,
			artifacts: served,
			order,
			defined: RwLock::new( HashMap::new() ),
		}
	}

	/// Names of the served artifacts in emission order.
	pub fn artifact_names( &self ) -> &[String] { &self.order }

	pub fn artifact( &self, name: &str ) -> Option<&BinaryArtifact> { self.artifacts.get( name ) }

	fn define( &self, name: &str, artifact: &BinaryArtifact ) -> Result<Arc<dyn UnitType>, LoadError> {

		if let Some( unit_type ) = self.defined.read().unwrap_or_else( PoisonError::into_inner ).get( name ) {
			return Ok( Arc::clone( unit_type ));
		}

		let mut defined = self.defined.write().unwrap_or_else( PoisonError::into_inner );
		if let Some( unit_type ) = defined.get( name ) { return Ok( Arc::clone( unit_type )) }

		let unit_type = self.definer.define( artifact )
			.map_err(| error | LoadError::Define { name: name.to_string(), error })?;
		tracing::debug!( name, "Defined compiled type" );
		defined.insert( name.to_string(), Arc::clone( &unit_type ));
		Ok( unit_type )

	}

}

impl Loader for ArtifactLoader {

	fn name( &self ) -> &str { &self.name }

	fn parent( &self ) -> Option<Arc<dyn Loader>> { Some( Arc::clone( &self.parent )) }

	fn search_roots( &self ) -> Option<&[PathBuf]> { None }

	fn find_resources( &self, _: &str ) -> Vec<PathBuf> { Vec::with_capacity( 0 ) }

	fn find_type( &self, name: &str ) -> Result<Option<Arc<dyn UnitType>>, LoadError> {
		self.artifacts.get( name )
			.map(| artifact | self.define( name, artifact ))
			.transpose()
	}

	/// Own artifacts first, then the parent chain.
	fn load_type( &self, name: &str ) -> Result<Arc<dyn UnitType>, LoadError> {
		match self.find_type( name )? {
			Some( unit_type ) => Ok( unit_type ),
			None => self.parent.load_type( name ),
		}
	}

}

impl std::fmt::Debug for ArtifactLoader {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ArtifactLoader" )
			.field( "name", &self.name )
			.field( "artifacts", &self.order )
			.finish_non_exhaustive()
	}
}
