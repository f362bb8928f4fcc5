//! Layered loaders.
//!
//! A [`Loader`] answers two questions for a name: which resource files it can
//! see, and which [`UnitType`] the name refers to. Loaders form a chain through
//! [`Loader::parent`]; the provided methods implement the usual delegation
//! where the parent is asked first.

use std::path::{ Component, Path, PathBuf };
use std::sync::Arc ;

use crate::{ TypeRegistry, UnitType };
use crate::artifact_loader::LoadError ;



/// A node in a loader hierarchy.
pub trait Loader: Send + Sync {

	/// Human readable name used in logs.
	fn name( &self ) -> &str ;

	/// The loader this one delegates to.
	fn parent( &self ) -> Option<Arc<dyn Loader>> ;

	/// The explicit binary search roots of this loader alone, if it exposes any.
	fn search_roots( &self ) -> Option<&[PathBuf]> ;

	/// Resources named `name` that this loader itself can see, excluding the parent.
	fn find_resources( &self, name: &str ) -> Vec<PathBuf> ;

	/// The type this loader itself defines under `name`, excluding the parent.
	///
	/// # Errors
	/// Returns an error if the type exists but could not be defined.
	fn find_type( &self, name: &str ) -> Result<Option<Arc<dyn UnitType>>, LoadError> ;

	/// Every resource named `name` visible through the chain, parent's first.
	fn resources( &self, name: &str ) -> Vec<PathBuf> {
		let mut found = self.parent().map(| parent | parent.resources( name )).unwrap_or_default();
		found.extend( self.find_resources( name ));
		found
	}

	/// The first resource named `name`, asking the parent first.
	fn resource( &self, name: &str ) -> Option<PathBuf> {
		self.parent()
			.and_then(| parent | parent.resource( name ))
			.or_else(|| self.find_resources( name ).into_iter().next() )
	}

	/// Resolves `name` to a type, asking the parent first.
	///
	/// # Errors
	/// Returns [`LoadError::NotFound`] if no loader in the chain defines `name`.
	fn load_type( &self, name: &str ) -> Result<Arc<dyn UnitType>, LoadError> {
		if let Some( parent ) = self.parent() {
			match parent.load_type( name ) {
				Err( LoadError::NotFound( _ )) => {},
				result => return result,
			}
		}
		self.find_type( name )?.ok_or_else(|| LoadError::NotFound( name.to_string() ))
	}

}

impl std::fmt::Debug for dyn Loader {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "Loader({})", self.name() )
	}
}

/// A host loader over a list of directory roots plus host-native types.
///
/// Resources are regular files below a root. A loader built with
/// [`PathLoader::opaque`] exposes no search roots, mirroring loaders whose
/// binary locations are not introspectable.
#[derive( Debug )]
pub struct PathLoader {
	name: String,
	roots: Option<Vec<PathBuf>>,
	parent: Option<Arc<dyn Loader>>,
	types: TypeRegistry,
}

impl PathLoader {

	/// Creates a root loader searching `roots`.
	pub fn new( name: impl Into<String>, roots: impl IntoIterator<Item = impl Into<PathBuf>> ) -> Self {
		Self {
			name: name.into(),
			roots: Some( roots.into_iter().map( Into::into ).collect() ),
			parent: None,
			types: TypeRegistry::new(),
		}
	}

	/// Creates a loader that does not expose its search roots.
	pub fn opaque( name: impl Into<String> ) -> Self {
		Self { name: name.into(), roots: None, parent: None, types: TypeRegistry::new() }
	}

	pub fn with_parent( mut self, parent: Arc<dyn Loader> ) -> Self {
		self.parent = Some( parent );
		self
	}

	/// Types this loader defines natively.
	pub fn with_types( mut self, types: TypeRegistry ) -> Self {
		self.types = types ;
		self
	}

	pub fn into_shared( self ) -> Arc<dyn Loader> { Arc::new( self ) }

	fn roots( &self ) -> &[PathBuf] { self.roots.as_deref().unwrap_or_default() }

}

impl Loader for PathLoader {

	fn name( &self ) -> &str { &self.name }

	fn parent( &self ) -> Option<Arc<dyn Loader>> { self.parent.clone() }

	fn search_roots( &self ) -> Option<&[PathBuf]> { self.roots.as_deref() }

	fn find_resources( &self, name: &str ) -> Vec<PathBuf> {
		let relative = Path::new( name );
		// Resources never escape the roots.
		if !relative.components().all(| component | matches!( component, Component::Normal( _ ))) {
			return Vec::with_capacity( 0 )
		}
		self.roots().iter()
			.map(| root | root.join( relative ))
			.filter(| candidate | candidate.is_file() )
			.collect()
	}

	fn find_type( &self, name: &str ) -> Result<Option<Arc<dyn UnitType>>, LoadError> {
		Ok( self.types.get( name ))
	}

}
