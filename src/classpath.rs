//! Binary search path ("classpath") resolution.
//!
//! [`PathSetResolver::collect`] gathers candidate locations from several
//! sources, then collapses them to the set of canonical paths that exist on
//! disk. Every step is best effort: a location that can't be read or doesn't
//! exist is dropped, never reported as an error. Compilation is the place
//! where an incomplete classpath turns into a failure.

use std::collections::BTreeMap ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use itertools::Itertools ;

use crate::Loader ;
use crate::manifest::{ Manifest, MANIFEST_RESOURCE };



/// An existing, canonical binary search location.
#[derive( Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct PathEntry( PathBuf );

impl PathEntry {

	/// Canonicalizes `path`, returning `None` if it doesn't exist.
	pub fn resolve( path: &Path ) -> Option<Self> {
		std::fs::canonicalize( path ).ok().map( Self )
	}

	#[inline] pub fn path( &self ) -> &Path { &self.0 }

}

impl AsRef<Path> for PathEntry {
	fn as_ref( &self ) -> &Path { &self.0 }
}

impl std::fmt::Display for PathEntry {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		std::fmt::Display::fmt( &self.0.display(), f )
	}
}

/// Which sources contribute to a resolved path set.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct ClasspathSources {
	/// Walk the requesting loader's chain: search roots and manifests.
	pub loader_chain: bool,
	/// Include the environment's system loader chain.
	pub system_loader: bool,
	/// Include the environment's context loader chain.
	pub context_loader: bool,
	/// Path-list properties to read from the environment's [`Properties`].
	pub property_keys: Vec<String>,
}

impl Default for ClasspathSources {
	fn default() -> Self {
		Self {
			loader_chain: true,
			system_loader: true,
			context_loader: true,
			property_keys: vec![ "class.path".to_string(), "boot.class.path".to_string() ],
		}
	}
}

impl ClasspathSources {

	/// Only the requesting loader's chain.
	pub fn loader_chain_only() -> Self {
		Self { loader_chain: true, system_loader: false, context_loader: false, property_keys: Vec::new() }
	}

	pub fn with_property_keys( mut self, keys: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.property_keys = keys.into_iter().map( Into::into ).collect();
		self
	}

}

/// Key -> path-list properties, an explicit stand-in for process properties.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct Properties( BTreeMap<String, String> );

impl Properties {

	pub fn new() -> Self { Self::default() }

	pub fn with( mut self, key: impl Into<String>, value: impl Into<String> ) -> Self {
		self.0.insert( key.into(), value.into() );
		self
	}

	/// Reads each of `keys` from the environment variable named by upper-casing
	/// the key and replacing `.` with `_` (`class.path` <- `CLASS_PATH`).
	pub fn from_env<'a>( keys: impl IntoIterator<Item = &'a str> ) -> Self {
		Self( keys.into_iter()
			.filter_map(| key | {
				let var = key.to_ascii_uppercase().replace( '.', "_" );
				std::env::var( var ).ok().map(| value | ( key.to_string(), value ))
			})
			.collect()
		)
	}

	pub fn get( &self, key: &str ) -> Option<&str> { self.0.get( key ).map( String::as_str ) }

	/// The path list stored under `key`, split with the platform separator.
	pub fn path_list( &self, key: &str ) -> Vec<PathBuf> {
		self.get( key )
			.map(| value | std::env::split_paths( value )
				.filter(| path | !path.as_os_str().is_empty() )
				.collect()
			)
			.unwrap_or_default()
	}

}

/// Ambient loaders and properties, supplied explicitly.
#[derive( Clone, Default )]
pub struct ResolverEnv {
	pub system_loader: Option<Arc<dyn Loader>>,
	pub context_loader: Option<Arc<dyn Loader>>,
	pub properties: Properties,
}

impl std::fmt::Debug for ResolverEnv {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ResolverEnv" )
			.field( "system_loader", &self.system_loader.as_ref().map(| loader | loader.name().to_string() ))
			.field( "context_loader", &self.context_loader.as_ref().map(| loader | loader.name().to_string() ))
			.field( "properties", &self.properties )
			.finish()
	}
}

/// Builds the deduplicated, existence-filtered set of binary search locations
/// for a loader.
#[derive( Debug, Clone, Default )]
pub struct PathSetResolver {
	sources: ClasspathSources,
	env: ResolverEnv,
}

impl PathSetResolver {

	pub fn new( sources: ClasspathSources, env: ResolverEnv ) -> Self {
		Self { sources, env }
	}

	#[inline] pub fn sources( &self ) -> &ClasspathSources { &self.sources }
	#[inline] pub fn env( &self ) -> &ResolverEnv { &self.env }

	/// Collects the path set visible to `loader`.
	///
	/// Order follows resolution order (the loader chain, then the system
	/// loader, the context loader and finally the properties) and is only
	/// meaningful for diagnostics. Each canonical location appears once.
	pub fn collect( &self, loader: &dyn Loader ) -> Vec<PathEntry> {

		let mut candidates = Vec::new();

		if self.sources.loader_chain { candidates.extend( loader_class_path( loader )); }
		let ambient = [
			( self.sources.system_loader, &self.env.system_loader ),
			( self.sources.context_loader, &self.env.context_loader ),
		];
		for ( enabled, ambient_loader ) in ambient {
			if let ( true, Some( ambient_loader )) = ( enabled, ambient_loader ) {
				candidates.extend( loader_class_path( ambient_loader.as_ref() ));
			}
		}
		candidates.extend( self.sources.property_keys.iter()
			.flat_map(| key | self.env.properties.path_list( key ))
		);

		let entries = candidates.iter()
			.filter_map(| path | {
				let entry = PathEntry::resolve( path );
				if entry.is_none() { tracing::debug!( path = %path.display(), "Dropping missing classpath entry" ); }
				entry
			})
			.unique()
			.collect::<Vec<_>>();

		tracing::debug!( loader = loader.name(), entries = entries.len(), "Resolved classpath" );
		entries

	}

}

/// Search roots of the whole chain (own before parent's) followed by every
/// manifest `Class-Path` reference visible through the chain.
fn loader_class_path( loader: &dyn Loader ) -> Vec<PathBuf> {
	chain_roots( loader ).into_iter()
		.chain( manifest_class_path( loader ))
		.unique()
		.collect()
}

fn chain_roots( loader: &dyn Loader ) -> Vec<PathBuf> {
	let mut roots = loader.search_roots().map( <[PathBuf]>::to_vec ).unwrap_or_default();
	if let Some( parent ) = loader.parent() { roots.extend( chain_roots( parent.as_ref() )); }
	roots
}

fn manifest_class_path( loader: &dyn Loader ) -> Vec<PathBuf> {
	loader.resources( MANIFEST_RESOURCE ).iter()
		.filter_map(| path | match Manifest::read( path ) {
			Ok( manifest ) => Some( manifest ),
			Err( err ) => {
				tracing::debug!( manifest = %path.display(), error = %err, "Skipping unreadable manifest" );
				None
			},
		})
		.flat_map(| manifest | manifest.class_path() )
		.collect()
}
