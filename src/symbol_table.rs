//! Compiled artifacts and the symbol table describing their type hierarchy.

use std::collections::{ HashMap, HashSet, VecDeque };
use std::sync::Arc ;



/// One compiled type held in memory.
///
/// The artifact's fully-qualified name is derived from its relative path:
/// `demo/Outer$Inner.bin` names `demo.Outer$Inner`.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct BinaryArtifact {
	relative_path: String,
	bytes: Arc<[u8]>,
	supertypes: Vec<String>,
}

impl BinaryArtifact {

	pub fn new(
		relative_path: impl Into<String>,
		bytes: impl Into<Arc<[u8]>>,
		supertypes: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		Self {
			relative_path: relative_path.into(),
			bytes: bytes.into(),
			supertypes: supertypes.into_iter().map( Into::into ).collect(),
		}
	}

	/// Path of the artifact relative to the compiler's output root.
	#[inline] pub fn relative_path( &self ) -> &str { &self.relative_path }

	/// The compiled binary representation.
	#[inline] pub fn bytes( &self ) -> &[u8] { &self.bytes }

	/// Shared handle to the binary representation.
	#[inline] pub fn shared_bytes( &self ) -> Arc<[u8]> { Arc::clone( &self.bytes ) }

	/// Supertypes the type declares directly.
	#[inline] pub fn supertypes( &self ) -> &[String] { &self.supertypes }

	/// Fully-qualified (binary) name of the type.
	pub fn name( &self ) -> String {
		let path = self.relative_path.replace( '\\', "/" );
		let path = path.trim_start_matches( '/' );
		let ( package, file ) = path.rsplit_once( '/' ).unwrap_or(( "", path ));
		let stem = match file.rsplit_once( '.' ) {
			Some(( stem, _ )) if !stem.is_empty() => stem,
			_ => file,
		};
		match package.is_empty() {
			true => stem.to_string(),
			false => format!( "{}.{}", package.replace( '/', "." ), stem ),
		}
	}

}

/// Fully-qualified type name -> supertype closure, for one compilation.
///
/// Built from the directly declared supertypes of every produced artifact plus
/// any types the compiler resolved from the classpath. Read only once built.
#[derive( Debug, Clone, Default )]
pub struct SymbolTable {
	declared: HashMap<String, Vec<String>>,
}

impl SymbolTable {

	/// Builds a table from the artifacts of one compilation and the external
	/// types their hierarchy passes through.
	pub fn new<'a>(
		artifacts: impl IntoIterator<Item = &'a BinaryArtifact>,
		external: impl IntoIterator<Item = ( String, Vec<String> )>,
	) -> Self {
		let mut declared = external.into_iter().collect::<HashMap<_, _>>();
		declared.extend( artifacts.into_iter().map(| artifact | ( artifact.name(), artifact.supertypes().to_vec() )));
		Self { declared }
	}

	/// Resolves a binary name to the name the table knows it under.
	///
	/// Nested types may be reported by their binary name (`Outer$Inner`) or
	/// their source name (`Outer.Inner`); both are accepted.
	pub fn lookup<'a>( &'a self, name: &str ) -> Option<&'a str> {
		self.declared.get_key_value( name )
			.or_else(|| self.declared.get_key_value( &name.replace( '$', "." )))
			.map(|( key, _ )| key.as_str() )
	}

	pub fn contains( &self, name: &str ) -> bool { self.lookup( name ).is_some() }

	/// Directly declared supertypes of `name`.
	pub fn declared_supertypes( &self, name: &str ) -> Option<&[String]> {
		self.lookup( name ).and_then(| key | self.declared.get( key )).map( Vec::as_slice )
	}

	/// Every type `name` inherits from, directly or transitively, in
	/// breadth-first order. `None` if `name` is unknown.
	pub fn supertypes( &self, name: &str ) -> Option<Vec<String>> {

		let direct = self.declared_supertypes( name )?;
		let mut seen = HashSet::new();
		let mut closure = Vec::new();
		let mut queue = direct.iter().collect::<VecDeque<_>>();

		while let Some( supertype ) = queue.pop_front() {
			if !seen.insert( supertype.as_str() ) { continue }
			closure.push( supertype.clone() );
			if let Some( next ) = self.declared_supertypes( supertype ) {
				queue.extend( next.iter() );
			}
		}

		Some( closure )

	}

	/// Whether `target` is in the supertype closure of `name`.
	pub fn is_subtype_of( &self, name: &str, target: &str ) -> bool {
		self.supertypes( name ).is_some_and(| closure | closure.iter().any(| supertype | supertype == target ))
	}

	pub fn len( &self ) -> usize { self.declared.len() }
	pub fn is_empty( &self ) -> bool { self.declared.is_empty() }

}
