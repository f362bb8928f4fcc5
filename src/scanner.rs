//! Discovery of compiled types that satisfy a capability contract.

use std::collections::HashSet ;

use crate::{ BinaryArtifact, SymbolTable };



/// A compiled type that passed the scanner's predicate.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub struct DiscoveredType {
	/// Binary name, as loadable from the compilation's artifact loader.
	pub name: String,
	/// The name the symbol table knows the type under.
	pub symbol: String,
}

/// Finds the artifacts whose supertype closure contains a target type.
#[derive( Debug, Clone )]
pub struct CapabilityScanner {
	target: String,
}

impl CapabilityScanner {

	pub fn new( target: impl Into<String> ) -> Self { Self { target: target.into() }}

	#[inline] pub fn target( &self ) -> &str { &self.target }

	/// Artifacts implementing the target, directly or through any number of
	/// intermediate supertypes.
	///
	/// Results follow the artifacts' emission order with duplicates removed.
	/// An empty result is not an error.
	pub fn scan( &self, symbols: &SymbolTable, artifacts: &[BinaryArtifact] ) -> Vec<DiscoveredType> {
		let discovered = scan_with( symbols, artifacts, | symbols, symbol | symbols.is_subtype_of( symbol, &self.target ));
		tracing::debug!( capability = %self.target, discovered = discovered.len(), "Scanned compiled types" );
		discovered
	}

}

/// Scans `artifacts` with an arbitrary predicate over the symbol table.
///
/// Artifacts the symbol table doesn't describe are skipped.
pub fn scan_with(
	symbols: &SymbolTable,
	artifacts: &[BinaryArtifact],
	predicate: impl Fn( &SymbolTable, &str ) -> bool,
) -> Vec<DiscoveredType> {

	let mut seen = HashSet::new();

	artifacts.iter()
		.map( BinaryArtifact::name )
		.filter(| name | seen.insert( name.clone() ))
		.filter_map(| name | match symbols.lookup( &name ) {
			Some( symbol ) => Some( DiscoveredType { symbol: symbol.to_string(), name }),
			None => {
				tracing::debug!( name = %name, "No symbol information for compiled type" );
				None
			},
		})
		.filter(| discovered | predicate( symbols, &discovered.symbol ))
		.collect()

}
