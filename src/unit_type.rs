//! Type descriptors: loaded types that can be turned into unit instances.
//!
//! A [`UnitType`] is what a [`Loader`]( crate::Loader ) hands out for a
//! fully-qualified name. It knows how to build a fresh instance through its
//! no-argument constructor and nothing else; no reflection is involved.

use std::collections::HashMap ;
use std::sync::Arc ;
use thiserror::Error ;

use crate::Deployable ;
use crate::artifact_loader::LoadError ;



/// A loaded type able to construct [`Deployable`] instances.
pub trait UnitType: Send + Sync {

	/// Fully-qualified name of the type.
	fn name( &self ) -> &str ;

	/// Runs the type's no-argument constructor.
	///
	/// # Errors
	/// Returns an [`InstantiationError`] if construction fails.
	fn instantiate( &self ) -> Result<Box<dyn Deployable>, InstantiationError> ;

}

impl std::fmt::Debug for dyn UnitType {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "UnitType({})", self.name() )
	}
}

/// Construction of a discovered type failed.
#[derive( Debug, Error )]
pub enum InstantiationError {
	/// The type could not be loaded or defined.
	#[error( "Failed to load {0}" )] Load( #[from] LoadError ),
	/// The constructor reported a failure.
	#[error( "Constructor of {type_name} failed: {reason}" )]
	Constructor { type_name: String, reason: Box<dyn std::error::Error + Send + Sync> },
}

impl InstantiationError {
	pub fn constructor( type_name: impl Into<String>, reason: impl Into<Box<dyn std::error::Error + Send + Sync>> ) -> Self {
		Self::Constructor { type_name: type_name.into(), reason: reason.into() }
	}
}

type Constructor = dyn Fn() -> Result<Box<dyn Deployable>, InstantiationError> + Send + Sync ;

/// A host-native type built from a Rust closure.
pub struct NativeType {
	name: String,
	constructor: Box<Constructor>,
}

impl NativeType {

	pub fn new<F>( name: impl Into<String>, constructor: F ) -> Self
	where
		F: Fn() -> Result<Box<dyn Deployable>, InstantiationError> + Send + Sync + 'static,
	{
		Self { name: name.into(), constructor: Box::new( constructor ) }
	}

}

impl UnitType for NativeType {
	fn name( &self ) -> &str { &self.name }
	fn instantiate( &self ) -> Result<Box<dyn Deployable>, InstantiationError> { ( self.constructor )() }
}

impl std::fmt::Debug for NativeType {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "NativeType" )
			.field( "name", &self.name )
			.field( "constructor", &"<closure>" )
			.finish()
	}
}

/// Name-indexed collection of types owned by one loader or definer.
#[derive( Clone, Default )]
pub struct TypeRegistry {
	types: HashMap<String, Arc<dyn UnitType>>,
}

impl TypeRegistry {

	pub fn new() -> Self { Self::default() }

	/// Registers `unit_type` under its own name, replacing any previous entry.
	pub fn register( &mut self, unit_type: Arc<dyn UnitType> ) {
		self.types.insert( unit_type.name().to_string(), unit_type );
	}

	/// Builder form of [`register`]( Self::register ) for a native constructor.
	pub fn with<F>( mut self, name: impl Into<String>, constructor: F ) -> Self
	where
		F: Fn() -> Result<Box<dyn Deployable>, InstantiationError> + Send + Sync + 'static,
	{
		self.register( Arc::new( NativeType::new( name, constructor )));
		self
	}

	pub fn get( &self, name: &str ) -> Option<Arc<dyn UnitType>> { self.types.get( name ).cloned() }
	pub fn contains( &self, name: &str ) -> bool { self.types.contains_key( name ) }
	pub fn len( &self ) -> usize { self.types.len() }
	pub fn is_empty( &self ) -> bool { self.types.is_empty() }

}

impl std::fmt::Debug for TypeRegistry {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_set().entries( self.types.keys() ).finish()
	}
}
