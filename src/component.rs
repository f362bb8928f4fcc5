//! WebAssembly component guests.
//!
//! A guest compiler may emit each deployable type as a WASM component. The
//! [`ComponentDefiner`] turns such artifacts into [`ComponentType`]s; every
//! instance gets its own wasmtime [`Store`] and drives its lifecycle through
//! the exported [`LIFECYCLE_INTERFACE`] instance:
//!
//! - `init: func()` (optional)
//! - `start: func() -> u32`, `0` meaning success
//! - `stop: func() -> u32` (optional)

use std::sync::Arc ;
use async_trait::async_trait ;
use wasmtime::{ Engine, Store };
use wasmtime::component::{ Component, Func, Instance, Linker, Val };

use crate::{ BinaryArtifact, Deployable, DeploymentContext, InstantiationError, LifecycleError, UnitType };
use crate::artifact_loader::{ DefineError, Definer };
use crate::composite::UnitState ;



/// Name of the exported instance holding the lifecycle functions.
pub const LIFECYCLE_INTERFACE: &str = "deploy:unit/lifecycle" ;

/// Data stored inside each guest's wasmtime [`Store`].
///
/// Host functions added to the definer's [`Linker`] can reach the unit's
/// deployment context through it once `init` has run.
#[derive( Debug, Default )]
pub struct GuestState {
	context: Option<Arc<DeploymentContext>>,
}

impl GuestState {
	#[inline] pub fn context( &self ) -> Option<&Arc<DeploymentContext>> { self.context.as_ref() }
}

/// Defines artifacts as wasmtime components.
///
/// The artifact bytes may be a binary component or its text format.
#[derive( Clone )]
pub struct ComponentDefiner {
	engine: Engine,
	linker: Arc<Linker<GuestState>>,
}

impl ComponentDefiner {

	/// A definer whose guests may not import anything.
	pub fn new( engine: &Engine ) -> Self {
		Self { engine: engine.clone(), linker: Arc::new( Linker::new( engine )) }
	}

	/// A definer linking guests against `linker`.
	pub fn with_linker( engine: &Engine, linker: Linker<GuestState> ) -> Self {
		Self { engine: engine.clone(), linker: Arc::new( linker ) }
	}

}

impl Definer for ComponentDefiner {
	fn define( &self, artifact: &BinaryArtifact ) -> Result<Arc<dyn UnitType>, DefineError> {
		let component = Component::new( &self.engine, artifact.bytes() ).map_err( DefineError::InvalidComponent )?;
		Ok( Arc::new( ComponentType {
			name: artifact.name(),
			engine: self.engine.clone(),
			linker: Arc::clone( &self.linker ),
			component,
		}))
	}
}

impl std::fmt::Debug for ComponentDefiner {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ComponentDefiner" ).finish_non_exhaustive()
	}
}

/// A compiled component ready for instantiation.
pub struct ComponentType {
	name: String,
	engine: Engine,
	linker: Arc<Linker<GuestState>>,
	component: Component,
}

impl UnitType for ComponentType {

	fn name( &self ) -> &str { &self.name }

	fn instantiate( &self ) -> Result<Box<dyn Deployable>, InstantiationError> {
		let mut store = Store::new( &self.engine, GuestState::default() );
		let instance = self.linker.instantiate( &mut store, &self.component )
			.map_err(| err | InstantiationError::constructor( &self.name, err.to_string() ))?;
		let mut unit = ComponentUnit { type_name: self.name.clone(), store, instance, initialized: false };
		if unit.export( "start" ).is_none() {
			return Err( InstantiationError::constructor(
				&self.name,
				format!( "missing export {}#start", LIFECYCLE_INTERFACE ),
			));
		}
		Ok( Box::new( unit ))
	}

}

impl std::fmt::Debug for ComponentType {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ComponentType" )
			.field( "name", &self.name )
			.field( "component", &"<Component>" )
			.finish_non_exhaustive()
	}
}

/// A running component instance.
pub struct ComponentUnit {
	type_name: String,
	store: Store<GuestState>,
	instance: Instance,
	initialized: bool,
}

impl ComponentUnit {

	fn export( &mut self, function_name: &str ) -> Option<Func> {
		let interface_index = self.instance.get_export_index( &mut self.store, None, LIFECYCLE_INTERFACE )?;
		let func_index = self.instance.get_export_index( &mut self.store, Some( &interface_index ), function_name )?;
		self.instance.get_func( &mut self.store, func_index )
	}

	/// Calls `function_name` if exported, returning its single result, if any.
	fn call( &mut self, function_name: &str, returns: bool ) -> Result<Option<Option<Val>>, LifecycleError> {

		let Some( func ) = self.export( function_name ) else { return Ok( None ) };

		let mut buffer = match returns {
			true => vec![ Val::U32( 0 ) ],
			false => Vec::with_capacity( 0 ),
		};
		func.call( &mut self.store, &[], &mut buffer ).map_err( LifecycleError::Trap )?;
		let _ = func.post_return( &mut self.store );

		Ok( Some( buffer.pop() ))

	}

	fn call_status( &mut self, function_name: &str ) -> Result<(), LifecycleError> {
		match self.call( function_name, true )? {
			None | Some( Some( Val::U32( 0 ))) => Ok(()),
			Some( Some( Val::U32( status ))) => Err( LifecycleError::Failed( format!(
				"{} {} returned status {}", self.type_name, function_name, status,
			))),
			Some( other ) => Err( LifecycleError::Failed( format!(
				"{} {} returned {:?}, expected u32", self.type_name, function_name, other,
			))),
		}
	}

}

#[async_trait]
impl Deployable for ComponentUnit {

	fn init( &mut self, context: Arc<DeploymentContext> ) -> Result<(), LifecycleError> {
		if self.initialized {
			return Err( LifecycleError::InvalidState { operation: "init", state: UnitState::Initialized });
		}
		self.store.data_mut().context = Some( context );
		self.call( "init", false )?;
		self.initialized = true ;
		Ok(())
	}

	fn context( &self ) -> Option<&Arc<DeploymentContext>> { self.store.data().context() }

	/// Runs the guest's `start` export to completion on the calling task.
	///
	/// Guest calls never yield, so component children of one
	/// [`CompositeUnit`]( crate::CompositeUnit ) start one after another, and a
	/// start timeout only takes effect once the guest returns.
	async fn start( &mut self ) -> Result<(), LifecycleError> {
		self.call_status( "start" )
	}

	async fn stop( &mut self ) -> Result<(), LifecycleError> {
		self.call_status( "stop" )
	}

}

impl std::fmt::Debug for ComponentUnit {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ComponentUnit" )
			.field( "type_name", &self.type_name )
			.field( "initialized", &self.initialized )
			.finish_non_exhaustive()
	}
}
