//! The lifecycle contract every deployable unit implements.

use std::sync::Arc ;
use async_trait::async_trait ;
use itertools::Itertools ;
use thiserror::Error ;

use crate::DeploymentContext ;
use crate::composite::UnitState ;



/// Fully-qualified name of the lifecycle contract as it appears in compiled
/// symbol tables. Types whose supertype closure contains this name are
/// deployable.
pub const DEPLOYABLE_TYPE: &str = "deploy.Deployable" ;

/// A runtime component with a three-phase lifecycle managed by a host.
///
/// `init` binds the unit to its [`DeploymentContext`]; `start` and `stop`
/// resolve once the unit has finished the corresponding transition. The
/// returned `Result` is the unit's completion signal.
#[async_trait]
pub trait Deployable: Send {

	/// Binds the unit to `context`. Called exactly once, before `start`.
	///
	/// # Errors
	/// Implementations reject a second call and may fail their own setup.
	fn init( &mut self, context: Arc<DeploymentContext> ) -> Result<(), LifecycleError> ;

	/// The context bound by `init`, if any.
	fn context( &self ) -> Option<&Arc<DeploymentContext>> ;

	/// Starts the unit.
	///
	/// # Errors
	/// Returns the failure the unit reported while starting.
	async fn start( &mut self ) -> Result<(), LifecycleError> ;

	/// Stops the unit.
	///
	/// # Errors
	/// Returns the failure the unit reported while stopping.
	async fn stop( &mut self ) -> Result<(), LifecycleError> ;

}

/// Failures reported through a unit's lifecycle.
#[derive( Debug, Error )]
pub enum LifecycleError {
	/// The requested transition is not allowed from the unit's current state.
	#[error( "Cannot {operation} a unit that is {state}" )]
	InvalidState { operation: &'static str, state: UnitState },
	/// The unit reported a failure.
	#[error( "Unit failed: {0}" )] Failed( String ),
	/// Guest code trapped while running a lifecycle export.
	#[error( "Guest trapped: {0}" )] Trap( wasmtime::Error ),
	/// One or more children of a composite failed.
	#[error( "{} of {} children failed: {}", failures.len(), total, failures.iter().join( "; " ))]
	Children { total: usize, failures: Vec<ChildFailure> },
}

/// One failing child of a composite unit.
#[derive( Debug, Error )]
#[error( "#{index} ({type_name}): {error}" )]
pub struct ChildFailure {
	/// Position of the child in the composite.
	pub index: usize,
	/// Fully-qualified name of the child's type.
	pub type_name: String,
	pub error: LifecycleError,
}
