//! Several discovered units behind one lifecycle handle.
//!
//! A [`CompositeUnit`] fans every lifecycle call out to its children and
//! reports back only once all of them have answered:
//!
//! ```text
//! Created -init-> Initialized -start-> Starting -> Running -stop-> Stopping -> Stopped
//!    |                                    |                                       ^
//!    +----------------> Failed <----------+                                       |
//!                          +-------------------------stop-------------------------+
//! ```
//!
//! - **init** forwards the context to every child. If any child rejects it, the
//! 	composite ends up `Failed` and never forwards `init` again.
//! - **start** runs every child concurrently and waits for all of them. If any
//! 	child fails, the composite ends up `Failed` and reports every failure.
//! - **stop** runs `stop` on every child that started successfully, again
//! 	concurrently. It is best effort: the composite always ends up `Stopped`,
//! 	and child failures are reported together once all children answered.
//! 	It is also accepted in `Starting`, which is where a composite stays when
//! 	its start future was dropped (for instance by a timeout); children that
//! 	finished starting before that are stopped.
//!
//! The child list is fixed at construction. Concurrent lifecycle calls on the
//! same composite must be serialised by the caller.

use std::sync::Arc ;
use async_trait::async_trait ;
use futures::future::join_all ;
use itertools::Itertools ;

use crate::{ Deployable, DeploymentContext };
use crate::deployable::{ ChildFailure, LifecycleError };



/// Lifecycle state of a [`CompositeUnit`].
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum UnitState {
	Created,
	Initialized,
	Starting,
	Running,
	Stopping,
	Stopped,
	/// Reached when a child rejected `init` or failed to start. Only `stop` is allowed.
	Failed,
}

impl std::fmt::Display for UnitState {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.write_str( match self {
			Self::Created => "created",
			Self::Initialized => "initialized",
			Self::Starting => "starting",
			Self::Running => "running",
			Self::Stopping => "stopping",
			Self::Stopped => "stopped",
			Self::Failed => "failed",
		})
	}
}

struct Child {
	type_name: String,
	unit: Box<dyn Deployable>,
	started: bool,
}

/// An aggregate unit owning a fixed, ordered list of children.
pub struct CompositeUnit {
	children: Vec<Child>,
	context: Option<Arc<DeploymentContext>>,
	state: UnitState,
}

impl CompositeUnit {

	/// Wraps `children`, each paired with its type name for diagnostics.
	pub fn new( children: impl IntoIterator<Item = ( String, Box<dyn Deployable> )> ) -> Self {
		Self {
			children: children.into_iter()
				.map(|( type_name, unit )| Child { type_name, unit, started: false })
				.collect(),
			context: None,
			state: UnitState::Created,
		}
	}

	#[inline] pub fn state( &self ) -> UnitState { self.state }

	#[inline] pub fn len( &self ) -> usize { self.children.len() }

	#[inline] pub fn is_empty( &self ) -> bool { self.children.is_empty() }

	/// Type names of the children, in order.
	pub fn child_types( &self ) -> impl Iterator<Item = &str> {
		self.children.iter().map(| child | child.type_name.as_str() )
	}

	fn expect_state( &self, operation: &'static str, allowed: &[UnitState] ) -> Result<(), LifecycleError> {
		match allowed.contains( &self.state ) {
			true => Ok(()),
			false => Err( LifecycleError::InvalidState { operation, state: self.state }),
		}
	}

}

#[async_trait]
impl Deployable for CompositeUnit {

	/// Forwards `context` to every child. Fails fast if called twice.
	fn init( &mut self, context: Arc<DeploymentContext> ) -> Result<(), LifecycleError> {

		self.expect_state( "init", &[ UnitState::Created ])?;

		let total = self.children.len();
		let failures = self.children.iter_mut()
			.enumerate()
			.filter_map(|( index, child )| child.unit.init( Arc::clone( &context ))
				.err()
				.map(| error | ChildFailure { index, type_name: child.type_name.clone(), error })
			)
			.collect::<Vec<_>>();
		if !failures.is_empty() {
			self.state = UnitState::Failed ;
			return Err( LifecycleError::Children { total, failures });
		}

		self.context = Some( context );
		self.state = UnitState::Initialized ;
		Ok(())

	}

	fn context( &self ) -> Option<&Arc<DeploymentContext>> { self.context.as_ref() }

	async fn start( &mut self ) -> Result<(), LifecycleError> {

		self.expect_state( "start", &[ UnitState::Initialized ])?;
		self.state = UnitState::Starting ;

		let total = self.children.len();
		let starting = self.children.iter_mut()
			.enumerate()
			.map(|( index, child )| async move {
				// Set as each child answers, so a start dropped midway still knows what to stop.
				let result = child.unit.start().await ;
				child.started = result.is_ok();
				result.err().map(| error | ChildFailure { index, type_name: child.type_name.clone(), error })
			});
		let failures = join_all( starting ).await.into_iter().flatten().collect::<Vec<_>>();

		match failures.is_empty() {
			true => {
				self.state = UnitState::Running ;
				tracing::info!( children = total, "Composite unit running" );
				Ok(())
			},
			false => {
				self.state = UnitState::Failed ;
				let failed = failures.iter().map(| failure | failure.type_name.as_str() ).join( ", " );
				tracing::warn!( %failed, "Composite unit failed to start" );
				Err( LifecycleError::Children { total, failures })
			},
		}

	}

	async fn stop( &mut self ) -> Result<(), LifecycleError> {

		self.expect_state( "stop", &[ UnitState::Starting, UnitState::Running, UnitState::Failed ])?;
		self.state = UnitState::Stopping ;

		let total = self.children.len();
		let stopping = self.children.iter_mut()
			.enumerate()
			.filter(|( _, child )| child.started )
			.map(| ( index, child )| async move {
				let result = child.unit.stop().await ;
				child.started = false ;
				result.err().map(| error | ChildFailure { index, type_name: child.type_name.clone(), error })
			});
		let failures = join_all( stopping ).await.into_iter().flatten().collect::<Vec<_>>();

		self.state = UnitState::Stopped ;

		match failures.is_empty() {
			true => Ok(()),
			false => {
				failures.iter().for_each(| failure | tracing::warn!( %failure, "Child failed to stop" ));
				Err( LifecycleError::Children { total, failures })
			},
		}

	}

}

impl std::fmt::Debug for CompositeUnit {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "CompositeUnit" )
			.field( "children", &self.child_types().collect::<Vec<_>>() )
			.field( "state", &self.state )
			.finish_non_exhaustive()
	}
}
