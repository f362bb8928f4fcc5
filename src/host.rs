//! Deploying units by name.
//!
//! A [`Host`] picks a [`UnitFactory`] for a logical name, creates the unit off
//! the async runtime, drives it through `init` and `start`, and keeps it
//! until it is undeployed.
//!
//! Factory selection looks at an explicit `prefix:` first (`src:demo/unit.src`)
//! and falls back to the file extension (`demo/unit.src`).

use std::collections::{ BTreeMap, HashMap };
use std::path::Path ;
use std::sync::Arc ;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::Duration ;
use itertools::Itertools ;
use thiserror::Error ;
use tokio::sync::Mutex ;

use crate::{ CreateError, Deployable, DeployableFactory, DeploymentContext, LifecycleError, Loader, SharedData };
use crate::source_locator::{ split_prefix, strip_prefix };



/// Something able to create units for names carrying its prefix.
pub trait UnitFactory: Send + Sync {

	/// The prefix (and file extension) this factory is selected by.
	fn prefix( &self ) -> &str ;

	/// Creates a fresh unit for `name`. May block.
	///
	/// # Errors
	/// See [`CreateError`].
	fn create( &self, name: &str, loader: Arc<dyn Loader> ) -> Result<Box<dyn Deployable>, CreateError> ;

}

impl UnitFactory for DeployableFactory {
	fn prefix( &self ) -> &str { DeployableFactory::prefix( self ) }
	fn create( &self, name: &str, loader: Arc<dyn Loader> ) -> Result<Box<dyn Deployable>, CreateError> {
		DeployableFactory::create( self, name, loader )
	}
}

#[derive( Debug, Error )]
pub enum DeployError {
	#[error( "No factory registered for {0}" )] NoFactory( String ),
	#[error( transparent )] Create( #[from] CreateError ),
	#[error( transparent )] Lifecycle( #[from] LifecycleError ),
	#[error( "{name} did not start within {after:?}" )]
	Timeout { name: String, after: Duration },
	#[error( "Unknown deployment: {0}" )] UnknownDeployment( String ),
	/// The blocking task creating the unit panicked or was cancelled.
	#[error( "Unit creation aborted: {0}" )] Join( #[from] tokio::task::JoinError ),
}

/// Per-deployment settings.
#[derive( Debug, Clone, Default )]
pub struct DeploymentOptions {
	/// Upper bound on `start`. Unbounded if unset.
	pub timeout: Option<Duration>,
	/// Passed to the unit through its [`DeploymentContext`].
	pub config: BTreeMap<String, String>,
}

impl DeploymentOptions {

	pub fn with_timeout( mut self, timeout: Duration ) -> Self {
		self.timeout = Some( timeout );
		self
	}

	pub fn with_config( mut self, key: impl Into<String>, value: impl Into<String> ) -> Self {
		self.config.insert( key.into(), value.into() );
		self
	}

}

struct Deployment {
	sequence: u64,
	unit: Box<dyn Deployable>,
}

/// Owns the live deployments of one process.
pub struct Host {
	loader: Arc<dyn Loader>,
	shared_data: SharedData,
	factories: Vec<Arc<dyn UnitFactory>>,
	deployments: Mutex<HashMap<String, Deployment>>,
	next_id: AtomicU64,
}

impl Host {

	/// A host resolving and compiling units against `loader`.
	pub fn new( loader: Arc<dyn Loader> ) -> Self {
		Self {
			loader,
			shared_data: SharedData::new(),
			factories: Vec::new(),
			deployments: Mutex::new( HashMap::new() ),
			next_id: AtomicU64::new( 1 ),
		}
	}

	/// Uses `shared_data` instead of a private set of maps.
	pub fn with_shared_data( mut self, shared_data: SharedData ) -> Self {
		self.shared_data = shared_data ;
		self
	}

	/// Adds a factory. Earlier registrations win on equal prefixes.
	pub fn register_factory( &mut self, factory: impl UnitFactory + 'static ) {
		self.factories.push( Arc::new( factory ));
	}

	#[inline] pub fn shared_data( &self ) -> &SharedData { &self.shared_data }

	fn select_factory( &self, name: &str ) -> Option<Arc<dyn UnitFactory>> {
		let by_prefix = split_prefix( name )
			.and_then(|( prefix, _ )| self.factories.iter().find(| factory | factory.prefix() == prefix ));
		let by_extension = || Path::new( strip_prefix( name ))
			.extension()
			.and_then(| extension | extension.to_str() )
			.and_then(| extension | self.factories.iter().find(| factory | factory.prefix() == extension ));
		by_prefix.or_else( by_extension ).cloned()
	}

	/// Creates, initialises and starts the unit named `name`.
	///
	/// Returns the new deployment's id. A unit that fails to start, or does
	/// not start in time, is stopped best-effort and discarded.
	///
	/// # Errors
	/// See [`DeployError`].
	pub async fn deploy( &self, name: &str, options: DeploymentOptions ) -> Result<String, DeployError> {

		let factory = self.select_factory( name ).ok_or_else(|| DeployError::NoFactory( name.to_string() ))?;
		let loader = Arc::clone( &self.loader );
		let requested = name.to_string();
		let mut unit = tokio::task::spawn_blocking( move || factory.create( &requested, loader )).await??;

		let sequence = self.next_id.fetch_add( 1, Ordering::Relaxed );
		let id = format!( "deployment-{}", sequence );
		let context = DeploymentContext::new( &id, self.shared_data.clone() ).with_config( options.config );
		unit.init( Arc::new( context ))?;

		let started = match options.timeout {
			Some( after ) => tokio::time::timeout( after, unit.start() ).await
				.map_err(| _ | DeployError::Timeout { name: name.to_string(), after })
				.and_then(| result | result.map_err( DeployError::from )),
			None => unit.start().await.map_err( DeployError::from ),
		};

		if let Err( err ) = started {
			if let Err( stop_err ) = unit.stop().await {
				tracing::warn!( name, %stop_err, "Failed to stop unit after unsuccessful start" );
			}
			return Err( err );
		}

		self.deployments.lock().await.insert( id.clone(), Deployment { sequence, unit });
		tracing::info!( name, id = %id, "Deployed unit" );
		Ok( id )

	}

	/// Stops and removes the deployment `id`.
	///
	/// The deployment is removed even if stopping it fails.
	///
	/// # Errors
	/// [`DeployError::UnknownDeployment`] for an unknown id, otherwise the
	/// unit's stop failure.
	pub async fn undeploy( &self, id: &str ) -> Result<(), DeployError> {
		let Deployment { mut unit, .. } = self.deployments.lock().await
			.remove( id )
			.ok_or_else(|| DeployError::UnknownDeployment( id.to_string() ))?;
		unit.stop().await?;
		tracing::info!( id, "Undeployed unit" );
		Ok(())
	}

	/// Ids of the live deployments, oldest first.
	pub async fn deployment_ids( &self ) -> Vec<String> {
		self.deployments.lock().await.iter()
			.sorted_by_key(|( _, deployment )| deployment.sequence )
			.map(|( id, _ )| id.clone() )
			.collect()
	}

}

impl std::fmt::Debug for Host {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Host" )
			.field( "loader", &self.loader.name() )
			.field( "factories", &self.factories.iter().map(| factory | factory.prefix() ).collect::<Vec<_>>() )
			.finish_non_exhaustive()
	}
}
