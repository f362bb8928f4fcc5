//! Deployment context handed to every unit on `init`.
//!
//! A [`DeploymentContext`] is created by whoever deploys a unit and shared by
//! reference: a [`CompositeUnit`]( crate::CompositeUnit ) forwards the same
//! `Arc` to each of its children. Units exchange side effects through the
//! [`SharedData`] it carries.

use std::collections::{ BTreeMap, HashMap };
use std::sync::{ Arc, PoisonError, RwLock };



/// Per-deployment information and host services available to a unit.
#[derive( Debug, Clone )]
pub struct DeploymentContext {
	deployment_id: String,
	config: BTreeMap<String, String>,
	shared_data: SharedData,
}

impl DeploymentContext {

	/// Creates a context for the deployment identified by `deployment_id`.
	pub fn new( deployment_id: impl Into<String>, shared_data: SharedData ) -> Self {
		Self { deployment_id: deployment_id.into(), config: BTreeMap::new(), shared_data }
	}

	/// Replaces the configuration passed to the unit.
	pub fn with_config( mut self, config: impl IntoIterator<Item = ( String, String )> ) -> Self {
		self.config = config.into_iter().collect();
		self
	}

	#[inline] pub fn deployment_id( &self ) -> &str { &self.deployment_id }
	#[inline] pub fn config( &self ) -> &BTreeMap<String, String> { &self.config }
	#[inline] pub fn config_value( &self, key: &str ) -> Option<&str> { self.config.get( key ).map( String::as_str ) }
	#[inline] pub fn shared_data( &self ) -> &SharedData { &self.shared_data }

}

/// Host-wide named maps shared between deployments.
///
/// Cloning yields another handle onto the same set of maps.
#[derive( Debug, Clone, Default )]
pub struct SharedData {
	maps: Arc<RwLock<HashMap<String, LocalMap>>>,
}

impl SharedData {

	pub fn new() -> Self { Self::default() }

	/// Returns the map registered under `name`, creating it on first use.
	pub fn local_map( &self, name: &str ) -> LocalMap {
		if let Some( map ) = self.maps.read().unwrap_or_else( PoisonError::into_inner ).get( name ) {
			return map.clone();
		}
		self.maps.write()
			.unwrap_or_else( PoisonError::into_inner )
			.entry( name.to_string() )
			.or_default()
			.clone()
	}

}

/// A thread safe `String -> String` map handle. Clones share storage.
#[derive( Debug, Clone, Default )]
pub struct LocalMap {
	entries: Arc<RwLock<HashMap<String, String>>>,
}

impl LocalMap {

	/// Inserts a value, returning the previous one.
	pub fn put( &self, key: impl Into<String>, value: impl Into<String> ) -> Option<String> {
		self.entries.write().unwrap_or_else( PoisonError::into_inner ).insert( key.into(), value.into() )
	}

	pub fn get( &self, key: &str ) -> Option<String> {
		self.entries.read().unwrap_or_else( PoisonError::into_inner ).get( key ).cloned()
	}

	pub fn remove( &self, key: &str ) -> Option<String> {
		self.entries.write().unwrap_or_else( PoisonError::into_inner ).remove( key )
	}

	pub fn len( &self ) -> usize {
		self.entries.read().unwrap_or_else( PoisonError::into_inner ).len()
	}

	pub fn is_empty( &self ) -> bool { self.len() == 0 }

	/// Copies the current entries out of the map.
	pub fn snapshot( &self ) -> HashMap<String, String> {
		self.entries.read().unwrap_or_else( PoisonError::into_inner ).clone()
	}

}
