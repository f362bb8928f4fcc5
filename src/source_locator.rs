//! Resolution of logical unit names to source files.

use std::path::{ Path, PathBuf };
use thiserror::Error ;

use crate::Loader ;



/// No source could be found for a logical unit name.
#[derive( Debug, Error )]
#[error( "Cannot find unit source: {name} on the loader path or in {dir}", dir = .working_dir.display() )]
pub struct SourceNotFound {
	/// The name as requested, prefix included.
	pub name: String,
	pub working_dir: PathBuf,
}

/// Removes a factory-selecting `prefix:` from `name`, if it has one.
///
/// A prefix is a run of at least two ASCII alphanumerics, `-` or `_`
/// followed by `:`. Single letters are left alone so drive-qualified paths
/// survive.
pub fn strip_prefix( name: &str ) -> &str {
	split_prefix( name ).map_or( name, |( _, rest )| rest )
}

/// Splits `name` into its factory-selecting prefix and the remainder.
pub fn split_prefix( name: &str ) -> Option<( &str, &str )> {
	name.split_once( ':' )
		.filter(|( prefix, _ )| prefix.len() > 1 && prefix.chars().all(| c | c.is_ascii_alphanumeric() || c == '-' || c == '_' ))
}

/// Finds the source file behind a logical unit name.
///
/// Loader-visible resources win over files in the working directory.
#[derive( Debug, Clone, Default )]
pub struct SourceLocator {
	working_dir: Option<PathBuf>,
}

impl SourceLocator {

	pub fn new() -> Self { Self::default() }

	/// Resolves relative filesystem names against `dir` instead of the
	/// process working directory.
	pub fn with_working_dir( mut self, dir: impl Into<PathBuf> ) -> Self {
		self.working_dir = Some( dir.into() );
		self
	}

	/// Resolves `name` to an existing source file.
	///
	/// # Errors
	/// Returns [`SourceNotFound`] naming the original `name` if neither the
	/// loader nor the filesystem has it.
	pub fn resolve( &self, name: &str, loader: &dyn Loader ) -> Result<PathBuf, SourceNotFound> {

		let resource_name = strip_prefix( name );
		let working_dir = self.working_dir();

		if let Some( resource ) = loader.resource( resource_name ) {
			tracing::debug!( name, resource = %resource.display(), "Resolved unit source through loader" );
			return Ok( resource );
		}

		let candidate = Path::new( resource_name );
		let candidate = match candidate.is_absolute() {
			true => candidate.to_path_buf(),
			false => working_dir.join( candidate ),
		};
		if candidate.is_file() {
			tracing::debug!( name, file = %candidate.display(), "Resolved unit source from filesystem" );
			return Ok( candidate );
		}

		Err( SourceNotFound { name: name.to_string(), working_dir })

	}

	fn working_dir( &self ) -> PathBuf {
		self.working_dir.clone()
			.or_else(|| std::env::current_dir().ok() )
			.unwrap_or_default()
	}

}
