//! JAR-style manifest parsing for auxiliary class-path declarations.

use std::collections::HashMap ;
use std::path::{ Path, PathBuf };
use thiserror::Error ;
use url::Url ;



/// Resource name under which loaders expose manifests.
pub const MANIFEST_RESOURCE: &str = "META-INF/MANIFEST.MF" ;

const CLASS_PATH_ATTRIBUTE: &str = "Class-Path" ;

#[derive( Debug, Error )]
pub enum ManifestError {
	#[error( "IO error: {0}" )] Io( #[from] std::io::Error ),
	#[error( "Malformed manifest line {line}: {content:?}" )] MalformedLine { line: usize, content: String },
}

/// The main section of a manifest.
///
/// Attribute names are case-insensitive. Continuation lines (a single leading
/// space) are folded into the preceding attribute. Parsing stops at the first
/// blank line; per-entry sections are not read.
#[derive( Debug, Clone, Default )]
pub struct Manifest {
	attributes: HashMap<String, String>,
	origin: Option<PathBuf>,
}

impl Manifest {

	/// Reads the manifest at `path`. Its origin is the directory holding `META-INF/`.
	///
	/// # Errors
	/// Fails if the file can't be read or a line isn't a `Name: value` pair.
	pub fn read( path: &Path ) -> Result<Self, ManifestError> {
		let text = std::fs::read_to_string( path )?;
		let mut manifest = Self::parse( &text )?;
		manifest.origin = path.parent().and_then( Path::parent ).map( Path::to_path_buf );
		Ok( manifest )
	}

	/// Parses manifest text with no known origin.
	///
	/// # Errors
	/// Fails if a line isn't a `Name: value` pair.
	pub fn parse( text: &str ) -> Result<Self, ManifestError> {

		let mut attributes = HashMap::new();
		let mut current: Option<( String, String )> = None ;

		for ( index, line ) in text.lines().enumerate() {
			if line.is_empty() { break }
			if let Some( continuation ) = line.strip_prefix( ' ' ) {
				match current.as_mut() {
					Some(( _, value )) => value.push_str( continuation ),
					None => return Err( ManifestError::MalformedLine { line: index + 1, content: line.to_string() }),
				}
				continue ;
			}
			if let Some(( name, value )) = current.take() { attributes.insert( name, value ); }
			let ( name, value ) = line.split_once( ':' )
				.filter(|( name, _ )| !name.is_empty() && !name.contains( char::is_whitespace ))
				.ok_or_else(|| ManifestError::MalformedLine { line: index + 1, content: line.to_string() })?;
			current = Some(( name.to_ascii_lowercase(), value.strip_prefix( ' ' ).unwrap_or( value ).to_string() ));
		}
		if let Some(( name, value )) = current { attributes.insert( name, value ); }

		Ok( Self { attributes, origin: None })

	}

	pub fn attribute( &self, name: &str ) -> Option<&str> {
		self.attributes.get( &name.to_ascii_lowercase() ).map( String::as_str )
	}

	/// Directory relative references resolve against.
	pub fn origin( &self ) -> Option<&Path> { self.origin.as_deref() }

	/// The `Class-Path` references, resolved to filesystem paths.
	///
	/// Entries that are not `file:` URIs or plain paths are skipped, as are
	/// relative entries when the manifest has no origin.
	pub fn class_path( &self ) -> Vec<PathBuf> {
		self.attribute( CLASS_PATH_ATTRIBUTE )
			.map(| value | value.split( ' ' )
				.filter(| entry | !entry.trim().is_empty() )
				.filter_map(| entry | resolve_reference( entry.trim(), self.origin() ))
				.collect()
			)
			.unwrap_or_default()
	}

}

fn resolve_reference( reference: &str, origin: Option<&Path> ) -> Option<PathBuf> {

	// Rooted references still resolve without an origin.
	let base = match origin {
		Some( origin ) => std::path::absolute( origin ).ok().and_then(| origin | Url::from_directory_path( origin ).ok() ),
		None if reference.starts_with( '/' ) => Url::from_directory_path( "/" ).ok(),
		None => None,
	};

	match Url::options().base_url( base.as_ref() ).parse( reference ) {
		Ok( url ) if url.scheme() == "file" => url.to_file_path()
			.inspect_err(| _ | tracing::debug!( reference, "Skipping class-path reference naming a remote host" ))
			.ok(),
		// Single letters are drive prefixes, not schemes.
		Ok( url ) if url.scheme().len() == 1 => {
			let path = PathBuf::from( reference );
			match path.is_absolute() {
				true => Some( path ),
				false => origin.map(| origin | origin.join( path )),
			}
		},
		Ok( _ ) => {
			tracing::debug!( reference, "Skipping class-path reference with unsupported scheme" );
			None
		},
		Err( err ) => {
			tracing::debug!( reference, %err, "Skipping unresolvable class-path reference" );
			None
		},
	}

}
