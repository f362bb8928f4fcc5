//! A [`CompilerBackend`] running an external compiler executable.
//!
//! The executable is invoked as
//!
//! ```text
//! <program> [args..] --target <version> --module-name <name> \
//!     --classpath <entries joined with the platform separator> \
//!     --out-dir <fresh temporary directory> <source>
//! ```
//!
//! Every line it writes to standard error becomes a diagnostic
//! (`[path:line:col: ]error|warning|note: message`). On success the output
//! directory must contain an `index.json`:
//!
//! ```json
//! {
//!   "types": [ { "path": "demo/Unit.wasm", "supertypes": [ "deploy.Deployable" ] } ],
//!   "external": { "lib.Base": [ "deploy.Deployable" ] }
//! }
//! ```
//!
//! `types` lists the produced artifacts in emission order, relative to the
//! output directory. The directory is deleted once the artifacts are read.

use std::collections::BTreeMap ;
use std::io ;
use std::path::{ Component, Path, PathBuf };
use std::process::Command ;
use serde::Deserialize ;

use crate::{ BinaryArtifact, PathEntry };
use crate::compiler::{ BackendOutput, CompilerBackend, CompilerInvocation, Diagnostic, Diagnostics, Severity };



/// Name of the index file the compiler writes into its output directory.
pub const INDEX_FILE: &str = "index.json" ;

const SEVERITY_MARKERS: [( &str, Severity ); 4] = [
	( "error: ", Severity::Error ),
	( "warning: ", Severity::Warning ),
	( "note: ", Severity::Info ),
	( "info: ", Severity::Info ),
];

#[derive( Debug, Deserialize )]
struct Index {
	#[serde( default )] types: Vec<IndexEntry>,
	#[serde( default )] external: BTreeMap<String, Vec<String>>,
}

#[derive( Debug, Deserialize )]
struct IndexEntry {
	path: String,
	#[serde( default )] supertypes: Vec<String>,
}

/// Runs an external compiler executable per compilation.
#[derive( Debug, Clone )]
pub struct CommandBackend {
	program: PathBuf,
	args: Vec<String>,
}

impl CommandBackend {

	pub fn new( program: impl Into<PathBuf> ) -> Self {
		Self { program: program.into(), args: Vec::new() }
	}

	/// Arguments placed before the generated ones.
	pub fn with_args( mut self, args: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.args = args.into_iter().map( Into::into ).collect();
		self
	}

	fn read_output( out_dir: &Path ) -> Result<Option<BackendOutput>, io::Error> {

		let index_path = out_dir.join( INDEX_FILE );
		if !index_path.is_file() { return Ok( None ) }

		let index = serde_json::from_slice::<Index>( &std::fs::read( &index_path )? )
			.map_err(| err | io::Error::new( io::ErrorKind::InvalidData, err ))?;

		let artifacts = index.types.into_iter()
			.map(| entry | {
				let relative = Path::new( &entry.path );
				if !relative.components().all(| component | matches!( component, Component::Normal( _ ))) {
					return Err( io::Error::new(
						io::ErrorKind::InvalidData,
						format!( "artifact path {:?} escapes the output directory", entry.path ),
					));
				}
				let bytes = std::fs::read( out_dir.join( relative ))?;
				Ok( BinaryArtifact::new( entry.path, bytes, entry.supertypes ))
			})
			.collect::<Result<Vec<_>, io::Error>>()?;

		Ok( Some( BackendOutput { artifacts, external_types: index.external.into_iter().collect() }))

	}

}

impl CompilerBackend for CommandBackend {

	fn compile(
		&self,
		invocation: &CompilerInvocation<'_>,
		diagnostics: &mut Diagnostics<'_>,
	) -> Result<Option<BackendOutput>, io::Error> {

		let out_dir = tempfile::Builder::new().prefix( "deploy-link-" ).tempdir()?;
		let class_path = std::env::join_paths( invocation.class_path.iter().map( PathEntry::path ))
			.map_err(| err | io::Error::new( io::ErrorKind::InvalidInput, err ))?;

		tracing::debug!( program = %self.program.display(), out_dir = %out_dir.path().display(), "Running compiler" );
		let output = Command::new( &self.program )
			.args( &self.args )
			.arg( "--target" ).arg( invocation.target_version )
			.arg( "--module-name" ).arg( invocation.module_name )
			.arg( "--classpath" ).arg( &class_path )
			.arg( "--out-dir" ).arg( out_dir.path() )
			.arg( invocation.source )
			.output()?;

		String::from_utf8_lossy( &output.stderr ).lines()
			.filter_map( parse_diagnostic )
			.for_each(| diagnostic | diagnostics.report( diagnostic ));

		if !output.status.success() {
			if !diagnostics.has_errors() {
				diagnostics.report( Diagnostic::error( format!(
					"compiler {} exited with {}", self.program.display(), output.status,
				)));
			}
			return Ok( None );
		}

		Self::read_output( out_dir.path() )

	}

}

/// Parses one line of compiler output. Unrecognised lines become notes.
fn parse_diagnostic( line: &str ) -> Option<Diagnostic> {

	if line.trim().is_empty() { return None }

	for ( marker, severity ) in SEVERITY_MARKERS {
		if let Some( message ) = line.strip_prefix( marker ) {
			return Some( Diagnostic::new( severity, message ));
		}
		if let Some(( location, message )) = line.split_once( &format!( ": {}", marker )) {
			return Some( match parse_location( location ) {
				Some(( path, row, column )) => Diagnostic::new( severity, message ).at( path, row, column ),
				None => Diagnostic::new( severity, format!( "{}: {}", location, message )),
			});
		}
	}

	Some( Diagnostic::new( Severity::Info, line ))

}

fn parse_location( location: &str ) -> Option<( PathBuf, u32, u32 )> {
	let ( rest, column ) = location.rsplit_once( ':' )?;
	let ( path, row ) = rest.rsplit_once( ':' )?;
	Some(( PathBuf::from( path ), row.trim().parse().ok()?, column.trim().parse().ok()? ))
}
