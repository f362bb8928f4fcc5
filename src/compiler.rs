//! Compilation of a single unit source against a path set.
//!
//! The guest-language compiler is an opaque capability behind
//! [`CompilerBackend`]: source and classpath in, artifacts and type
//! information out, or diagnostics. [`UnitCompiler`] configures the
//! invocation, routes diagnostics and decides whether the result is usable.

use std::io::Write ;
use std::path::{ Path, PathBuf };
use itertools::Itertools ;
use thiserror::Error ;

use crate::{ BinaryArtifact, PathEntry, SymbolTable };



/// Binary format version the compiler targets unless configured otherwise.
pub const DEFAULT_TARGET_VERSION: &str = "1" ;
/// Module name compiled units are placed in unless configured otherwise.
pub const DEFAULT_MODULE_NAME: &str = "main" ;

#[derive( Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash )]
pub enum Severity { Info, Warning, Error }

impl std::fmt::Display for Severity {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.write_str( match self {
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "error",
		})
	}
}

/// Where in a source file a diagnostic points.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct SourceSpan {
	pub path: PathBuf,
	pub line: u32,
	pub column: u32,
}

/// A message produced by the compiler.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Diagnostic {
	pub severity: Severity,
	pub message: String,
	pub location: Option<SourceSpan>,
}

impl Diagnostic {

	pub fn new( severity: Severity, message: impl Into<String> ) -> Self {
		Self { severity, message: message.into(), location: None }
	}

	pub fn error( message: impl Into<String> ) -> Self { Self::new( Severity::Error, message ) }
	pub fn warning( message: impl Into<String> ) -> Self { Self::new( Severity::Warning, message ) }

	pub fn at( mut self, path: impl Into<PathBuf>, line: u32, column: u32 ) -> Self {
		self.location = Some( SourceSpan { path: path.into(), line, column });
		self
	}

	#[inline] pub fn is_error( &self ) -> bool { self.severity == Severity::Error }

}

impl std::fmt::Display for Diagnostic {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		if let Some( span ) = &self.location {
			write!( f, "{}:{}:{}: ", span.path.display(), span.line, span.column )?;
		}
		write!( f, "{}: {}", self.severity, self.message )
	}
}

/// Receives every diagnostic of a compilation as it is reported.
pub trait DiagnosticSink: Send + Sync {
	fn report( &self, diagnostic: &Diagnostic );
}

/// Renders diagnostics with full paths to standard error.
#[derive( Debug, Clone, Copy, Default )]
pub struct StderrSink ;

impl DiagnosticSink for StderrSink {
	fn report( &self, diagnostic: &Diagnostic ) {
		let _ = writeln!( std::io::stderr().lock(), "{}", diagnostic );
	}
}

/// Discards diagnostics; they still reach `tracing` and [`CompileError`].
#[derive( Debug, Clone, Copy, Default )]
pub struct SilentSink ;

impl DiagnosticSink for SilentSink {
	fn report( &self, _: &Diagnostic ) {}
}

/// Diagnostics reported during one backend call.
///
/// Forwards each diagnostic to the configured sink and keeps a copy.
pub struct Diagnostics<'a> {
	sink: &'a dyn DiagnosticSink,
	collected: Vec<Diagnostic>,
}

impl<'a> Diagnostics<'a> {

	pub fn new( sink: &'a dyn DiagnosticSink ) -> Self {
		Self { sink, collected: Vec::new() }
	}

	pub fn report( &mut self, diagnostic: Diagnostic ) {
		match diagnostic.severity {
			Severity::Error => tracing::error!( %diagnostic, "Compiler diagnostic" ),
			Severity::Warning => tracing::warn!( %diagnostic, "Compiler diagnostic" ),
			Severity::Info => tracing::debug!( %diagnostic, "Compiler diagnostic" ),
		}
		self.sink.report( &diagnostic );
		self.collected.push( diagnostic );
	}

	pub fn has_errors( &self ) -> bool { self.collected.iter().any( Diagnostic::is_error ) }

	pub fn collected( &self ) -> &[Diagnostic] { &self.collected }

	pub fn into_vec( self ) -> Vec<Diagnostic> { self.collected }

}

/// Everything a backend needs for one compilation.
#[derive( Debug, Clone, Copy )]
pub struct CompilerInvocation<'a> {
	/// The sole compilation input.
	pub source: &'a Path,
	/// Binary search roots.
	pub class_path: &'a [PathEntry],
	pub target_version: &'a str,
	pub module_name: &'a str,
}

/// What a backend produced.
#[derive( Debug, Clone, Default )]
pub struct BackendOutput {
	/// Artifacts in emission order.
	pub artifacts: Vec<BinaryArtifact>,
	/// Declared supertypes of classpath types the produced hierarchy passes through.
	pub external_types: Vec<( String, Vec<String> )>,
}

/// An opaque guest-language compiler.
pub trait CompilerBackend: Send + Sync {

	/// Compiles `invocation.source`, reporting diagnostics as they appear.
	///
	/// `Ok( None )` means the compiler declined to produce output.
	///
	/// # Errors
	/// Returns an error only if the compiler itself could not be run.
	fn compile(
		&self,
		invocation: &CompilerInvocation<'_>,
		diagnostics: &mut Diagnostics<'_>,
	) -> Result<Option<BackendOutput>, std::io::Error> ;

}

#[derive( Debug, Error )]
pub enum CompileError {
	/// The compiler reported errors; no output is exposed.
	#[error( "Compilation of {} failed:\n{}", .path.display(), .diagnostics.iter().filter(| d | d.is_error() ).join( "\n" ))]
	Diagnostics { path: PathBuf, diagnostics: Vec<Diagnostic> },
	/// The compiler produced no output without reporting an error.
	#[error( "Compiler produced no output for {}", .0.display() )] NoOutput( PathBuf ),
	/// The compiler could not be run.
	#[error( "Failed to run compiler: {0}" )] Backend( #[from] std::io::Error ),
}

impl CompileError {
	/// Every diagnostic reported by the failed compilation.
	pub fn diagnostics( &self ) -> &[Diagnostic] {
		match self {
			Self::Diagnostics { diagnostics, .. } => diagnostics,
			Self::NoOutput( _ ) | Self::Backend( _ ) => &[],
		}
	}
}

/// The successful result of a compilation.
#[derive( Debug, Clone )]
pub struct CompileOutput {
	pub artifacts: Vec<BinaryArtifact>,
	pub symbols: SymbolTable,
	/// Warnings and notes reported along the way.
	pub diagnostics: Vec<Diagnostic>,
}

/// Runs a [`CompilerBackend`] with fixed settings and a diagnostics sink.
pub struct UnitCompiler {
	backend: Box<dyn CompilerBackend>,
	sink: Box<dyn DiagnosticSink>,
	target_version: String,
	module_name: String,
}

impl UnitCompiler {

	/// Wraps `backend` with the default target version, module name and a
	/// [`StderrSink`].
	pub fn new( backend: impl CompilerBackend + 'static ) -> Self {
		Self {
			backend: Box::new( backend ),
			sink: Box::new( StderrSink ),
			target_version: DEFAULT_TARGET_VERSION.to_string(),
			module_name: DEFAULT_MODULE_NAME.to_string(),
		}
	}

	pub fn with_sink( mut self, sink: impl DiagnosticSink + 'static ) -> Self {
		self.sink = Box::new( sink );
		self
	}

	pub fn with_target_version( mut self, version: impl Into<String> ) -> Self {
		self.target_version = version.into();
		self
	}

	pub fn with_module_name( mut self, name: impl Into<String> ) -> Self {
		self.module_name = name.into();
		self
	}

	#[inline] pub fn target_version( &self ) -> &str { &self.target_version }
	#[inline] pub fn module_name( &self ) -> &str { &self.module_name }

	/// Compiles `source` against `class_path`. Blocks until the backend is done.
	///
	/// # Errors
	/// Returns [`CompileError`] if any error diagnostic was reported, the
	/// backend declined to produce output, or it could not be run.
	pub fn compile( &self, source: &Path, class_path: &[PathEntry] ) -> Result<CompileOutput, CompileError> {

		let invocation = CompilerInvocation {
			source,
			class_path,
			target_version: &self.target_version,
			module_name: &self.module_name,
		};
		let mut diagnostics = Diagnostics::new( self.sink.as_ref() );

		tracing::info!( source = %source.display(), class_path = class_path.len(), "Compiling unit" );
		let output = self.backend.compile( &invocation, &mut diagnostics )?;

		if diagnostics.has_errors() {
			return Err( CompileError::Diagnostics { path: source.to_path_buf(), diagnostics: diagnostics.into_vec() });
		}
		let output = output.ok_or_else(|| CompileError::NoOutput( source.to_path_buf() ))?;

		let symbols = SymbolTable::new( &output.artifacts, output.external_types );
		tracing::info!( source = %source.display(), artifacts = output.artifacts.len(), "Compiled unit" );

		Ok( CompileOutput { artifacts: output.artifacts, symbols, diagnostics: diagnostics.into_vec() })

	}

}

impl std::fmt::Debug for UnitCompiler {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "UnitCompiler" )
			.field( "backend", &"<CompilerBackend>" )
			.field( "target_version", &self.target_version )
			.field( "module_name", &self.module_name )
			.finish_non_exhaustive()
	}
}
