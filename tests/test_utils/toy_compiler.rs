mod toy_compiler {

	#![allow( dead_code )]

	use std::path::PathBuf ;
	use std::sync::{ Arc, Mutex };
	use deploy_link::{ BackendOutput, BinaryArtifact, CompilerBackend, CompilerInvocation, Diagnostic, Diagnostics };

	/// Compiles a line based toy language:
	///
	/// - `type a.b.C : Super, Other` emits an artifact for `a.b.C`
	/// - `extern a.Base : Super` declares a type found on the classpath
	/// - `warn message` reports a warning
	/// - `decline` produces no output at all
	/// - blank lines and `//` comments are ignored
	///
	/// Anything else is a syntax error.
	#[derive( Debug, Clone, Default )]
	pub struct ToyBackend {
		class_paths: Arc<Mutex<Vec<Vec<PathBuf>>>>,
	}

	impl ToyBackend {
		/// The classpath of every invocation so far.
		pub fn class_paths( &self ) -> Vec<Vec<PathBuf>> {
			self.class_paths.lock().unwrap().clone()
		}
	}

	impl CompilerBackend for ToyBackend {
		fn compile(
			&self,
			invocation: &CompilerInvocation<'_>,
			diagnostics: &mut Diagnostics<'_>,
		) -> Result<Option<BackendOutput>, std::io::Error> {

			self.class_paths.lock().unwrap()
				.push( invocation.class_path.iter().map(| entry | entry.path().to_path_buf() ).collect() );

			let text = std::fs::read_to_string( invocation.source )?;
			let mut output = BackendOutput::default();

			for ( index, line ) in text.lines().enumerate() {
				let line = line.trim();
				let located = | diagnostic: Diagnostic | diagnostic.at( invocation.source, index as u32 + 1, 1 );
				match line.split_once( ' ' ) {
					_ if line.is_empty() || line.starts_with( "//" ) => {},
					Some(( "type", declaration )) => {
						let ( name, supertypes ) = parse_declaration( declaration );
						output.artifacts.push( BinaryArtifact::new(
							format!( "{}.unit", name.replace( '.', "/" )),
							name.as_bytes().to_vec(),
							supertypes,
						));
					},
					Some(( "extern", declaration )) => output.external_types.push( parse_declaration( declaration )),
					Some(( "warn", message )) => diagnostics.report( located( Diagnostic::warning( message ))),
					None if line == "decline" => return Ok( None ),
					_ => diagnostics.report( located( Diagnostic::error( format!( "unexpected `{}`", line )))),
				}
			}

			Ok( Some( output ))

		}
	}

	fn parse_declaration( declaration: &str ) -> ( String, Vec<String> ) {
		let ( name, supertypes ) = declaration.split_once( ':' ).unwrap_or(( declaration, "" ));
		let supertypes = supertypes.split( ',' )
			.map( str::trim )
			.filter(| supertype | !supertype.is_empty() )
			.map( str::to_string )
			.collect();
		( name.trim().to_string(), supertypes )
	}

}
