use std::path::PathBuf ;
use std::sync::Arc ;
use deploy_link::{ ClasspathSources, Loader, PathEntry, PathLoader, PathSetResolver, ResolverEnv };

fn canonical( path: &std::path::Path ) -> PathBuf { path.canonicalize().unwrap() }

fn paths( entries: &[PathEntry] ) -> Vec<PathBuf> {
	entries.iter().map(| entry | entry.path().to_path_buf() ).collect()
}

#[test]
fn classpath_overlapping_roots_collapse() {

	let dir = tempfile::tempdir().unwrap();
	let lib = dir.path().join( "lib" );
	let other = dir.path().join( "other" );
	std::fs::create_dir_all( &lib ).unwrap();
	std::fs::create_dir_all( &other ).unwrap();

	let parent: Arc<dyn Loader> = PathLoader::new( "parent", [ lib.clone(), other.clone() ]).into_shared();
	let child = PathLoader::new( "child", [ lib.clone(), lib.join( "." ), other.join( "../lib" ) ])
		.with_parent( Arc::clone( &parent ));

	let resolver = PathSetResolver::new(
		ClasspathSources::default(),
		ResolverEnv { system_loader: Some( Arc::clone( &parent )), context_loader: Some( parent ), ..ResolverEnv::default() },
	);
	let entries = paths( &resolver.collect( &child ));

	assert_eq!( entries.len(), 2, "{:?}", entries );
	assert!( entries.contains( &canonical( &lib )));
	assert!( entries.contains( &canonical( &other )));

}

#[test]
fn classpath_missing_roots_dropped() {

	let dir = tempfile::tempdir().unwrap();
	let present = dir.path().join( "present" );
	std::fs::create_dir_all( &present ).unwrap();

	let loader = PathLoader::new( "host", [ present.clone(), dir.path().join( "absent" ) ]);
	let resolver = PathSetResolver::new( ClasspathSources::loader_chain_only(), ResolverEnv::default() );

	assert_eq!( paths( &resolver.collect( &loader )), vec![ canonical( &present ) ]);

}

#[test]
fn classpath_disabled_sources_ignored() {

	let dir = tempfile::tempdir().unwrap();
	let own = dir.path().join( "own" );
	let system = dir.path().join( "system" );
	std::fs::create_dir_all( &own ).unwrap();
	std::fs::create_dir_all( &system ).unwrap();

	let env = ResolverEnv {
		system_loader: Some( PathLoader::new( "system", [ system.clone() ]).into_shared() ),
		..ResolverEnv::default()
	};
	let loader = PathLoader::new( "host", [ own.clone() ]);

	let chain_only = PathSetResolver::new( ClasspathSources::loader_chain_only(), env.clone() );
	assert_eq!( paths( &chain_only.collect( &loader )), vec![ canonical( &own ) ]);

	let everything = PathSetResolver::new( ClasspathSources::default(), env );
	assert_eq!( paths( &everything.collect( &loader )), vec![ canonical( &own ), canonical( &system ) ]);

}

#[test]
fn classpath_opaque_loader_contributes_parent_roots() {

	let dir = tempfile::tempdir().unwrap();

	let parent = PathLoader::new( "parent", [ dir.path() ]).into_shared();
	let loader = PathLoader::opaque( "opaque" ).with_parent( parent );
	let resolver = PathSetResolver::new( ClasspathSources::loader_chain_only(), ResolverEnv::default() );

	assert_eq!( loader.search_roots(), None );
	assert_eq!( paths( &resolver.collect( &loader )), vec![ canonical( dir.path() ) ]);

}
