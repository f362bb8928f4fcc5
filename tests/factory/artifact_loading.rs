use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use deploy_link::{
	ArtifactLoader, BinaryArtifact, DefineError, Definer, Loader, PathLoader,
	RegistryDefiner, UnitType, DEPLOYABLE_TYPE,
};
use crate::fixtures::registry ;

/// Counts how often each artifact is actually defined.
struct CountingDefiner {
	inner: RegistryDefiner,
	defined: AtomicUsize,
}

impl Definer for CountingDefiner {
	fn define( &self, artifact: &BinaryArtifact ) -> Result<Arc<dyn UnitType>, DefineError> {
		self.defined.fetch_add( 1, Ordering::SeqCst );
		self.inner.define( artifact )
	}
}

fn artifact( path: &str, supertypes: &[&str] ) -> BinaryArtifact {
	BinaryArtifact::new( path, Vec::<u8>::new(), supertypes.iter().copied() )
}

#[test]
fn artifact_loader_concurrent_loads_share_one_definition() {

	let dir = tempfile::tempdir().unwrap();
	let definer = Arc::new( CountingDefiner { inner: RegistryDefiner::new( registry() ), defined: AtomicUsize::new( 0 ) });
	let loader = ArtifactLoader::new(
		[ artifact( "demo/V1.unit", &[ DEPLOYABLE_TYPE ]), artifact( "demo/V2.unit", &[ DEPLOYABLE_TYPE ]) ],
		PathLoader::new( "host", [ dir.path() ]).into_shared(),
		Arc::clone( &definer ) as Arc<dyn Definer>,
	);

	let loaded = std::thread::scope(| scope | {
		let handles = ( 0..8 )
			.map(| _ | scope.spawn(|| loader.load_type( "demo.V1" ).unwrap() ))
			.collect::<Vec<_>>();
		handles.into_iter().map(| handle | handle.join().unwrap() ).collect::<Vec<_>>()
	});

	assert!( loaded.iter().all(| unit_type | Arc::ptr_eq( unit_type, &loaded[ 0 ] )));
	assert_eq!( definer.defined.load( Ordering::SeqCst ), 1 );

}

#[test]
fn artifact_loader_duplicate_name_keeps_first() {

	let dir = tempfile::tempdir().unwrap();
	let loader = ArtifactLoader::new(
		[
			artifact( "demo/V1.unit", &[ DEPLOYABLE_TYPE ]),
			artifact( "demo/V2.unit", &[ DEPLOYABLE_TYPE ]),
			artifact( "demo/V1.unit", &[ "lib.Other" ]),
		],
		PathLoader::new( "host", [ dir.path() ]).into_shared(),
		Arc::new( RegistryDefiner::new( registry() )),
	);

	assert_eq!( loader.artifact_names(), [ "demo.V1", "demo.V2" ]);
	assert_eq!( loader.artifact( "demo.V1" ).unwrap().supertypes(), [ DEPLOYABLE_TYPE ]);

}

#[test]
fn compiled_types_outlive_their_loader() {

	let dir = tempfile::tempdir().unwrap();
	let loader = Arc::new( ArtifactLoader::new(
		[ artifact( "demo/V1.unit", &[ DEPLOYABLE_TYPE ]) ],
		PathLoader::new( "host", [ dir.path() ]).into_shared(),
		Arc::new( RegistryDefiner::new( registry() )),
	));
	let unit_type = loader.load_type( "demo.V1" ).unwrap();
	drop( loader );

	assert_eq!( unit_type.name(), "demo.V1" );
	assert!( unit_type.instantiate().is_ok() );

}
