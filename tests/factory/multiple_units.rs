use std::sync::Arc ;
use deploy_link::{
	compile_types, LifecycleError, Loader, PathLoader, PathSetResolver, RegistryDefiner, SilentSink,
	TypeRegistry, UnitCompiler, UnitState, UnitType, DEPLOYABLE_TYPE,
};
use crate::fixtures::{ context, events, factory, host_loader, pairs, registry, write_source, ToyBackend };
use crate::recording_units::{ boxed, Behaviour };

#[tokio::test]
async fn factory_multiple_matches_composed() {

	let dir = tempfile::tempdir().unwrap();
	write_source( dir.path(), "verticles.src", concat!(
		"type demo.V1 : deploy.Deployable\n",
		"type demo.V2 : deploy.Deployable\n",
		"type demo.V3 : deploy.Deployable\n",
	));

	let mut unit = factory( ToyBackend::default(), dir.path() )
		.create( "src:verticles.src", host_loader( dir.path() ))
		.unwrap_or_else(| err | panic!( "{}", err ));

	let context = context();
	unit.init( Arc::clone( &context )).unwrap();
	assert!( matches!(
		unit.init( Arc::clone( &context )),
		Err( LifecycleError::InvalidState { operation: "init", state: UnitState::Initialized }),
	));

	unit.start().await.unwrap();
	assert_eq!( events( &context ), pairs( &[( "V1", "started" ), ( "V2", "started" ), ( "V3", "started" )]));

	unit.stop().await.unwrap();
	assert_eq!( events( &context ), pairs( &[( "V1", "stopped" ), ( "V2", "stopped" ), ( "V3", "stopped" )]));

}

#[test]
fn factory_compiled_types_share_one_loader() {

	let dir = tempfile::tempdir().unwrap();
	let source = write_source( dir.path(), "verticles.src", concat!(
		"type demo.V2 : deploy.Deployable\n",
		"type demo.Plain : lib.Other\n",
		"type demo.V1 : deploy.Deployable\n",
	));

	let host_types = TypeRegistry::new().with( "host.Service", || Ok( boxed( "Service", Behaviour::default() )));
	let host: Arc<dyn Loader> = PathLoader::new( "host", [ dir.path() ]).with_types( host_types ).into_shared();

	let compiled = compile_types(
		&UnitCompiler::new( ToyBackend::default() ).with_sink( SilentSink ),
		&PathSetResolver::default(),
		Arc::new( RegistryDefiner::new( registry() )),
		Arc::clone( &host ),
		&source,
		| symbols, symbol | symbols.is_subtype_of( symbol, DEPLOYABLE_TYPE ),
	).unwrap_or_else(| err | panic!( "{}", err ));

	let discovered = compiled.types.iter().map(|( discovered, _ )| discovered.name.as_str() ).collect::<Vec<_>>();
	assert_eq!( discovered, vec![ "demo.V2", "demo.V1" ]);
	assert_eq!( compiled.loader.artifact_names(), [ "demo.V2", "demo.Plain", "demo.V1" ]);

	// Every discovered name loads to the very type the factory instantiates.
	for ( discovered, unit_type ) in &compiled.types {
		assert!( Arc::ptr_eq( &compiled.loader.load_type( &discovered.name ).unwrap(), unit_type ));
	}

	// Names outside the compilation come from the host loader.
	assert_eq!( compiled.loader.load_type( "host.Service" ).unwrap().name(), "host.Service" );
	assert!( compiled.loader.load_type( "host.Missing" ).is_err() );
	assert_eq!( compiled.loader.parent().unwrap().name(), "host" );

}
