use std::sync::Arc ;
use wasmtime::StoreContextMut ;
use wasmtime::component::Linker ;
use deploy_link::{
	BackendOutput, BinaryArtifact, CompilerBackend, CompilerInvocation, ComponentDefiner, DefineError,
	Definer, DeployableFactory, Diagnostics, Engine, GuestState, InstantiationError, LifecycleError,
	SilentSink, UnitCompiler, UnitState, UnitType, DEPLOYABLE_TYPE,
};
use crate::fixtures::{ context, host_loader, write_source };

/// A component whose lifecycle exports return the given statuses.
fn lifecycle_component( start_status: u32, stop_status: u32 ) -> String {
	format!( r#"(component
		(core module $m
			(func (export "init"))
			(func (export "start") (result i32) i32.const {})
			(func (export "stop") (result i32) i32.const {})
		)
		(core instance $i (instantiate $m))
		(func $init (canon lift (core func $i "init")))
		(func $start (result u32) (canon lift (core func $i "start")))
		(func $stop (result u32) (canon lift (core func $i "stop")))
		(instance $lifecycle
			(export "init" (func $init))
			(export "start" (func $start))
			(export "stop" (func $stop))
		)
		(export "deploy:unit/lifecycle" (instance $lifecycle))
	)"#, start_status, stop_status )
}

/// A component calling the host's `record` import with `value` on start.
fn recording_component( value: u32 ) -> String {
	format!( r#"(component
		(import "record" (func $record (param "value" u32)))
		(core func $record_lowered (canon lower (func $record)))
		(core instance $host (export "record" (func $record_lowered)))
		(core module $m
			(import "host" "record" (func $record (param i32)))
			(func (export "start") (result i32) i32.const {} call $record i32.const 0)
		)
		(core instance $i (instantiate $m (with "host" (instance $host))))
		(func $start (result u32) (canon lift (core func $i "start")))
		(instance $lifecycle (export "start" (func $start)))
		(export "deploy:unit/lifecycle" (instance $lifecycle))
	)"#, value )
}

/// Links a `record` function writing into the deployment's "M" map.
fn recording_linker( engine: &Engine ) -> Linker<GuestState> {
	let mut linker = Linker::new( engine );
	linker.root().func_wrap( "record", | store: StoreContextMut<'_, GuestState>, ( value, ): ( u32, ) | {
		if let Some( context ) = store.data().context() {
			context.shared_data().local_map( "M" ).put( value.to_string(), context.deployment_id() );
		}
		Ok(())
	}).unwrap();
	linker
}

fn artifact( name: &str, wat: String ) -> BinaryArtifact {
	BinaryArtifact::new( format!( "{}.wasm", name.replace( '.', "/" )), wat.into_bytes(), [ DEPLOYABLE_TYPE ])
}

fn define( wat: String ) -> Arc<dyn UnitType> {
	ComponentDefiner::new( &Engine::default() ).define( &artifact( "demo.Wasm", wat )).unwrap()
}

#[tokio::test]
async fn component_lifecycle_exports_called() {

	let unit_type = define( lifecycle_component( 0, 0 ));
	assert_eq!( unit_type.name(), "demo.Wasm" );

	let mut unit = unit_type.instantiate().unwrap();
	let context = context();
	unit.init( Arc::clone( &context )).unwrap();
	assert!( Arc::ptr_eq( unit.context().unwrap(), &context ));

	unit.start().await.unwrap();
	unit.stop().await.unwrap();

}

#[tokio::test]
async fn component_nonzero_status_fails() {

	let mut unit = define( lifecycle_component( 3, 5 )).instantiate().unwrap();
	unit.init( context() ).unwrap();

	match unit.start().await {
		Err( LifecycleError::Failed( message )) => assert!( message.contains( "status 3" ), "{}", message ),
		other => panic!( "Expected a failed start, got {:?}", other ),
	}
	match unit.stop().await {
		Err( LifecycleError::Failed( message )) => assert!( message.contains( "status 5" ), "{}", message ),
		other => panic!( "Expected a failed stop, got {:?}", other ),
	}

}

#[tokio::test]
async fn component_trap_reported() {

	let wat = r#"(component
		(core module $m (func (export "start") (result i32) unreachable))
		(core instance $i (instantiate $m))
		(func $start (result u32) (canon lift (core func $i "start")))
		(instance $lifecycle (export "start" (func $start)))
		(export "deploy:unit/lifecycle" (instance $lifecycle))
	)"#;

	let mut unit = define( wat.to_string() ).instantiate().unwrap();
	unit.init( context() ).unwrap();

	assert!( matches!( unit.start().await, Err( LifecycleError::Trap( _ ))));

}

#[tokio::test]
async fn component_optional_exports() {

	let wat = r#"(component
		(core module $m (func (export "start") (result i32) i32.const 0))
		(core instance $i (instantiate $m))
		(func $start (result u32) (canon lift (core func $i "start")))
		(instance $lifecycle (export "start" (func $start)))
		(export "deploy:unit/lifecycle" (instance $lifecycle))
	)"#;

	let mut unit = define( wat.to_string() ).instantiate().unwrap();
	unit.init( context() ).unwrap();
	assert!( matches!(
		unit.init( context() ),
		Err( LifecycleError::InvalidState { operation: "init", state: UnitState::Initialized }),
	));

	unit.start().await.unwrap();
	unit.stop().await.unwrap();

}

#[test]
fn component_missing_start_rejected() {

	let wat = r#"(component
		(core module $m (func (export "stop") (result i32) i32.const 0))
		(core instance $i (instantiate $m))
		(func $stop (result u32) (canon lift (core func $i "stop")))
		(instance $lifecycle (export "stop" (func $stop)))
		(export "deploy:unit/lifecycle" (instance $lifecycle))
	)"#;

	match define( wat.to_string() ).instantiate() {
		Err( InstantiationError::Constructor { type_name, .. }) => assert_eq!( type_name, "demo.Wasm" ),
		Err( other ) => panic!( "Expected a constructor failure, got {}", other ),
		Ok( _ ) => panic!( "Expected a constructor failure" ),
	}

}

#[test]
fn component_invalid_bytes_rejected() {

	let result = ComponentDefiner::new( &Engine::default() ).define( &artifact( "demo.Wasm", "(module".to_string() ));

	assert!( matches!( result, Err( DefineError::InvalidComponent( _ ))));

}

#[tokio::test]
async fn component_host_functions_reach_context() {

	let engine = Engine::default();
	let definer = ComponentDefiner::with_linker( &engine, recording_linker( &engine ));

	let mut unit = definer.define( &artifact( "demo.Recorder", recording_component( 7 ))).unwrap().instantiate().unwrap();
	let context = context();
	unit.init( Arc::clone( &context )).unwrap();
	unit.start().await.unwrap();

	assert_eq!( context.shared_data().local_map( "M" ).get( "7" ).as_deref(), Some( "test" ));

}

/// Emits a fixed set of artifacts for any source.
struct FixedBackend( Vec<BinaryArtifact> );

impl CompilerBackend for FixedBackend {
	fn compile(
		&self,
		_: &CompilerInvocation<'_>,
		_: &mut Diagnostics<'_>,
	) -> Result<Option<BackendOutput>, std::io::Error> {
		Ok( Some( BackendOutput { artifacts: self.0.clone(), external_types: Vec::new() }))
	}
}

#[tokio::test]
async fn component_units_composed_by_factory() {

	let dir = tempfile::tempdir().unwrap();
	write_source( dir.path(), "units.wat", "" );

	let engine = Engine::default();
	let backend = FixedBackend( vec![
		artifact( "demo.First", recording_component( 1 )),
		artifact( "demo.Second", recording_component( 2 )),
	]);
	let factory = DeployableFactory::new(
		UnitCompiler::new( backend ).with_sink( SilentSink ),
		Arc::new( ComponentDefiner::with_linker( &engine, recording_linker( &engine ))),
	).with_prefix( "wat" );

	let mut unit = factory.create( "wat:units.wat", host_loader( dir.path() )).unwrap_or_else(| err | panic!( "{}", err ));
	let context = context();
	unit.init( Arc::clone( &context )).unwrap();
	unit.start().await.unwrap();

	let recorded = context.shared_data().local_map( "M" );
	assert_eq!( recorded.len(), 2 );
	assert!( recorded.get( "1" ).is_some() && recorded.get( "2" ).is_some() );

	unit.stop().await.unwrap();

}
