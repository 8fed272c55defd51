//! Binding-based resolution: kinds, scopes, just-in-time fallbacks
//!
//! These tests verify that:
//! 1. Each binding kind (class, instance, provider, constructor map)
//!    resolves as configured
//! 2. Singleton-scoped bindings populate their slot lazily and reuse it
//! 3. Unbound names fall back to just-in-time hints, then concrete
//!    construction, then fail
//! 4. Optional and defaulted parameters recover locally

use armature::binder::{Binder, Binding, BindingScope, Provider};
use armature::{Container, DiError, Object, ParamInfo, ParamValue, TypeBuilder, TypeInfo, TypeRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

trait Store: Send + Sync {
	fn kind(&self) -> &'static str;
}

struct MemoryStore;

impl Store for MemoryStore {
	fn kind(&self) -> &'static str {
		"memory"
	}
}

fn store_registry() -> Arc<TypeRegistry> {
	let registry = TypeRegistry::new();
	registry.register(TypeInfo::interface("StoreInterface"));
	registry.register(
		TypeBuilder::<MemoryStore>::new("MemoryStore")
			.implements::<dyn Store, _>("StoreInterface", |store| store)
			.constructor(vec![], |_| Ok(MemoryStore))
			.build(),
	);
	Arc::new(registry)
}

#[test]
fn class_binding_constructs_the_bound_type() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	binder.bind(
		"StoreInterface",
		Binding::ToClass("MemoryStore".into()),
		BindingScope::Prototype,
	);

	let first = binder.resolve(&container, "StoreInterface").unwrap();
	let second = binder.resolve(&container, "StoreInterface").unwrap();

	assert_eq!(first.view::<dyn Store>().unwrap().kind(), "memory");
	assert!(!first.same_instance(&second));
}

#[test]
fn singleton_scope_reuses_the_slot() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	binder.bind(
		"StoreInterface",
		Binding::ToClass("MemoryStore".into()),
		BindingScope::Singleton,
	);

	let first = binder.resolve(&container, "StoreInterface").unwrap();
	let second = binder.resolve(&container, "StoreInterface").unwrap();

	assert!(first.same_instance(&second));
}

#[test]
fn instance_binding_returns_the_bound_value() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	let bound = Object::tagged("MemoryStore", MemoryStore);
	binder.bind(
		"StoreInterface",
		Binding::ToInstance(bound.clone()),
		BindingScope::Prototype,
	);

	let resolved = binder.resolve(&container, "StoreInterface").unwrap();

	assert!(resolved.same_instance(&bound));
}

#[test]
fn provider_binding_asks_the_provider_each_time() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	binder.bind(
		"StoreInterface",
		Binding::ToProvider(Arc::new(move |container: &Container| {
			counter.fetch_add(1, Ordering::SeqCst);
			container.create("MemoryStore")
		})),
		BindingScope::Prototype,
	);

	binder.resolve(&container, "StoreInterface").unwrap();
	binder.resolve(&container, "StoreInterface").unwrap();

	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn singleton_provider_binding_is_invoked_once() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	binder.bind(
		"StoreInterface",
		Binding::ToProvider(Arc::new(move |container: &Container| {
			counter.fetch_add(1, Ordering::SeqCst);
			container.create("MemoryStore")
		})),
		BindingScope::Singleton,
	);

	let first = binder.resolve(&container, "StoreInterface").unwrap();
	let second = binder.resolve(&container, "StoreInterface").unwrap();

	assert!(first.same_instance(&second));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn constructor_binding_supplies_all_arguments_by_name() {
	struct Config {
		host: String,
		port: u16,
	}

	let registry = store_registry();
	registry.register(
		TypeBuilder::<Config>::new("Config")
			.constructor(
				vec![ParamInfo::untyped("host"), ParamInfo::untyped("port")],
				|args| {
					Ok(Config {
						host: args.value::<String>()?,
						port: args.value::<u16>()?,
					})
				},
			)
			.build(),
	);
	let container = Container::new(registry);
	let binder = Binder::new();
	let mut map = HashMap::new();
	map.insert("host".to_string(), ParamValue::value("localhost".to_string()));
	map.insert("port".to_string(), ParamValue::value(8080u16));
	binder.bind("Config", Binding::ToConstructor(map), BindingScope::Prototype);

	let config = binder
		.resolve(&container, "Config")
		.unwrap()
		.downcast::<Config>()
		.unwrap();

	assert_eq!(config.host, "localhost");
	assert_eq!(config.port, 8080);
}

#[test]
fn constructor_binding_missing_untyped_argument_is_not_bound() {
	struct Config {
		_host: String,
	}

	let registry = store_registry();
	registry.register(
		TypeBuilder::<Config>::new("Config")
			.constructor(vec![ParamInfo::untyped("host")], |args| {
				Ok(Config {
					_host: args.value::<String>()?,
				})
			})
			.build(),
	);
	let container = Container::new(registry);
	let binder = Binder::new();
	binder.bind("Config", Binding::ToConstructor(HashMap::new()), BindingScope::Prototype);

	let err = binder.resolve(&container, "Config").unwrap_err();

	assert!(matches!(err, DiError::NotBound { .. }));
}

#[test]
fn unbound_concrete_type_constructs_directly() {
	let container = Container::new(store_registry());
	let binder = Binder::new();

	let store = binder.resolve(&container, "MemoryStore").unwrap();

	assert_eq!(store.type_name(), Some("MemoryStore"));
}

#[test]
fn jit_implemented_by_hint_binds_on_demand() {
	let registry = TypeRegistry::new();
	registry.register(TypeInfo::interface("StoreInterface").implemented_by("MemoryStore"));
	registry.register(
		TypeBuilder::<MemoryStore>::new("MemoryStore")
			.implements::<dyn Store, _>("StoreInterface", |store| store)
			.constructor(vec![], |_| Ok(MemoryStore))
			.build(),
	);
	let container = Container::new(Arc::new(registry));
	let binder = Binder::new();

	let resolved = binder.resolve(&container, "StoreInterface").unwrap();

	assert_eq!(resolved.view::<dyn Store>().unwrap().kind(), "memory");
}

#[test]
fn jit_provided_by_hint_asks_the_provider_type() {
	struct StoreProvider;

	impl Provider for StoreProvider {
		fn get(&self, container: &Container) -> armature::DiResult<Object> {
			container.create("MemoryStore")
		}
	}

	let registry = TypeRegistry::new();
	registry.register(TypeInfo::interface("StoreInterface").provided_by("StoreProvider"));
	registry.register(
		TypeBuilder::<MemoryStore>::new("MemoryStore")
			.implements::<dyn Store, _>("StoreInterface", |store| store)
			.constructor(vec![], |_| Ok(MemoryStore))
			.build(),
	);
	registry.register(
		TypeBuilder::<StoreProvider>::new("StoreProvider")
			.implements::<dyn Provider, _>("Provider", |provider| provider)
			.constructor(vec![], |_| Ok(StoreProvider))
			.build(),
	);
	let container = Container::new(Arc::new(registry));
	let binder = Binder::new();

	let resolved = binder.resolve(&container, "StoreInterface").unwrap();

	assert_eq!(resolved.type_name(), Some("MemoryStore"));
}

#[test]
fn unbound_interface_without_hints_is_not_bound() {
	let container = Container::new(store_registry());
	let binder = Binder::new();

	let err = binder.resolve(&container, "StoreInterface").unwrap_err();

	assert!(matches!(err, DiError::NotBound { .. }));
}

#[test]
fn unknown_name_is_not_bound() {
	let container = Container::new(store_registry());
	let binder = Binder::new();

	let err = binder.resolve(&container, "Ghost").unwrap_err();

	assert!(matches!(err, DiError::NotBound { .. }));
}

#[test]
fn unbound_param_with_default_recovers_locally() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	let param = ParamInfo::typed("retries", "RetryPolicy").with_default(Object::literal(3u32));

	let resolved = binder.resolve_param(&container, "HttpClient", &param).unwrap();

	assert_eq!(resolved.extract::<u32>().unwrap(), 3);
}

#[test]
fn unbound_optional_param_without_default_surfaces_optional_not_bound() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	let param = ParamInfo::typed("metrics", "MetricsInterface").optional();

	let err = binder.resolve_param(&container, "HttpClient", &param).unwrap_err();

	assert!(matches!(err, DiError::OptionalNotBound(name) if name == "metrics"));
}

#[test]
fn bound_param_prefers_the_binding_over_its_default() {
	let container = Container::new(store_registry());
	let binder = Binder::new();
	binder.bind(
		"StoreInterface",
		Binding::ToClass("MemoryStore".into()),
		BindingScope::Prototype,
	);
	let param =
		ParamInfo::typed("store", "StoreInterface").with_default(Object::literal("fallback".to_string()));

	let resolved = binder.resolve_param(&container, "App", &param).unwrap();

	assert_eq!(resolved.type_name(), Some("MemoryStore"));
}
