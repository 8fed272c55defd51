//! Explicit interface bindings with scopes, providers, and just-in-time
//! resolution
//!
//! A richer resolution model layered over the container: interfaces are
//! bound to a concrete class, a ready instance, a provider, or a full
//! constructor argument map, each optionally scoped to a singleton slot.
//! When no binding exists, resolution falls back to the descriptor's
//! just-in-time hints (`implemented_by` / `provided_by`), then to direct
//! construction of concrete types, and only then fails.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::reflect::{ParamInfo, canonical};
use crate::value::{Object, ParamValue};

/// A factory object whose `get` produces the bound instance.
pub trait Provider: Send + Sync {
	/// Produces one instance.
	fn get(&self, container: &Container) -> DiResult<Object>;
}

impl<F> Provider for F
where
	F: Fn(&Container) -> DiResult<Object> + Send + Sync,
{
	fn get(&self, container: &Container) -> DiResult<Object> {
		self(container)
	}
}

/// What an interface (or class) name is bound to.
#[derive(Clone)]
pub enum Binding {
	/// Resolve by constructing the named concrete type.
	ToClass(String),
	/// Resolve to this ready-made instance.
	ToInstance(Object),
	/// Resolve by asking the provider.
	ToProvider(Arc<dyn Provider>),
	/// Constructor-only binding: every constructor argument of the bound
	/// type comes from this map, keyed by parameter name.
	ToConstructor(HashMap<String, ParamValue>),
}

/// Lifetime of a bound instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingScope {
	/// At most one instance, kept in the binder's slot for the binding.
	Singleton,
	/// A fresh instance per resolution.
	Prototype,
}

/// Binding store plus lazily populated singleton slots.
///
/// # Examples
///
/// ```
/// use armature::binder::{Binder, Binding, BindingScope};
/// use armature::{Container, TypeBuilder, TypeInfo, TypeRegistry};
/// use std::sync::Arc;
///
/// struct MemoryStore;
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry.register(TypeInfo::interface("Store"));
/// registry.register(
/// 	TypeBuilder::<MemoryStore>::new("MemoryStore")
/// 		.constructor(vec![], |_| Ok(MemoryStore))
/// 		.build(),
/// );
/// let container = Container::new(registry);
///
/// let binder = Binder::new();
/// binder.bind("Store", Binding::ToClass("MemoryStore".into()), BindingScope::Singleton);
///
/// let first = binder.resolve(&container, "Store").unwrap();
/// let second = binder.resolve(&container, "Store").unwrap();
/// assert!(first.same_instance(&second));
/// ```
#[derive(Default)]
pub struct Binder {
	bindings: RwLock<IndexMap<String, (Binding, BindingScope)>>,
	slots: RwLock<HashMap<String, Object>>,
}

impl Binder {
	/// Creates an empty binder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or overwrites) a binding for a type name.
	pub fn bind(&self, type_name: &str, binding: Binding, scope: BindingScope) {
		let key = canonical(type_name);
		debug!(type_name = %key, ?scope, "registering binding");
		let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
		bindings.insert(key, (binding, scope));
	}

	/// Whether an explicit binding exists for the name.
	pub fn is_bound(&self, type_name: &str) -> bool {
		let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
		bindings.contains_key(&canonical(type_name))
	}

	/// Resolves a type name to an instance.
	///
	/// Bound names resolve per their binding kind and scope. Unbound names
	/// fall back to just-in-time binding from the descriptor's hints, then
	/// to direct construction when the type is concrete, then fail with
	/// [`DiError::NotBound`].
	pub fn resolve(&self, container: &Container, type_name: &str) -> DiResult<Object> {
		let key = canonical(type_name);
		let bound = {
			let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
			bindings.get(&key).cloned()
		};
		match bound {
			Some((binding, scope)) => self.resolve_bound(container, &key, &binding, scope),
			None => self.resolve_unbound(container, type_name),
		}
	}

	fn resolve_bound(
		&self,
		container: &Container,
		key: &str,
		binding: &Binding,
		scope: BindingScope,
	) -> DiResult<Object> {
		if scope == BindingScope::Singleton {
			let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(existing) = slots.get(key) {
				trace!(type_name = %key, "singleton slot hit");
				return Ok(existing.clone());
			}
		}
		let value = match binding {
			Binding::ToClass(class) => container.create(class)?,
			Binding::ToInstance(object) => object.clone(),
			Binding::ToProvider(provider) => provider.get(container)?,
			Binding::ToConstructor(map) => self.construct_from_map(container, key, map)?,
		};
		if scope == BindingScope::Singleton {
			let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
			slots.insert(key.to_string(), value.clone());
		}
		Ok(value)
	}

	fn resolve_unbound(&self, container: &Container, type_name: &str) -> DiResult<Object> {
		let info = container.registry().lookup(type_name).ok_or_else(|| DiError::NotBound {
			type_name: type_name.to_string(),
			context: "no binding and no registered descriptor".to_string(),
		})?;
		if let Some(class) = &info.implemented_by {
			debug!(type_name = %info.name(), implemented_by = %class, "just-in-time class binding");
			return container.create(class);
		}
		if let Some(provider_type) = &info.provided_by {
			debug!(type_name = %info.name(), provided_by = %provider_type, "just-in-time provider binding");
			let provider = container.create(provider_type)?.view::<dyn Provider>()?;
			return provider.get(container);
		}
		if info.instantiable {
			return container.create(type_name);
		}
		Err(DiError::NotBound {
			type_name: info.name().to_string(),
			context: "interface has no explicit or just-in-time binding".to_string(),
		})
	}

	/// Resolves a single declared parameter.
	///
	/// An unbound parameter with a declared default recovers locally with
	/// that default; an unbound optional parameter without one surfaces
	/// [`DiError::OptionalNotBound`] for the caller to catch.
	pub fn resolve_param(&self, container: &Container, target: &str, param: &ParamInfo) -> DiResult<Object> {
		let Some(declared) = param.type_name() else {
			return param.default.clone().ok_or_else(|| DiError::UnresolvableDependency {
				target: target.to_string(),
				param: param.name().to_string(),
				reason: "untyped parameter has no binding path".to_string(),
			});
		};
		if self.is_bound(declared) {
			return self.resolve(container, declared);
		}
		if let Some(default) = &param.default {
			trace!(target_type = %target, param = %param.name(), "unbound, using declared default");
			return Ok(default.clone());
		}
		match self.resolve_unbound(container, declared) {
			Ok(value) => Ok(value),
			Err(_) if param.optional => Err(DiError::OptionalNotBound(param.name().to_string())),
			Err(err) => Err(err),
		}
	}

	/// Constructs a bound type with every constructor argument drawn from
	/// one associative map keyed by parameter name. Unmapped parameters
	/// fall back to their default, then to binder resolution of their
	/// declared type.
	fn construct_from_map(
		&self,
		container: &Container,
		type_name: &str,
		map: &HashMap<String, ParamValue>,
	) -> DiResult<Object> {
		let info = container
			.registry()
			.lookup(type_name)
			.ok_or_else(|| DiError::NotRegistered(type_name.to_string()))?;
		let Some(ctor) = info.constructor() else {
			return info.instantiate(Vec::new());
		};
		let params: Vec<ParamInfo> = ctor.params().to_vec();
		let mut args = Vec::with_capacity(params.len());
		for param in &params {
			if let Some(value) = map.get(&canonical(param.name())) {
				args.push(container.expand(value, &[])?);
			} else if let Some(default) = &param.default {
				args.push(default.clone());
			} else if param.type_name().is_some() {
				args.push(self.resolve_param(container, info.name(), param)?);
			} else {
				return Err(DiError::NotBound {
					type_name: info.name().to_string(),
					context: format!("constructor binding supplies no value for `{}`", param.name()),
				});
			}
		}
		info.instantiate(args)
	}
}
