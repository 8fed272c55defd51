//! The instance factory and its caches

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{DiError, DiResult};
use crate::plan::Plan;
use crate::reflect::{InvokeFn, TypeInfo, TypeRegistry, canonical};
use crate::rule::Rule;
use crate::value::{Object, ParamValue};

/// A compiled post-construction call: resolved method, its cached plan
/// (built against an empty ad-hoc rule, so rule substitutions never apply
/// to call arguments), and the configured literal argument list.
struct CompiledCall {
	method: Arc<str>,
	invoke: InvokeFn,
	plan: Plan,
	args: Vec<ParamValue>,
}

/// A cached construction closure: descriptor, rule snapshot, and plans.
/// Compiled once per requested type name and reused for every subsequent
/// creation, regardless of later rule mutation.
struct CompiledFactory {
	info: Arc<TypeInfo>,
	rule: Rule,
	ctor_plan: Option<Plan>,
	calls: Vec<CompiledCall>,
}

/// Rule-driven dependency injection container.
///
/// Holds the rule store, the compiled-factory cache, and the singleton
/// instance cache. Resolution is synchronous and depth-first; the caches
/// are lock-guarded so a container shared across threads stays coherent,
/// but rules must be registered before the first use of a type.
///
/// # Examples
///
/// ```
/// use armature::{ArgList, Container, ParamInfo, Rule, TypeBuilder, TypeInfo, TypeRegistry};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
/// 	fn target(&self) -> &str;
/// }
///
/// struct FileLogger;
///
/// impl Logger for FileLogger {
/// 	fn target(&self) -> &str {
/// 		"file"
/// 	}
/// }
///
/// struct App {
/// 	logger: Arc<dyn Logger>,
/// }
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry.register(TypeInfo::interface("LoggerInterface"));
/// registry.register(
/// 	TypeBuilder::<FileLogger>::new("FileLogger")
/// 		.implements::<dyn Logger, _>("LoggerInterface", |logger| logger)
/// 		.constructor(vec![], |_| Ok(FileLogger))
/// 		.build(),
/// );
/// registry.register(
/// 	TypeBuilder::<App>::new("App")
/// 		.constructor(vec![ParamInfo::typed("logger", "LoggerInterface")], |args| {
/// 			Ok(App {
/// 				logger: args.view::<dyn Logger>()?,
/// 			})
/// 		})
/// 		.build(),
/// );
///
/// let container = Container::new(registry);
/// container.add_rule("LoggerInterface", Rule::new().instance_of("FileLogger"));
///
/// let app = container.create("App").unwrap().downcast::<App>().unwrap();
/// assert_eq!(app.logger.target(), "file");
/// ```
pub struct Container {
	registry: Arc<TypeRegistry>,
	rules: RwLock<IndexMap<String, Rule>>,
	factories: RwLock<HashMap<String, Arc<CompiledFactory>>>,
	instances: RwLock<HashMap<String, Object>>,
}

impl Container {
	/// Creates a container over the given type registry.
	pub fn new(registry: Arc<TypeRegistry>) -> Self {
		Self {
			registry,
			rules: RwLock::new(IndexMap::new()),
			factories: RwLock::new(HashMap::new()),
			instances: RwLock::new(HashMap::new()),
		}
	}

	/// The registry this container resolves descriptors from.
	pub fn registry(&self) -> &Arc<TypeRegistry> {
		&self.registry
	}

	/// Registers (or overwrites) the rule for a type name.
	///
	/// Keys are case-insensitive and namespace-trimmed; `*` registers the
	/// wildcard default rule. Registration must happen before the type's
	/// first use: a compiled factory is never invalidated.
	pub fn add_rule(&self, type_name: &str, rule: Rule) {
		let key = canonical(type_name);
		debug!(type_name = %key, shared = rule.shared, "registering rule");
		let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
		rules.insert(key, rule);
	}

	/// Finds the active rule for a type name.
	///
	/// Lookup order: exact match, then the first registered inheritable
	/// rule whose key is a strict superclass of the request (insertion
	/// order, so earlier-registered rules take priority), then the
	/// wildcard rule, then an empty default. Never an error.
	pub fn rule_for(&self, type_name: &str) -> Rule {
		let key = canonical(type_name);
		let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
		if let Some(rule) = rules.get(&key) {
			return rule.clone();
		}
		for (candidate, rule) in rules.iter() {
			if candidate != "*"
				&& rule.instance_of.is_none()
				&& rule.inherit
				&& self.registry.is_subclass_of(&key, candidate)
			{
				debug!(type_name = %key, inherited_from = %candidate, "rule matched by inheritance");
				return rule.clone();
			}
		}
		match rules.get("*") {
			Some(rule) => {
				trace!(type_name = %key, "wildcard rule applies");
				rule.clone()
			}
			None => Rule::default(),
		}
	}

	/// Creates (or fetches the shared) instance of the named type.
	///
	/// Equivalent to [`create_with`](Self::create_with) with no explicit
	/// arguments and no forced freshness.
	pub fn create(&self, type_name: &str) -> DiResult<Object> {
		self.create_with(type_name, Vec::new(), false)
	}

	/// Creates an instance of the named type.
	///
	/// `args` are explicit arguments: a typed parameter consumes the first
	/// remaining argument that is an instance of its declared type, and
	/// untyped parameters consume the rest positionally. `force_fresh`
	/// bypasses the singleton fast path for shared rules.
	pub fn create_with(&self, type_name: &str, args: Vec<Object>, force_fresh: bool) -> DiResult<Object> {
		let key = canonical(type_name);
		if !force_fresh {
			let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(existing) = instances.get(&key) {
				trace!(type_name = %key, "returning shared instance");
				return Ok(existing.clone());
			}
		}
		let factory = self.factory_for(type_name, &key)?;
		self.run_factory(&key, &factory, args)
	}

	/// Creates and downcasts in one step, for callers that know the
	/// concrete type.
	pub fn get<T: Send + Sync + 'static>(&self, type_name: &str) -> DiResult<Arc<T>> {
		self.create(type_name)?.downcast::<T>()
	}

	fn factory_for(&self, type_name: &str, key: &str) -> DiResult<Arc<CompiledFactory>> {
		{
			let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(factory) = factories.get(key) {
				return Ok(factory.clone());
			}
		}

		let rule = self.rule_for(type_name);
		let concrete = rule.instance_of.clone().unwrap_or_else(|| type_name.to_string());
		let info = self
			.registry
			.lookup(&concrete)
			.ok_or_else(|| DiError::NotRegistered(concrete.clone()))?;
		if !info.instantiable {
			return Err(DiError::NotInstantiable(info.name().to_string()));
		}

		let ctor_plan = info.constructor().map(|method| Plan::build(&info.name, method, &rule));
		let mut calls = Vec::with_capacity(rule.calls.len());
		for (method_name, call_args) in &rule.calls {
			let (method, invoke) = info.method(method_name).ok_or_else(|| DiError::UnknownMethod {
				type_name: info.name().to_string(),
				method: method_name.clone(),
			})?;
			calls.push(CompiledCall {
				method: method.name.clone(),
				invoke: invoke.clone(),
				plan: Plan::build(&info.name, method, &Rule::default()),
				args: call_args.clone(),
			});
		}

		debug!(type_name = %key, concrete = %info.name(), "compiled construction factory");
		let factory = Arc::new(CompiledFactory {
			info,
			rule,
			ctor_plan,
			calls,
		});
		let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
		Ok(factories.entry(key.to_string()).or_insert(factory).clone())
	}

	fn run_factory(&self, key: &str, factory: &CompiledFactory, args: Vec<Object>) -> DiResult<Object> {
		let object = if factory.rule.shared {
			self.construct_shared(key, factory, args)?
		} else {
			let args = self.constructor_args(factory, args)?;
			factory.info.instantiate(args)?
		};

		for call in &factory.calls {
			let result = self.apply_call(factory, &object, call);
			if let Err(err) = result {
				if factory.rule.shared {
					self.evict(key);
				}
				return Err(err);
			}
		}
		Ok(object)
	}

	/// Shared construction stores the singleton before initialization and
	/// post-construction calls run, so any resolution they trigger observes
	/// the stored reference instead of recursing forever.
	fn construct_shared(&self, key: &str, factory: &CompiledFactory, args: Vec<Object>) -> DiResult<Object> {
		if let Some(object) = factory.info.allocate_uninitialized() {
			self.store_instance(key, &object);
			if factory.info.has_initializer() {
				let resolved = match &factory.ctor_plan {
					Some(plan) => plan.materialize(self, args),
					None => Ok(Vec::new()),
				};
				let resolved = resolved.inspect_err(|_| self.evict(key))?;
				factory
					.info
					.run_initializer(&object, resolved)
					.inspect_err(|_| self.evict(key))?;
			}
			Ok(object)
		} else {
			let args = self.constructor_args(factory, args)?;
			let object = factory.info.instantiate(args)?;
			self.store_instance(key, &object);
			Ok(object)
		}
	}

	fn constructor_args(&self, factory: &CompiledFactory, args: Vec<Object>) -> DiResult<Vec<Object>> {
		match &factory.ctor_plan {
			Some(plan) => plan.materialize(self, args),
			None => Ok(Vec::new()),
		}
	}

	fn apply_call(&self, factory: &CompiledFactory, object: &Object, call: &CompiledCall) -> DiResult<()> {
		let mut supplied = Vec::with_capacity(call.args.len());
		for value in &call.args {
			supplied.push(self.expand(value, &[])?);
		}
		let resolved = call.plan.materialize(self, supplied)?;
		trace!(type_name = %factory.info.name(), method = %call.method, "post-construction call");
		(call.invoke)(object.payload(), resolved)
	}

	fn store_instance(&self, key: &str, object: &Object) {
		let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
		instances.insert(key.to_string(), object.clone());
	}

	fn evict(&self, key: &str) {
		let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
		instances.remove(key);
	}

	/// Expands a deferred rule value into a concrete one. Shared-pool
	/// instances are passed as supplied arguments to nested references.
	pub(crate) fn expand(&self, value: &ParamValue, share: &[Object]) -> DiResult<Object> {
		match value {
			ParamValue::Literal(object) => Ok(object.clone()),
			ParamValue::Instance(type_name) => self.create_with(type_name, share.to_vec(), false),
			ParamValue::Provider(provider) => provider(self),
		}
	}

	/// Whether a supplied argument satisfies a declared parameter type:
	/// same registered type, or a strict subtype of it. Literals never
	/// match.
	pub(crate) fn satisfies(&self, arg: &Object, declared_canonical: &str) -> bool {
		match arg.type_name() {
			Some(tag) => {
				let tag = canonical(tag);
				tag == declared_canonical || self.registry.is_subclass_of(&tag, declared_canonical)
			}
			None => false,
		}
	}
}
