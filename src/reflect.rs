//! Descriptor-based stand-in for runtime reflection
//!
//! Rust has no runtime reflection, so the container works from explicit
//! descriptors registered once per type: the constructor signature, named
//! post-construction methods, supertype relations, and erased closures that
//! build, initialize, or invoke against the concrete type. [`TypeRegistry`]
//! is the capability the rest of the crate consults for signatures,
//! subtype checks, and instantiation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{DiError, DiResult};
use crate::value::{Object, Payload, UpcastFn, UpcastTable};

/// Canonical form of a type or method name: case-insensitive, with
/// namespace separators trimmed from both ends.
pub(crate) fn canonical(name: &str) -> String {
	name.trim_matches(|c| c == ':' || c == '\\').to_ascii_lowercase()
}

/// One declared parameter of a constructor or method.
#[derive(Clone, Debug)]
pub struct ParamInfo {
	pub(crate) name: Arc<str>,
	pub(crate) type_name: Option<Arc<str>>,
	pub(crate) default: Option<Object>,
	pub(crate) optional: bool,
}

impl ParamInfo {
	/// A parameter with a declared type, resolved by the container.
	pub fn typed(name: &str, type_name: &str) -> Self {
		Self {
			name: Arc::from(name),
			type_name: Some(Arc::from(type_name)),
			default: None,
			optional: false,
		}
	}

	/// An untyped/scalar parameter, consumed positionally from the
	/// caller-supplied argument list.
	pub fn untyped(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			type_name: None,
			default: None,
			optional: false,
		}
	}

	/// Declares a default value, used when no argument, substitution, or
	/// constructible dependency satisfies the parameter.
	pub fn with_default(mut self, value: Object) -> Self {
		self.default = Some(value);
		self
	}

	/// Marks the parameter optional for binder-level resolution.
	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	/// The declared parameter name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The declared type name, or `None` for untyped parameters.
	pub fn type_name(&self) -> Option<&str> {
		self.type_name.as_deref()
	}
}

/// An ordered constructor or method signature.
#[derive(Clone, Debug)]
pub struct MethodInfo {
	pub(crate) name: Arc<str>,
	pub(crate) params: Vec<ParamInfo>,
}

impl MethodInfo {
	pub(crate) fn new(name: &str, params: Vec<ParamInfo>) -> Self {
		Self {
			name: Arc::from(name),
			params,
		}
	}

	/// Declared parameters in order.
	pub fn params(&self) -> &[ParamInfo] {
		&self.params
	}
}

pub(crate) type ConstructFn = Arc<dyn Fn(Vec<Object>) -> DiResult<Payload> + Send + Sync>;
pub(crate) type AllocateFn = Arc<dyn Fn() -> Payload + Send + Sync>;
pub(crate) type InitializeFn = Arc<dyn Fn(&Payload, Vec<Object>) -> DiResult<()> + Send + Sync>;
pub(crate) type InvokeFn = Arc<dyn Fn(&Payload, Vec<Object>) -> DiResult<()> + Send + Sync>;

/// Ordered, resolved arguments handed to descriptor closures.
///
/// Extraction consumes arguments left to right; the closure's extraction
/// order must match the declared parameter order.
pub struct ArgList {
	items: std::vec::IntoIter<Object>,
}

impl ArgList {
	pub(crate) fn new(items: Vec<Object>) -> Self {
		Self {
			items: items.into_iter(),
		}
	}

	/// Takes the next argument as an erased [`Object`].
	pub fn next_object(&mut self) -> DiResult<Object> {
		self.items.next().ok_or_else(|| DiError::Internal {
			message: "argument list exhausted".to_string(),
		})
	}

	/// Takes the next argument as a shared concrete instance.
	pub fn concrete<T: Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
		self.next_object()?.downcast::<T>()
	}

	/// Takes the next argument as an `Arc<dyn Trait>` view.
	pub fn view<I>(&mut self) -> DiResult<Arc<I>>
	where
		I: ?Sized + Send + Sync + 'static,
	{
		self.next_object()?.view::<I>()
	}

	/// Takes the next argument as a cloned plain value.
	pub fn value<T: Clone + Send + Sync + 'static>(&mut self) -> DiResult<T> {
		self.next_object()?.extract::<T>()
	}

	/// Remaining argument count.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Whether all arguments have been consumed.
	pub fn is_empty(&self) -> bool {
		self.items.len() == 0
	}
}

/// Descriptor for one registered type.
///
/// Concrete types are built with [`TypeBuilder`]; interfaces and abstract
/// types with [`TypeInfo::interface`].
#[derive(Clone)]
pub struct TypeInfo {
	pub(crate) name: Arc<str>,
	pub(crate) implements: Vec<String>,
	pub(crate) instantiable: bool,
	pub(crate) constructor: Option<MethodInfo>,
	pub(crate) construct: Option<ConstructFn>,
	pub(crate) allocate: Option<AllocateFn>,
	pub(crate) initialize: Option<InitializeFn>,
	pub(crate) methods: HashMap<String, (MethodInfo, InvokeFn)>,
	pub(crate) implemented_by: Option<String>,
	pub(crate) provided_by: Option<String>,
	pub(crate) upcasts: Arc<UpcastTable>,
}

impl TypeInfo {
	/// Descriptor for an interface or abstract type.
	///
	/// Not instantiable by itself; a rule's `instance_of` or a binding must
	/// map it to a concrete type, unless a just-in-time hint is declared.
	///
	/// # Examples
	///
	/// ```
	/// use armature::TypeInfo;
	///
	/// let info = TypeInfo::interface("LoggerInterface")
	/// 	.implemented_by("FileLogger");
	/// ```
	pub fn interface(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			implements: Vec::new(),
			instantiable: false,
			constructor: None,
			construct: None,
			allocate: None,
			initialize: None,
			methods: HashMap::new(),
			implemented_by: None,
			provided_by: None,
			upcasts: Arc::new(UpcastTable::default()),
		}
	}

	/// Declares a supertype of this interface.
	pub fn extends(mut self, name: &str) -> Self {
		self.implements.push(canonical(name));
		self
	}

	/// Just-in-time hint: the named concrete type implements this interface.
	pub fn implemented_by(mut self, name: &str) -> Self {
		self.implemented_by = Some(name.to_string());
		self
	}

	/// Just-in-time hint: instances of this interface come from the named
	/// provider type.
	pub fn provided_by(mut self, name: &str) -> Self {
		self.provided_by = Some(name.to_string());
		self
	}

	/// The registered type name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The constructor signature, if the type declares one.
	pub fn constructor(&self) -> Option<&MethodInfo> {
		self.constructor.as_ref()
	}

	pub(crate) fn method(&self, name: &str) -> Option<&(MethodInfo, InvokeFn)> {
		self.methods.get(&canonical(name))
	}

	pub(crate) fn instantiate(&self, args: Vec<Object>) -> DiResult<Object> {
		let construct = self
			.construct
			.as_ref()
			.ok_or_else(|| DiError::NotInstantiable(self.name.to_string()))?;
		let payload = construct(args)?;
		Ok(Object::from_parts(self.name.clone(), payload, self.upcasts.clone()))
	}

	/// Allocates an uninitialized instance, bypassing the constructor.
	pub(crate) fn allocate_uninitialized(&self) -> Option<Object> {
		let allocate = self.allocate.as_ref()?;
		Some(Object::from_parts(
			self.name.clone(),
			allocate(),
			self.upcasts.clone(),
		))
	}

	pub(crate) fn has_initializer(&self) -> bool {
		self.initialize.is_some()
	}

	pub(crate) fn run_initializer(&self, object: &Object, args: Vec<Object>) -> DiResult<()> {
		match &self.initialize {
			Some(initialize) => initialize(object.payload(), args),
			None => Ok(()),
		}
	}
}

/// Builder for a concrete type descriptor.
///
/// # Examples
///
/// ```
/// use armature::{ParamInfo, TypeBuilder};
///
/// struct Counter {
/// 	start: i32,
/// }
///
/// let info = TypeBuilder::<Counter>::new("Counter")
/// 	.constructor(vec![ParamInfo::untyped("start")], |args| {
/// 		Ok(Counter {
/// 			start: args.value::<i32>()?,
/// 		})
/// 	})
/// 	.build();
/// assert_eq!(info.name(), "Counter");
/// ```
pub struct TypeBuilder<T: Send + Sync + 'static> {
	name: Arc<str>,
	implements: Vec<String>,
	constructor: Option<MethodInfo>,
	construct: Option<ConstructFn>,
	allocate: Option<AllocateFn>,
	initialize: Option<InitializeFn>,
	methods: HashMap<String, (MethodInfo, InvokeFn)>,
	upcasts: UpcastTable,
	_marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeBuilder<T> {
	/// Starts a descriptor for the concrete type `T` under the given name.
	pub fn new(name: &str) -> Self {
		Self {
			name: Arc::from(name),
			implements: Vec::new(),
			constructor: None,
			construct: None,
			allocate: None,
			initialize: None,
			methods: HashMap::new(),
			upcasts: UpcastTable::default(),
			_marker: PhantomData,
		}
	}

	/// Declares that `T` implements the named interface, with the coercion
	/// used to hand out `Arc<dyn Trait>` views of constructed instances.
	pub fn implements<I, F>(mut self, interface: &str, cast: F) -> Self
	where
		I: ?Sized + Send + Sync + 'static,
		F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
	{
		self.implements.push(canonical(interface));
		let cast: UpcastFn = Arc::new(move |payload: &Payload| {
			payload
				.clone()
				.downcast::<T>()
				.ok()
				.map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
		});
		self.upcasts.insert(TypeId::of::<Arc<I>>(), cast);
		self
	}

	/// Declares a plain supertype relation with no trait view.
	pub fn extends(mut self, name: &str) -> Self {
		self.implements.push(canonical(name));
		self
	}

	/// Declares the constructor signature and body.
	pub fn constructor<F>(mut self, params: Vec<ParamInfo>, build: F) -> Self
	where
		F: Fn(&mut ArgList) -> DiResult<T> + Send + Sync + 'static,
	{
		self.constructor = Some(MethodInfo::new("new", params));
		self.construct = Some(Arc::new(move |items| {
			let mut args = ArgList::new(items);
			build(&mut args).map(|value| Arc::new(value) as Payload)
		}));
		self
	}

	/// Declares two-phase construction: allocate an uninitialized instance,
	/// then run constructor-equivalent initialization against it.
	///
	/// The container uses this path for shared rules so the allocated
	/// singleton is visible (to itself and to post-construction calls)
	/// before initialization runs. A narrow escape hatch for
	/// self-referential injection, not a general pattern; `T` needs
	/// interior mutability for the initializer to be useful.
	pub fn two_phase<A, F>(mut self, allocate: A, params: Vec<ParamInfo>, initialize: F) -> Self
	where
		A: Fn() -> T + Send + Sync + 'static,
		F: Fn(&T, &mut ArgList) -> DiResult<()> + Send + Sync + 'static,
	{
		self.constructor = Some(MethodInfo::new("new", params));
		self.allocate = Some(Arc::new(move || Arc::new(allocate()) as Payload));
		self.initialize = Some(Arc::new(move |payload: &Payload, items| {
			let target = payload.downcast_ref::<T>().ok_or_else(|| DiError::TypeMismatch {
				expected: std::any::type_name::<T>().to_string(),
			})?;
			let mut args = ArgList::new(items);
			initialize(target, &mut args)
		}));
		self
	}

	/// Declares a named method usable in post-construction `call` entries.
	pub fn method<F>(mut self, name: &str, params: Vec<ParamInfo>, invoke: F) -> Self
	where
		F: Fn(&T, &mut ArgList) -> DiResult<()> + Send + Sync + 'static,
	{
		let info = MethodInfo::new(name, params);
		let invoke: InvokeFn = Arc::new(move |payload: &Payload, items| {
			let target = payload.downcast_ref::<T>().ok_or_else(|| DiError::TypeMismatch {
				expected: std::any::type_name::<T>().to_string(),
			})?;
			let mut args = ArgList::new(items);
			invoke(target, &mut args)
		});
		self.methods.insert(canonical(name), (info, invoke));
		self
	}

	/// Finishes the descriptor.
	///
	/// When only two-phase construction was declared, a one-shot construct
	/// path (allocate then initialize) is synthesized so the type is also
	/// constructible under non-shared rules.
	pub fn build(self) -> TypeInfo {
		let construct = match (self.construct, &self.allocate, &self.initialize) {
			(Some(construct), _, _) => Some(construct),
			(None, Some(allocate), Some(initialize)) => {
				let allocate = allocate.clone();
				let initialize = initialize.clone();
				Some(Arc::new(move |items: Vec<Object>| {
					let payload = allocate();
					initialize(&payload, items)?;
					Ok(payload)
				}) as ConstructFn)
			}
			(None, Some(allocate), None) => {
				let allocate = allocate.clone();
				Some(Arc::new(move |_items: Vec<Object>| Ok(allocate())) as ConstructFn)
			}
			(None, None, _) => None,
		};
		TypeInfo {
			name: self.name,
			implements: self.implements,
			instantiable: true,
			constructor: self.constructor,
			construct,
			allocate: self.allocate,
			initialize: self.initialize,
			methods: self.methods,
			implemented_by: None,
			provided_by: None,
			upcasts: Arc::new(self.upcasts),
		}
	}
}

/// Registry of type descriptors: the reflection capability the container
/// consults for signatures, subtype relations, and instantiation.
///
/// Registration uses interior mutability so a registry can keep growing
/// behind the `Arc` a container holds.
#[derive(Default)]
pub struct TypeRegistry {
	types: RwLock<HashMap<String, Arc<TypeInfo>>>,
}

impl TypeRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or overwrites) a type descriptor.
	pub fn register(&self, info: TypeInfo) {
		let key = canonical(&info.name);
		let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
		types.insert(key, Arc::new(info));
	}

	/// Looks up a descriptor by name, case-insensitively.
	pub fn lookup(&self, name: &str) -> Option<Arc<TypeInfo>> {
		let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
		types.get(&canonical(name)).cloned()
	}

	/// Strict subtype check: walks declared supertypes transitively.
	/// `is_subclass_of(t, t)` is false.
	pub fn is_subclass_of(&self, sub: &str, ancestor: &str) -> bool {
		let sub = canonical(sub);
		let ancestor = canonical(ancestor);
		if sub == ancestor {
			return false;
		}
		let mut pending = match self.lookup(&sub) {
			Some(info) => info.implements.clone(),
			None => return false,
		};
		let mut seen = Vec::new();
		while let Some(parent) = pending.pop() {
			if parent == ancestor {
				return true;
			}
			if seen.contains(&parent) {
				continue;
			}
			if let Some(info) = self.lookup(&parent) {
				pending.extend(info.implements.iter().cloned());
			}
			seen.push(parent);
		}
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct Animal;
	struct Dog;

	#[rstest]
	#[case("Counter", "counter")]
	#[case("\\App\\Logger", "app\\logger")]
	#[case("::http::Client", "http::client")]
	#[case("*", "*")]
	fn canonical_names(#[case] raw: &str, #[case] expected: &str) {
		assert_eq!(canonical(raw), expected);
	}

	fn registry_with_hierarchy() -> TypeRegistry {
		let registry = TypeRegistry::new();
		registry.register(TypeBuilder::<Animal>::new("Animal").constructor(vec![], |_| Ok(Animal)).build());
		registry.register(
			TypeBuilder::<Dog>::new("Dog")
				.extends("Animal")
				.constructor(vec![], |_| Ok(Dog))
				.build(),
		);
		registry
	}

	#[test]
	fn subclass_check_is_strict_and_transitive() {
		let registry = registry_with_hierarchy();
		registry.register(TypeInfo::interface("Pet").extends("Animal"));
		registry.register(
			TypeBuilder::<Dog>::new("Spaniel").extends("Dog").constructor(vec![], |_| Ok(Dog)).build(),
		);

		assert!(registry.is_subclass_of("Dog", "Animal"));
		assert!(registry.is_subclass_of("Spaniel", "Animal"));
		assert!(registry.is_subclass_of("pet", "ANIMAL"));
		assert!(!registry.is_subclass_of("Animal", "Animal"));
		assert!(!registry.is_subclass_of("Animal", "Dog"));
		assert!(!registry.is_subclass_of("Unknown", "Animal"));
	}

	#[test]
	fn lookup_is_case_insensitive() {
		let registry = registry_with_hierarchy();
		assert!(registry.lookup("DOG").is_some());
		assert!(registry.lookup("missing").is_none());
	}

	#[test]
	fn arglist_consumes_left_to_right() {
		let mut args = ArgList::new(vec![Object::literal(1i32), Object::literal("two".to_string())]);
		assert_eq!(args.len(), 2);
		assert_eq!(args.value::<i32>().unwrap(), 1);
		assert_eq!(args.value::<String>().unwrap(), "two");
		assert!(args.is_empty());
		assert!(args.next_object().is_err());
	}

	#[test]
	fn interface_descriptor_is_not_instantiable() {
		let info = TypeInfo::interface("LoggerInterface");
		let err = info.instantiate(Vec::new()).unwrap_err();
		assert!(matches!(err, DiError::NotInstantiable(name) if name == "LoggerInterface"));
	}

	#[test]
	fn two_phase_synthesizes_one_shot_construction() {
		use std::sync::Mutex;

		struct Slot {
			value: Mutex<Option<i32>>,
		}

		let info = TypeBuilder::<Slot>::new("Slot")
			.two_phase(
				|| Slot {
					value: Mutex::new(None),
				},
				vec![ParamInfo::untyped("value")],
				|slot, args| {
					*slot.value.lock().unwrap() = Some(args.value::<i32>()?);
					Ok(())
				},
			)
			.build();

		let object = info.instantiate(vec![Object::literal(9i32)]).unwrap();
		let slot = object.downcast::<Slot>().unwrap();
		assert_eq!(*slot.value.lock().unwrap(), Some(9));
	}
}
