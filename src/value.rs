//! Type-erased values exchanged with the container
//!
//! Every instance or literal flowing through the container is an [`Object`]:
//! an `Arc<dyn Any>` payload plus an optional type tag. Instances produced
//! from a registered descriptor carry their type name and the descriptor's
//! upcast table, so consumers can extract `Arc<dyn Trait>` views. Literals
//! carry no tag and therefore never satisfy a typed parameter.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::error::{DiError, DiResult};

/// Erased payload shared between values and descriptor closures.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Erased upcast: concrete payload -> boxed `Arc<dyn Trait>` view.
pub(crate) type UpcastFn = Arc<dyn Fn(&Payload) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Per-type table of trait views, keyed by `TypeId` of the `Arc<dyn Trait>`.
#[derive(Clone, Default)]
pub(crate) struct UpcastTable {
	casts: HashMap<TypeId, UpcastFn>,
}

impl UpcastTable {
	pub(crate) fn insert(&mut self, key: TypeId, cast: UpcastFn) {
		self.casts.insert(key, cast);
	}

	fn get(&self, key: &TypeId) -> Option<&UpcastFn> {
		self.casts.get(key)
	}
}

/// A type-erased instance or literal.
///
/// Cloning an `Object` clones the handle, not the payload: two clones refer
/// to the same underlying instance.
///
/// # Examples
///
/// ```
/// use armature::Object;
///
/// let value = Object::literal(42i32);
/// assert_eq!(value.extract::<i32>().unwrap(), 42);
/// assert!(value.type_name().is_none());
/// ```
#[derive(Clone)]
pub struct Object {
	type_name: Option<Arc<str>>,
	payload: Payload,
	upcasts: Arc<UpcastTable>,
}

impl Object {
	/// Wraps an eager value with no type tag.
	///
	/// Literals are consumed positionally by untyped parameters and never
	/// match a typed parameter by instance-of check.
	pub fn literal<T: Send + Sync + 'static>(value: T) -> Self {
		Self {
			type_name: None,
			payload: Arc::new(value),
			upcasts: Arc::new(UpcastTable::default()),
		}
	}

	/// Wraps an instance under a registered type name, without going through
	/// the container. Useful for feeding pre-built instances as explicit
	/// arguments so they match typed parameters.
	///
	/// # Examples
	///
	/// ```
	/// use armature::Object;
	///
	/// struct Clock;
	/// let value = Object::tagged("Clock", Clock);
	/// assert_eq!(value.type_name(), Some("Clock"));
	/// ```
	pub fn tagged<T: Send + Sync + 'static>(type_name: &str, value: T) -> Self {
		Self {
			type_name: Some(Arc::from(type_name)),
			payload: Arc::new(value),
			upcasts: Arc::new(UpcastTable::default()),
		}
	}

	pub(crate) fn from_parts(type_name: Arc<str>, payload: Payload, upcasts: Arc<UpcastTable>) -> Self {
		Self {
			type_name: Some(type_name),
			payload,
			upcasts,
		}
	}

	/// The registered type name this value was constructed under, if any.
	pub fn type_name(&self) -> Option<&str> {
		self.type_name.as_deref()
	}

	pub(crate) fn payload(&self) -> &Payload {
		&self.payload
	}

	/// Whether two values refer to the same underlying instance.
	pub fn same_instance(&self, other: &Object) -> bool {
		Arc::ptr_eq(&self.payload, &other.payload)
	}

	/// Downcasts to the concrete payload type.
	pub fn downcast<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.payload.clone().downcast::<T>().map_err(|_| DiError::TypeMismatch {
			expected: std::any::type_name::<T>().to_string(),
		})
	}

	/// Clones the payload out as `T`. Works for literals and concrete
	/// instances alike.
	pub fn extract<T: Clone + Send + Sync + 'static>(&self) -> DiResult<T> {
		self.payload
			.downcast_ref::<T>()
			.cloned()
			.ok_or_else(|| DiError::TypeMismatch {
				expected: std::any::type_name::<T>().to_string(),
			})
	}

	/// Extracts an `Arc<dyn Trait>` view registered on the type descriptor.
	///
	/// Falls back to a direct downcast, so a literal that already holds an
	/// `Arc<dyn Trait>` is returned as-is.
	pub fn view<I>(&self) -> DiResult<Arc<I>>
	where
		I: ?Sized + Send + Sync + 'static,
	{
		if let Some(direct) = self.payload.downcast_ref::<Arc<I>>() {
			return Ok(direct.clone());
		}
		let key = TypeId::of::<Arc<I>>();
		let cast = self.upcasts.get(&key).ok_or_else(|| DiError::TypeMismatch {
			expected: std::any::type_name::<Arc<I>>().to_string(),
		})?;
		let boxed = cast(&self.payload).ok_or_else(|| DiError::TypeMismatch {
			expected: std::any::type_name::<Arc<I>>().to_string(),
		})?;
		boxed
			.downcast::<Arc<I>>()
			.map(|arc| *arc)
			.map_err(|_| DiError::TypeMismatch {
				expected: std::any::type_name::<Arc<I>>().to_string(),
			})
	}
}

impl fmt::Debug for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Object")
			.field("type_name", &self.type_name)
			.finish_non_exhaustive()
	}
}

/// Provider closure invoked with the container at resolution time.
pub type ProviderFn = Arc<dyn Fn(&Container) -> DiResult<Object> + Send + Sync>;

/// A deferred value usable inside rule configuration.
///
/// Rules never embed eager dependency instances; they hold one of these
/// variants and the container expands it when the owning plan executes.
#[derive(Clone)]
pub enum ParamValue {
	/// An eager value used as-is.
	Literal(Object),
	/// Deferred reference: an instance of the named type, constructed at
	/// resolution time.
	Instance(String),
	/// Closure over the container, invoked at resolution time.
	Provider(ProviderFn),
}

impl ParamValue {
	/// Wraps an eager literal value.
	///
	/// # Examples
	///
	/// ```
	/// use armature::ParamValue;
	///
	/// let port = ParamValue::value(8080u16);
	/// ```
	pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
		Self::Literal(Object::literal(value))
	}

	/// Deferred reference to an instance of the named type.
	pub fn instance(type_name: impl Into<String>) -> Self {
		Self::Instance(type_name.into())
	}

	/// Wraps a provider closure.
	pub fn provider<F>(provider: F) -> Self
	where
		F: Fn(&Container) -> DiResult<Object> + Send + Sync + 'static,
	{
		Self::Provider(Arc::new(provider))
	}
}

impl fmt::Debug for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Literal(object) => f.debug_tuple("Literal").field(object).finish(),
			Self::Instance(name) => f.debug_tuple("Instance").field(name).finish(),
			Self::Provider(_) => f.write_str("Provider(..)"),
		}
	}
}
