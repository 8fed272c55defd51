//! Error types for dependency resolution

/// Result alias used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;

/// Errors raised while resolving or constructing dependencies.
///
/// A resolution failure aborts the outermost `create` call; no partially
/// constructed object is ever returned. Resolution is deterministic for a
/// fixed rule set, so a repeated failure repeats identically.
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	/// A required constructor/method parameter had no matching explicit
	/// argument, substitution, or constructible type.
	#[error("cannot resolve dependency `{param}` of `{target}`: {reason}")]
	UnresolvableDependency {
		/// Type whose constructor or method was being resolved
		target: String,
		/// Name of the parameter that could not be satisfied
		param: String,
		/// What went wrong while satisfying it
		reason: String,
	},

	/// The requested type has never been registered with the type registry.
	#[error("type `{0}` is not registered")]
	NotRegistered(String),

	/// An interface or abstract type was requested with no rule or binding
	/// mapping it to a concrete type.
	#[error("type `{0}` is not instantiable and no rule maps it to a concrete type")]
	NotInstantiable(String),

	/// An interface-typed dependency has no explicit or just-in-time binding.
	#[error("no binding for `{type_name}`: {context}")]
	NotBound {
		/// The unbound interface or class name
		type_name: String,
		/// Where or why the binding was required
		context: String,
	},

	/// An optional dependency lacks a binding. Recoverable: callers substitute
	/// the declared default value instead of surfacing this.
	#[error("optional dependency `{0}` is not bound")]
	OptionalNotBound(String),

	/// A configured post-construction call names a method the type descriptor
	/// does not declare.
	#[error("type `{type_name}` has no method named `{method}`")]
	UnknownMethod {
		/// Type whose descriptor was searched
		type_name: String,
		/// The missing method name
		method: String,
	},

	/// A type-erased value could not be extracted as the requested type.
	#[error("value is not a `{expected}`")]
	TypeMismatch {
		/// The Rust type the caller asked for
		expected: String,
	},

	/// Failure inside a user-supplied factory, initializer, or provider.
	#[error("{message}")]
	Internal {
		/// Human-readable failure description
		message: String,
	},
}

impl DiError {
	/// Shorthand for [`DiError::Internal`], for use inside user factories.
	///
	/// # Examples
	///
	/// ```
	/// use armature::DiError;
	///
	/// let err = DiError::internal("connection pool exhausted");
	/// assert_eq!(err.to_string(), "connection pool exhausted");
	/// ```
	pub fn internal(message: impl Into<String>) -> Self {
		Self::Internal {
			message: message.into(),
		}
	}
}
