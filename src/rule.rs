//! Per-type construction rules

use std::collections::HashMap;

use crate::reflect::canonical;
use crate::value::ParamValue;

/// Configuration controlling how a type is resolved and constructed.
///
/// A rule is registered under a type name with
/// [`Container::add_rule`](crate::Container::add_rule) before the type's
/// first use; once the container has compiled a construction factory for a
/// type, later rule changes do not affect it.
///
/// All fields are public; the chainable methods exist for the common
/// configuration flow.
///
/// # Examples
///
/// ```
/// use armature::{ParamValue, Rule};
///
/// let rule = Rule::new()
/// 	.shared()
/// 	.substitute("LoggerInterface", ParamValue::instance("FileLogger"))
/// 	.call("warm_up", vec![]);
/// assert!(rule.shared);
/// assert!(rule.inherit);
/// ```
#[derive(Clone, Debug)]
pub struct Rule {
	/// Construct at most once and reuse the instance (singleton).
	pub shared: bool,
	/// Concrete type to instantiate instead of the requested name.
	pub instance_of: Option<String>,
	/// Ordered values appended to the caller-supplied argument buffer.
	pub construct_params: Vec<ParamValue>,
	/// Replacement values per declared parameter type, keyed canonically.
	pub substitutions: HashMap<String, ParamValue>,
	/// Types constructed once per resolution and injected wherever their
	/// type matches.
	pub share_instances: Vec<String>,
	/// Types always constructed fresh even under a shared scope.
	pub new_instances: Vec<String>,
	/// Post-construction calls: (method name, argument list), in order.
	pub calls: Vec<(String, Vec<ParamValue>)>,
	/// Whether strict subclasses of this rule's key inherit it.
	pub inherit: bool,
}

impl Default for Rule {
	fn default() -> Self {
		Self {
			shared: false,
			instance_of: None,
			construct_params: Vec::new(),
			substitutions: HashMap::new(),
			share_instances: Vec::new(),
			new_instances: Vec::new(),
			calls: Vec::new(),
			inherit: true,
		}
	}
}

impl Rule {
	/// An empty rule: not shared, inheritable, no overrides.
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks the rule shared: at most one instance is constructed and
	/// reused, unless a fresh instance is explicitly forced.
	pub fn shared(mut self) -> Self {
		self.shared = true;
		self
	}

	/// Instantiates the named concrete type instead of the requested one.
	pub fn instance_of(mut self, type_name: impl Into<String>) -> Self {
		self.instance_of = Some(type_name.into());
		self
	}

	/// Appends a constructor parameter value.
	pub fn construct_param(mut self, value: ParamValue) -> Self {
		self.construct_params.push(value);
		self
	}

	/// Substitutes the given value wherever a parameter declares the type.
	pub fn substitute(mut self, type_name: &str, value: ParamValue) -> Self {
		self.substitutions.insert(canonical(type_name), value);
		self
	}

	/// Constructs the named type once per resolution and injects it
	/// wherever its type matches.
	pub fn share_instance(mut self, type_name: impl Into<String>) -> Self {
		self.share_instances.push(type_name.into());
		self
	}

	/// Forces fresh construction of the named type even when it is shared.
	pub fn new_instance(mut self, type_name: impl Into<String>) -> Self {
		self.new_instances.push(type_name.into());
		self
	}

	/// Appends a post-construction method call.
	pub fn call(mut self, method: &str, args: Vec<ParamValue>) -> Self {
		self.calls.push((method.to_string(), args));
		self
	}

	/// Controls whether strict subclasses inherit this rule (on by default).
	pub fn inherit(mut self, inherit: bool) -> Self {
		self.inherit = inherit;
		self
	}

	pub(crate) fn substitution_for(&self, canonical_type: &str) -> Option<&ParamValue> {
		self.substitutions.get(canonical_type)
	}

	pub(crate) fn forces_new_instance(&self, canonical_type: &str) -> bool {
		self.new_instances.iter().any(|name| canonical(name) == canonical_type)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_rule_inherits() {
		let rule = Rule::default();
		assert!(rule.inherit);
		assert!(!rule.shared);
		assert!(rule.instance_of.is_none());
	}

	#[test]
	fn substitutions_are_keyed_case_insensitively() {
		let rule = Rule::new().substitute("LoggerInterface", ParamValue::instance("FileLogger"));
		assert!(rule.substitution_for("loggerinterface").is_some());
	}

	#[test]
	fn new_instance_match_ignores_case() {
		let rule = Rule::new().new_instance("Session");
		assert!(rule.forces_new_instance("session"));
		assert!(!rule.forces_new_instance("request"));
	}
}
