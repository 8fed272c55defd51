//! Precomputed parameter-resolution plans
//!
//! A [`Plan`] maps a constructor or method signature, under one rule, to a
//! resolution step per parameter. It is built once per (type, rule, method)
//! when the container compiles a construction factory, then executed on
//! every call against the caller-supplied arguments.

use std::sync::Arc;

use tracing::trace;

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::reflect::{MethodInfo, canonical};
use crate::rule::Rule;
use crate::value::{Object, ParamValue};

enum ParamStep {
	/// Untyped parameter: take the next remaining supplied argument.
	Positional {
		name: Arc<str>,
		default: Option<Object>,
	},
	/// Typed parameter: instance-of extraction, then substitution, then
	/// recursive construction.
	Typed {
		name: Arc<str>,
		declared: Arc<str>,
		declared_canonical: String,
		substitution: Option<ParamValue>,
		force_fresh: bool,
		default: Option<Object>,
	},
}

pub(crate) struct Plan {
	target: Arc<str>,
	steps: Vec<ParamStep>,
	construct_params: Vec<ParamValue>,
	share_instances: Vec<String>,
}

impl Plan {
	pub(crate) fn build(target: &Arc<str>, method: &MethodInfo, rule: &Rule) -> Self {
		let steps = method
			.params
			.iter()
			.map(|param| match &param.type_name {
				None => ParamStep::Positional {
					name: param.name.clone(),
					default: param.default.clone(),
				},
				Some(declared) => {
					let declared_canonical = canonical(declared);
					ParamStep::Typed {
						name: param.name.clone(),
						declared: declared.clone(),
						substitution: rule.substitution_for(&declared_canonical).cloned(),
						force_fresh: rule.forces_new_instance(&declared_canonical),
						declared_canonical,
						default: param.default.clone(),
					}
				}
			})
			.collect();
		Self {
			target: target.clone(),
			steps,
			construct_params: rule.construct_params.clone(),
			share_instances: rule.share_instances.clone(),
		}
	}

	/// Executes the plan: merges shared instances and configured
	/// constructor params into the supplied-argument buffer, then resolves
	/// each parameter in declaration order.
	pub(crate) fn materialize(&self, container: &Container, supplied: Vec<Object>) -> DiResult<Vec<Object>> {
		let share = self
			.share_instances
			.iter()
			.map(|name| container.create_with(name, Vec::new(), false))
			.collect::<DiResult<Vec<_>>>()?;

		let mut buffer = supplied;
		if !share.is_empty() || !self.construct_params.is_empty() {
			for value in &self.construct_params {
				buffer.push(container.expand(value, &share)?);
			}
			buffer.extend(share.iter().cloned());
		}

		let mut resolved = Vec::with_capacity(self.steps.len());
		for step in &self.steps {
			match step {
				ParamStep::Typed {
					name,
					declared,
					declared_canonical,
					substitution,
					force_fresh,
					default,
				} => {
					// Explicit arguments win, searched left to right so an
					// argument is consumed at most once.
					if let Some(position) = buffer
						.iter()
						.position(|arg| container.satisfies(arg, declared_canonical))
					{
						resolved.push(buffer.remove(position));
						continue;
					}
					if let Some(substitution) = substitution {
						trace!(target_type = %self.target, param = %name, "applying substitution");
						resolved.push(container.expand(substitution, &[])?);
						continue;
					}
					match container.create_with(declared, share.clone(), *force_fresh) {
						Ok(value) => resolved.push(value),
						Err(err) => match default {
							Some(value) => {
								trace!(
									target_type = %self.target,
									param = %name,
									"dependency unresolved, using declared default"
								);
								resolved.push(value.clone());
							}
							None => {
								return Err(DiError::UnresolvableDependency {
									target: self.target.to_string(),
									param: name.to_string(),
									reason: err.to_string(),
								});
							}
						},
					}
				}
				ParamStep::Positional { name, default } => {
					if !buffer.is_empty() {
						resolved.push(buffer.remove(0));
					} else if let Some(value) = default {
						resolved.push(value.clone());
					} else {
						return Err(DiError::UnresolvableDependency {
							target: self.target.to_string(),
							param: name.to_string(),
							reason: "no argument supplied for untyped parameter".to_string(),
						});
					}
				}
			}
		}
		Ok(resolved)
	}
}
