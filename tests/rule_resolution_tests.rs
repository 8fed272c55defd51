//! Rule lookup: exact match, inheritance, wildcard, insertion order
//!
//! These tests verify that:
//! 1. Exact canonical matches win over everything else
//! 2. Inheritable rules apply to strict subclasses, and only when enabled
//! 3. The wildcard rule applies only when nothing more specific matches
//! 4. The inheritance scan runs in rule-registration order

use armature::{Container, Rule, TypeBuilder, TypeInfo, TypeRegistry};
use std::sync::Arc;

struct Animal;
struct Dog;

fn hierarchy_registry() -> Arc<TypeRegistry> {
	let registry = TypeRegistry::new();
	registry.register(
		TypeBuilder::<Animal>::new("Animal")
			.constructor(vec![], |_| Ok(Animal))
			.build(),
	);
	registry.register(TypeInfo::interface("Pet"));
	registry.register(
		TypeBuilder::<Dog>::new("Dog")
			.extends("Animal")
			.extends("Pet")
			.constructor(vec![], |_| Ok(Dog))
			.build(),
	);
	Arc::new(registry)
}

#[test]
fn exact_match_wins_over_inherited_and_wildcard() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("Animal", Rule::new().shared());
	container.add_rule("*", Rule::new().shared());
	container.add_rule("Dog", Rule::new());

	let rule = container.rule_for("Dog");

	assert!(!rule.shared);
}

#[test]
fn inheritable_rule_applies_to_strict_subclass() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("Animal", Rule::new().shared());

	assert!(container.rule_for("Dog").shared);

	let first = container.create("Dog").unwrap();
	let second = container.create("Dog").unwrap();
	assert!(first.same_instance(&second));
}

#[test]
fn inheritance_disabled_rule_is_skipped() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("Animal", Rule::new().shared().inherit(false));

	assert!(!container.rule_for("Dog").shared);

	let first = container.create("Dog").unwrap();
	let second = container.create("Dog").unwrap();
	assert!(!first.same_instance(&second));
}

#[test]
fn rules_with_instance_of_are_excluded_from_the_inheritance_scan() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("Animal", Rule::new().shared().instance_of("Dog"));

	// The override rule applies only to exact requests for Animal.
	assert!(!container.rule_for("Dog").shared);
	assert_eq!(container.create("Animal").unwrap().type_name(), Some("Dog"));
}

#[test]
fn wildcard_applies_only_without_a_more_specific_match() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("*", Rule::new().shared());

	// No exact or inherited rule for Animal: wildcard applies.
	assert!(container.rule_for("Animal").shared);

	let container = Container::new(hierarchy_registry());
	container.add_rule("*", Rule::new().shared());
	container.add_rule("Animal", Rule::new());

	// Exact rule shadows the wildcard for Animal and, via inheritance,
	// for its subclasses.
	assert!(!container.rule_for("Animal").shared);
	assert!(!container.rule_for("Dog").shared);
}

#[test]
fn inheritance_scan_runs_in_registration_order() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("Pet", Rule::new());
	container.add_rule("Animal", Rule::new().shared());

	// Dog is a strict subclass of both; the earlier-registered Pet rule
	// wins.
	assert!(!container.rule_for("Dog").shared);

	let container = Container::new(hierarchy_registry());
	container.add_rule("Animal", Rule::new().shared());
	container.add_rule("Pet", Rule::new());

	assert!(container.rule_for("Dog").shared);
}

#[test]
fn rule_keys_are_namespace_trimmed() {
	let container = Container::new(hierarchy_registry());
	container.add_rule("::Animal", Rule::new().shared());

	assert!(container.rule_for("Animal").shared);
	assert!(container.rule_for("animal").shared);
}

#[test]
fn absent_configuration_yields_usable_defaults() {
	let container = Container::new(hierarchy_registry());

	let rule = container.rule_for("Animal");

	assert!(!rule.shared);
	assert!(rule.inherit);
	assert!(rule.substitutions.is_empty());
	assert!(container.create("Animal").is_ok());
}
