//! # Armature
//!
//! Rule-driven dependency injection with descriptor-based reflection.
//!
//! ## Features
//!
//! - **Rules**: per-type configuration for sharing, substitutions,
//!   constructor params, post-construction calls, and inheritance
//! - **Plans**: parameter resolution is compiled once per type and cached
//! - **Scoped**: shared (singleton) instances with explicit fresh-instance
//!   override
//! - **Composable**: dependencies resolve recursively, depth-first
//! - **Bindings**: an optional richer layer with interface bindings,
//!   providers, and just-in-time resolution
//!
//! ## Example
//!
//! ```
//! use armature::{Container, Object, ParamInfo, Rule, TypeBuilder, TypeRegistry};
//! use std::sync::Arc;
//!
//! struct Engine;
//!
//! struct Car {
//! 	engine: Arc<Engine>,
//! 	plate: String,
//! }
//!
//! let registry = Arc::new(TypeRegistry::new());
//! registry.register(
//! 	TypeBuilder::<Engine>::new("Engine")
//! 		.constructor(vec![], |_| Ok(Engine))
//! 		.build(),
//! );
//! registry.register(
//! 	TypeBuilder::<Car>::new("Car")
//! 		.constructor(
//! 			vec![ParamInfo::typed("engine", "Engine"), ParamInfo::untyped("plate")],
//! 			|args| {
//! 				Ok(Car {
//! 					engine: args.concrete::<Engine>()?,
//! 					plate: args.value::<String>()?,
//! 				})
//! 			},
//! 		)
//! 		.build(),
//! );
//!
//! let container = Container::new(registry);
//! let car = container
//! 	.create_with("Car", vec![Object::literal("AB-123".to_string())], false)
//! 	.unwrap()
//! 	.downcast::<Car>()
//! 	.unwrap();
//! assert_eq!(car.plate, "AB-123");
//! ```
//!
//! The untyped `plate` parameter consumed the explicit argument; the typed
//! `engine` parameter was constructed recursively. Rules change how that
//! resolution happens (see [`Rule`]), and [`binder::Binder`] layers
//! explicit interface bindings on top.

pub mod binder;
mod container;
mod error;
mod plan;
mod reflect;
mod rule;
mod value;

pub use container::Container;
pub use error::{DiError, DiResult};
pub use reflect::{ArgList, MethodInfo, ParamInfo, TypeBuilder, TypeInfo, TypeRegistry};
pub use rule::Rule;
pub use value::{Object, ParamValue, ProviderFn};
