//! Core building blocks shared by every bookshelf crate: the [`Module`] trait,
//! the [`ModuleRegistry`] that drives module lifecycles, and layered [`settings`].

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module, SchemaDefinition};
pub use registry::ModuleRegistry;
