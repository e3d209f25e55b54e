//! In-process runtime model.
//!
//! This module provides the pieces of an embedded dynamic runtime that native
//! bindings talk to: values, objects with native data slots, classes with
//! method tables, and the call entry points.
//!
//! ## Key Types
//!
//! - [`Value`]: Dynamically typed runtime value
//! - [`ObjectRef`]: Reference-counted object handle with a native data slot
//! - [`DataType`]: Name and release callback of a native payload
//! - [`NativeFn`]: Type-erased callable installed in a method table
//! - [`CallContext`]: Receiver and raw arguments of one call
//! - [`Vm`]: Class table, constant lookup and dispatch

mod call_context;
mod class;
mod native_fn;
mod object;
mod value;
mod vm;

pub use call_context::CallContext;
pub use class::{ArgSpec, ClassFlags, ClassId, MethodEntry, RClass};
pub use native_fn::{NativeCallable, NativeFn};
pub use object::{DataError, DataType, ObjectRef};
pub use value::Value;
pub use vm::{INITIALIZE, Vm};
