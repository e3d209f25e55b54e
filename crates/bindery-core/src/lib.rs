//! Core runtime types for the bindery binding layer.
//!
//! This crate models the embedded dynamic runtime that native bindings are
//! installed into. It has no knowledge of native signatures; the `bindery`
//! crate builds trampolines on top of [`NativeFn`] and [`CallContext`].
//!
//! - [`runtime`]: values, objects, classes and the [`Vm`]
//! - [`TypeHash`]: deterministic identity of classes and bound callables
//! - [`RuntimeError`] / [`DefinitionError`]: raised and definition-time errors

mod error;
pub mod runtime;
mod type_hash;

pub use error::{DefinitionError, RuntimeError};
pub use runtime::{
    ArgSpec, CallContext, ClassFlags, ClassId, DataError, DataType, INITIALIZE, MethodEntry,
    NativeCallable, NativeFn, ObjectRef, RClass, Value, Vm,
};
pub use type_hash::{TypeHash, hash_constants};
