//! Native bindings for an embedded dynamic runtime.
//!
//! `bindery` exposes Rust functions, methods and constructors to the runtime
//! modelled by [`bindery_core`]. Each bound callable's arity, parameter types
//! and return type are deduced from its Rust type; the generated trampoline
//! checks the argument count, converts the arguments, runs the callable and
//! converts the result back.
//!
//! # Example
//!
//! ```
//! use bindery::prelude::*;
//!
//! #[derive(NativeType)]
//! #[bindery(name = "Counter")]
//! struct Counter {
//!     count: i64,
//! }
//!
//! let mut vm = Vm::new();
//! Binder::new(&mut vm)
//!     .bind_class("Counter", |start: i64| Counter { count: start })?
//!     .bind("add", |c: &mut Counter, n: i64| c.count += n)?
//!     .bind("count", |c: &Counter| c.count)?;
//!
//! let counter = vm.call(&vm.class_value("Counter")?, "new", &[Value::Int(1)])?;
//! vm.call(&counter, "add", &[Value::Int(2)])?;
//! assert_eq!(vm.call(&counter, "count", &[])?, Value::Int(3));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

extern crate self as bindery;

mod binder;
mod convert;
mod dispatch;
mod error;
mod options;
pub mod registry;
mod signature;

pub use binder::{Binder, ClassBinder, NoInstance};
pub use convert::{
    FromValue, IntoValue, NativeType, Original, Owned, Receiver, ReturnContext, ScriptType,
};
pub use dispatch::Constructed;
pub use error::{ConversionError, NativeError, RegistrationError};
pub use options::{BinderOptions, Coercion};
pub use registry::{BoundCallable, SharedRegistry, TypeDescriptor, TypeRegistry};
pub use signature::{
    ArgPack, Exclusive, MethodKind, NativeFunction, NativeMethod, Shared, Signature, Static,
    TypeInfo,
};

pub use bindery_core::{
    ArgSpec, CallContext, ClassFlags, ClassId, DataError, DataType, DefinitionError, NativeFn,
    ObjectRef, RuntimeError, TypeHash, Value, Vm,
};
pub use bindery_macros::NativeType;

/// Everything needed to bind native code and drive calls.
pub mod prelude {
    pub use crate::{
        Binder, BinderOptions, Coercion, NativeType, Original, Owned, Receiver,
        RegistrationError, RuntimeError, Value, Vm,
    };
}
