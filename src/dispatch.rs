//! Trampolines: the runtime-callable entry points generated per binding.
//!
//! Every bound name gets exactly one [`NativeFn`]. On invocation it checks
//! the argument count, converts the arguments left to right, runs the
//! callable and converts the result back. Errors never escape as panics;
//! they become the [`RuntimeError`] the script observes.

use std::any::Any;
use std::rc::Rc;

use bindery_core::{CallContext, DataType, NativeFn, RuntimeError, Value};

use crate::convert::{IntoValue, NativeType, ReturnContext};
use crate::error::NativeError;
use crate::options::BinderOptions;
use crate::registry::SharedRegistry;
use crate::signature::{ArgPack, MethodKind, NativeFunction, NativeMethod};

/// Result of a constructor: what ends up in the new object's data slot.
///
/// - `T`: the instance
/// - `Option<T>`: `None` leaves the slot empty
/// - `Result<T, E>`: `Err` raises and leaves the slot empty
pub trait Constructed: 'static {
    type Instance: NativeType;

    fn into_instance(self) -> Result<Option<Self::Instance>, NativeError>;
}

impl<T: NativeType> Constructed for T {
    type Instance = T;

    fn into_instance(self) -> Result<Option<T>, NativeError> {
        Ok(Some(self))
    }
}

impl<T: NativeType> Constructed for Option<T> {
    type Instance = T;

    fn into_instance(self) -> Result<Option<T>, NativeError> {
        Ok(self)
    }
}

impl<T, E> Constructed for Result<T, E>
where
    T: NativeType,
    E: Into<NativeError> + 'static,
{
    type Instance = T;

    fn into_instance(self) -> Result<Option<T>, NativeError> {
        self.map(Some).map_err(Into::into)
    }
}

/// Reject a call whose argument count differs from the declared arity.
pub(crate) fn check_arity(
    given: usize,
    expected: usize,
    options: &BinderOptions,
) -> Result<(), NativeError> {
    if options.arity_check && given != expected {
        return Err(NativeError::ArgumentCount { given, expected });
    }
    Ok(())
}

const fn original_in_range(original: Option<usize>, arity: usize) -> bool {
    match original {
        Some(index) => index < arity,
        None => true,
    }
}

/// Build the trampoline of a class or instance method.
pub(crate) fn method_trampoline<T, M, F>(
    f: F,
    options: BinderOptions,
    registry: SharedRegistry,
) -> NativeFn
where
    T: 'static,
    M: 'static,
    F: NativeMethod<T, M>,
{
    const {
        assert!(
            original_in_range(
                <<F as NativeMethod<T, M>>::Output as IntoValue>::ORIGINAL,
                <<F as NativeMethod<T, M>>::Args as ArgPack>::LEN,
            ),
            "Original<N> refers to an argument the callable does not declare"
        );
        assert!(
            !<<F as NativeMethod<T, M>>::Output as IntoValue>::RECEIVER
                || matches!(<F as NativeMethod<T, M>>::KIND, MethodKind::InstanceMethod),
            "only instance methods can return their Receiver"
        );
    };

    NativeFn::new(move |ctx: &CallContext<'_>| {
        invoke_method::<T, M, F>(&f, ctx, &options, &registry).map_err(RuntimeError::from)
    })
}

#[cfg_attr(feature = "profiling", profiling::function)]
fn invoke_method<T, M, F>(
    f: &F,
    ctx: &CallContext<'_>,
    options: &BinderOptions,
    registry: &SharedRegistry,
) -> Result<Value, NativeError>
where
    F: NativeMethod<T, M>,
{
    tracing::trace!(method = ctx.method(), argc = ctx.arg_count(), "native call");
    check_arity(ctx.arg_count(), <F::Args as ArgPack>::LEN, options)?;

    let args = <F::Args as ArgPack>::from_args(ctx.args(), options.coercion)?;
    let output = f.invoke(ctx.receiver(), args)?;

    let receiver = (F::KIND == MethodKind::InstanceMethod).then(|| ctx.receiver());
    output.into_value(&ReturnContext::new(receiver, ctx.args(), registry))
}

/// Build the `initialize` trampoline of a bound class.
pub(crate) fn constructor_trampoline<M, F>(
    ctor: F,
    options: BinderOptions,
    data_type: Rc<DataType>,
) -> NativeFn
where
    M: 'static,
    F: NativeFunction<M>,
    F::Output: Constructed,
{
    NativeFn::new(move |ctx: &CallContext<'_>| {
        invoke_constructor::<M, F>(&ctor, ctx, &options, &data_type).map_err(RuntimeError::from)
    })
}

#[cfg_attr(feature = "profiling", profiling::function)]
fn invoke_constructor<M, F>(
    ctor: &F,
    ctx: &CallContext<'_>,
    options: &BinderOptions,
    data_type: &Rc<DataType>,
) -> Result<Value, NativeError>
where
    F: NativeFunction<M>,
    F::Output: Constructed,
{
    let object = ctx
        .receiver()
        .as_object()
        .ok_or_else(|| NativeError::invalid_receiver("constructor needs a fresh object"))?;
    tracing::trace!(class = object.class_name(), argc = ctx.arg_count(), "native construct");

    object.set_data_type(data_type.clone())?;
    check_arity(ctx.arg_count(), <F::Args as ArgPack>::LEN, options)?;

    let args = <F::Args as ArgPack>::from_args(ctx.args(), options.coercion)?;
    let instance = NativeFunction::call(ctor, args).into_instance()?;
    if instance.is_none() {
        tracing::trace!(class = object.class_name(), "constructor produced no instance");
    }
    object.attach(instance.map(|instance| Box::new(instance) as Box<dyn Any>))?;
    Ok(Value::Nil)
}
