//! Native function storage and callable trait.

use std::fmt;
use std::rc::Rc;

use super::{CallContext, Value};
use crate::RuntimeError;

/// Type-erased native function installed in a method table.
///
/// Wraps any [`NativeCallable`] so functions of different shapes are stored
/// uniformly. Cloning shares the underlying callable.
#[derive(Clone)]
pub struct NativeFn {
    inner: Rc<dyn NativeCallable>,
}

impl NativeFn {
    /// Create a new NativeFn from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Value, RuntimeError> + 'static,
    {
        Self { inner: Rc::new(f) }
    }

    /// Create a new NativeFn from any [`NativeCallable`].
    pub fn from_callable<C>(callable: C) -> Self
    where
        C: NativeCallable + 'static,
    {
        Self {
            inner: Rc::new(callable),
        }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &CallContext<'_>) -> Result<Value, RuntimeError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// Trait for callable native functions.
///
/// The runtime hands every call a [`CallContext`] holding the receiver and
/// the raw argument list; the callee returns the result value or raises.
pub trait NativeCallable {
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, RuntimeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&CallContext<'_>) -> Result<Value, RuntimeError>,
{
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, RuntimeError> {
        (self)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_fn_call() {
        let native = NativeFn::new(|ctx: &CallContext<'_>| {
            let sum = ctx.args().iter().filter_map(Value::as_int).sum::<i64>();
            Ok(Value::Int(sum))
        });

        let args = [Value::Int(10), Value::Int(20)];
        let ctx = CallContext::new(&Value::Nil, "sum", &args);
        assert_eq!(native.call(&ctx).unwrap(), Value::Int(30));
    }

    struct Constant(i64);

    impl NativeCallable for Constant {
        fn call(&self, _ctx: &CallContext<'_>) -> Result<Value, RuntimeError> {
            Ok(Value::Int(self.0))
        }
    }

    #[test]
    fn native_fn_from_callable() {
        let native = NativeFn::from_callable(Constant(9));
        let ctx = CallContext::new(&Value::Nil, "nine", &[]);
        assert_eq!(native.call(&ctx).unwrap(), Value::Int(9));
    }

    #[test]
    fn native_fn_clone_shares_callable() {
        let native = NativeFn::new(|_: &CallContext<'_>| Ok(Value::Bool(true)));
        let copy = native.clone();
        let ctx = CallContext::new(&Value::Nil, "t", &[]);
        assert_eq!(copy.call(&ctx).unwrap(), Value::Bool(true));
        assert!(format!("{:?}", native).contains("NativeFn"));
    }
}
