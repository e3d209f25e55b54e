//! Compile-time signature deduction for native callables.
//!
//! Arity, parameter types and return type are read off a callable's Rust
//! type through the trait impls generated below; nothing is inspected at
//! runtime. A parameter type without a [`FromValue`] impl makes the binding
//! fail to compile.
//!
//! - [`NativeFunction`]: plain `Fn(A0, .., An) -> R` (module functions,
//!   class methods, constructors)
//! - [`NativeMethod`]: anything bindable on a class: the functions above, plus
//!   `Fn(&T, A1, ..) -> R` and `Fn(&mut T, A1, ..) -> R` instance methods
//! - [`ArgPack`]: tuple of converted arguments consumed by one call

use std::borrow::Cow;
use std::fmt;

use bindery_core::Value;

use crate::convert::{FromValue, IntoValue, NativeType, ScriptType};
use crate::error::{ConversionError, NativeError};
use crate::options::Coercion;

/// How a bound callable is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Runs `initialize` on a fresh object and fills its data slot
    Constructor,
    /// Called on the class or module itself; no receiver
    ClassMethod,
    /// Called on an object; the receiver is the native instance
    InstanceMethod,
}

impl MethodKind {
    /// Scope name used in diagnostics.
    pub fn scope(self) -> &'static str {
        match self {
            MethodKind::ClassMethod => "class",
            MethodKind::Constructor | MethodKind::InstanceMethod => "instance",
        }
    }
}

/// Type of one parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    name: Cow<'static, str>,
}

impl TypeInfo {
    pub fn of<T: ScriptType>() -> Self {
        Self {
            name: T::type_name(),
        }
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Deduced signature of a bound callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub kind: MethodKind,
    /// Native type of the receiver, for instance methods.
    pub receiver: Option<&'static str>,
    /// Parameters the script passes, receiver excluded.
    pub params: Vec<TypeInfo>,
    pub ret: TypeInfo,
}

impl Signature {
    /// Declared parameter count, receiver included.
    pub fn arity(&self) -> usize {
        self.params.len() + usize::from(self.receiver.is_some())
    }

    /// Number of arguments a script call must pass.
    pub fn script_arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        let mut first = true;
        if let Some(receiver) = self.receiver {
            write!(f, "&{}", receiver)?;
            first = false;
        }
        for param in &self.params {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
            first = false;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A tuple of native arguments converted from one call's argument list.
pub trait ArgPack: Sized {
    /// Number of arguments in the pack.
    const LEN: usize;

    fn params() -> Vec<TypeInfo>;

    /// Convert `args` left to right. The first failing conversion aborts and
    /// reports its position. Missing arguments read as `nil`.
    fn from_args(args: &[Value], coercion: Coercion) -> Result<Self, NativeError>;
}

/// A plain native function of up to twelve parameters.
///
/// `Marker` is the function-pointer type of the signature; it only exists to
/// keep the impls for different arities apart.
pub trait NativeFunction<Marker>: 'static {
    type Args: ArgPack;
    type Output;

    /// Declared parameter count.
    const ARITY: usize = <Self::Args as ArgPack>::LEN;

    fn call(&self, args: Self::Args) -> Self::Output;
}

/// Marker for class methods and module functions.
pub struct Static;

/// Marker for instance methods taking `&T`.
pub struct Shared;

/// Marker for instance methods taking `&mut T`.
pub struct Exclusive;

/// A callable bindable on a class whose native instances are `T`.
///
/// Whether it is a class or an instance method is decided here, from the
/// callable's first parameter type, once at registration.
pub trait NativeMethod<T, Marker>: 'static {
    const KIND: MethodKind;

    /// Declared parameter count, receiver included.
    const ARITY: usize;

    type Args: ArgPack;
    type Output: IntoValue;

    fn invoke(&self, receiver: &Value, args: Self::Args) -> Result<Self::Output, NativeError>;

    fn signature() -> Signature;
}

impl<T, M, F> NativeMethod<T, (Static, M)> for F
where
    F: NativeFunction<M>,
    <F as NativeFunction<M>>::Output: IntoValue,
{
    const KIND: MethodKind = MethodKind::ClassMethod;
    const ARITY: usize = <<F as NativeFunction<M>>::Args as ArgPack>::LEN;

    type Args = <F as NativeFunction<M>>::Args;
    type Output = <F as NativeFunction<M>>::Output;

    fn invoke(&self, _receiver: &Value, args: Self::Args) -> Result<Self::Output, NativeError> {
        Ok(self.call(args))
    }

    fn signature() -> Signature {
        Signature {
            kind: MethodKind::ClassMethod,
            receiver: None,
            params: <Self::Args as ArgPack>::params(),
            ret: TypeInfo::of::<Self::Output>(),
        }
    }
}

/// Receiver object of an instance call.
fn receiver_object(receiver: &Value) -> Result<&bindery_core::ObjectRef, NativeError> {
    receiver.as_object().ok_or_else(|| {
        NativeError::invalid_receiver(format!("expected an object, got {}", receiver.type_name()))
    })
}

fn argument_error(index: usize) -> impl FnOnce(ConversionError) -> NativeError {
    move |source| NativeError::Argument { index, source }
}

macro_rules! impl_signatures {
    ($len:expr; $($arg:ident : $idx:tt),*) => {
        impl<$($arg: FromValue),*> ArgPack for ($($arg,)*) {
            const LEN: usize = $len;

            fn params() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$arg>()),*]
            }

            #[allow(unused_variables)]
            fn from_args(args: &[Value], coercion: Coercion) -> Result<Self, NativeError> {
                let nil = Value::Nil;
                Ok(($(
                    $arg::from_value(args.get($idx).unwrap_or(&nil), coercion)
                        .map_err(argument_error($idx))?,
                )*))
            }
        }

        impl<F, R, $($arg),*> NativeFunction<fn($($arg),*) -> R> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            $($arg: FromValue,)*
        {
            type Args = ($($arg,)*);
            type Output = R;

            #[allow(non_snake_case)]
            fn call(&self, args: Self::Args) -> R {
                let ($($arg,)*) = args;
                (self)($($arg),*)
            }
        }

        impl<T, F, R, $($arg),*> NativeMethod<T, (Shared, fn(&T, $($arg),*) -> R)> for F
        where
            T: NativeType,
            F: Fn(&T, $($arg),*) -> R + 'static,
            R: IntoValue,
            $($arg: FromValue,)*
        {
            const KIND: MethodKind = MethodKind::InstanceMethod;
            const ARITY: usize = $len + 1;

            type Args = ($($arg,)*);
            type Output = R;

            #[allow(non_snake_case)]
            fn invoke(&self, receiver: &Value, args: Self::Args) -> Result<R, NativeError> {
                let ($($arg,)*) = args;
                let object = receiver_object(receiver)?;
                Ok(object.with_data::<T, _>(|this| (self)(this, $($arg),*))?)
            }

            fn signature() -> Signature {
                Signature {
                    kind: MethodKind::InstanceMethod,
                    receiver: Some(T::NAME),
                    params: <Self::Args as ArgPack>::params(),
                    ret: TypeInfo::of::<R>(),
                }
            }
        }

        impl<T, F, R, $($arg),*> NativeMethod<T, (Exclusive, fn(&mut T, $($arg),*) -> R)> for F
        where
            T: NativeType,
            F: Fn(&mut T, $($arg),*) -> R + 'static,
            R: IntoValue,
            $($arg: FromValue,)*
        {
            const KIND: MethodKind = MethodKind::InstanceMethod;
            const ARITY: usize = $len + 1;

            type Args = ($($arg,)*);
            type Output = R;

            #[allow(non_snake_case)]
            fn invoke(&self, receiver: &Value, args: Self::Args) -> Result<R, NativeError> {
                let ($($arg,)*) = args;
                let object = receiver_object(receiver)?;
                Ok(object.with_data_mut::<T, _>(|this| (self)(this, $($arg),*))?)
            }

            fn signature() -> Signature {
                Signature {
                    kind: MethodKind::InstanceMethod,
                    receiver: Some(T::NAME),
                    params: <Self::Args as ArgPack>::params(),
                    ret: TypeInfo::of::<R>(),
                }
            }
        }
    };
}

impl_signatures!(0;);
impl_signatures!(1; A0: 0);
impl_signatures!(2; A0: 0, A1: 1);
impl_signatures!(3; A0: 0, A1: 1, A2: 2);
impl_signatures!(4; A0: 0, A1: 1, A2: 2, A3: 3);
impl_signatures!(5; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
impl_signatures!(6; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);
impl_signatures!(7; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6);
impl_signatures!(8; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7);
impl_signatures!(9; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8);
impl_signatures!(10; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9);
impl_signatures!(11; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9, A10: 10);
impl_signatures!(12; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9, A10: 10, A11: 11);

/// Signature of a constructor filling the data slot with `type_name`.
pub(crate) fn constructor_signature<F, M>(type_name: &'static str) -> Signature
where
    F: NativeFunction<M>,
{
    Signature {
        kind: MethodKind::Constructor,
        receiver: None,
        params: <<F as NativeFunction<M>>::Args as ArgPack>::params(),
        ret: TypeInfo::named(type_name),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    struct Foo;

    impl NativeType for Foo {
        const NAME: &'static str = "Foo";
    }

    fn arity_of<F: NativeFunction<M>, M>(_: &F) -> usize {
        F::ARITY
    }

    fn method_kind<T, F: NativeMethod<T, M>, M>(_: &F) -> (MethodKind, usize) {
        (F::KIND, F::ARITY)
    }

    fn method_signature<T, F: NativeMethod<T, M>, M>(_: &F) -> Signature {
        F::signature()
    }

    #[test]
    fn function_arity_is_deduced() {
        assert_eq!(arity_of(&|| 1i32), 0);
        assert_eq!(arity_of(&|a: i32, b: f64| a as f64 + b), 2);
        assert_eq!(
            arity_of(&|_: Rc<str>, _: i32, _: f32, _: i32, _: i32, _: f32| ()),
            6
        );
    }

    #[test]
    fn first_parameter_decides_kind() {
        assert_eq!(
            method_kind::<Foo, _, _>(&|b: i32| b),
            (MethodKind::ClassMethod, 1)
        );
        assert_eq!(
            method_kind::<Foo, _, _>(&|_: &Foo, a: i32, b: i32, c: i32| a + b + c),
            (MethodKind::InstanceMethod, 4)
        );
        assert_eq!(
            method_kind::<Foo, _, _>(&|_: &mut Foo| ()),
            (MethodKind::InstanceMethod, 1)
        );
    }

    #[test]
    fn signature_display() {
        let sig = method_signature::<Foo, _, _>(&|_: &Foo, a: i32, b: f64| a as f64 * b);
        assert_eq!(sig.arity(), 3);
        assert_eq!(sig.script_arity(), 2);
        assert_eq!(sig.to_string(), "fn(&Foo, int32, double) -> double");

        let sig = method_signature::<Foo, _, _>(&|| 987i32);
        assert_eq!(sig.to_string(), "fn() -> int32");
        assert_eq!(sig.kind.scope(), "class");
    }

    #[test]
    fn arg_pack_converts_in_order() {
        let args = [Value::Int(1), Value::Float(2.5), Value::str("x")];
        let (a, b, c) = <(i32, f64, String)>::from_args(&args, Coercion::Lenient).unwrap();
        assert_eq!((a, b, c.as_str()), (1, 2.5, "x"));
    }

    #[test]
    fn arg_pack_reports_first_failure() {
        let args = [Value::Int(1), Value::str("no"), Value::Nil];
        let err = <(i32, i32, f64)>::from_args(&args, Coercion::Strict).unwrap_err();
        assert!(matches!(err, NativeError::Argument { index: 1, .. }));
    }

    #[test]
    fn arg_pack_reads_missing_as_nil() {
        let (a, b) = <(i32, Option<i32>)>::from_args(&[Value::Int(4)], Coercion::Lenient).unwrap();
        assert_eq!((a, b), (4, None));
    }

    #[test]
    fn constructor_signature_names_instance_type() {
        fn ctor_signature<F: NativeFunction<M>, M>(_: &F) -> Signature {
            constructor_signature::<F, M>(Foo::NAME)
        }

        let sig = ctor_signature(&|_: i32, _: i32| Foo);
        assert_eq!(sig.kind, MethodKind::Constructor);
        assert_eq!(sig.to_string(), "fn(int32, int32) -> Foo");
    }
}
