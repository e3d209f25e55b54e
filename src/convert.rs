//! Value converters between runtime values and native types.
//!
//! [`FromValue`] reads an argument, [`IntoValue`] produces a return value and
//! [`ScriptType`] names the type in signatures. Implementing the three for a
//! new type is all it takes to use it in bound callables.
//!
//! | native type    | from runtime               | to runtime         |
//! |----------------|----------------------------|--------------------|
//! | `bool`         | truthiness                 | `true` / `false`   |
//! | `i32` `u32` `i64` | int, or truncated float | int                |
//! | `f32` `f64`    | float, or widened int      | float              |
//! | `Rc<str>`      | string, shared             | string             |
//! | `String`       | string, copied             | string             |
//! | `*mut c_void`  | cptr, or nil as null       | cptr               |
//! | `()`           | ignored                    | nil                |
//! | `Original<N>`  | -                          | argument `N`       |
//! | `Receiver`     | -                          | receiver object    |
//! | `Owned<T>`     | -                          | new `T` object     |

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use bindery_core::{ObjectRef, Value};

use crate::error::{ConversionError, NativeError};
use crate::options::Coercion;
use crate::registry::TypeRegistry;

/// Marker trait for Rust types that can live in an object's data slot.
///
/// Usually derived:
///
/// ```
/// use bindery::NativeType;
///
/// #[derive(NativeType)]
/// #[bindery(name = "Vec3")]
/// struct Vector3 {
///     x: f32,
///     y: f32,
///     z: f32,
/// }
///
/// assert_eq!(Vector3::NAME, "Vec3");
/// ```
pub trait NativeType: Any {
    /// The name of this type as seen by scripts.
    const NAME: &'static str;
}

/// Name of a type as it appears in bound signatures.
pub trait ScriptType {
    fn type_name() -> Cow<'static, str>;
}

/// Convert a runtime value into a native argument.
pub trait FromValue: ScriptType + Sized {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError>;
}

/// Convert a native result into a runtime value.
///
/// The callable has already run when `into_value` is reached, so a result
/// that discards itself (such as [`Original`]) keeps the call's side effects.
pub trait IntoValue: ScriptType {
    /// Script argument index returned in place of the result, if any.
    const ORIGINAL: Option<usize> = None;

    /// Whether the receiver is returned in place of the result.
    const RECEIVER: bool = false;

    fn into_value(self, ctx: &ReturnContext<'_>) -> Result<Value, NativeError>;
}

/// What a return value may refer back to: the call's receiver, its original
/// arguments and the registry of bound types.
pub struct ReturnContext<'a> {
    receiver: Option<&'a Value>,
    args: &'a [Value],
    registry: &'a RefCell<TypeRegistry>,
}

impl<'a> ReturnContext<'a> {
    /// `receiver` is `Some` for instance methods only.
    pub fn new(
        receiver: Option<&'a Value>,
        args: &'a [Value],
        registry: &'a RefCell<TypeRegistry>,
    ) -> Self {
        Self {
            receiver,
            args,
            registry,
        }
    }

    /// Script argument `index`, unconverted. The receiver is never part of
    /// the argument list.
    pub fn original(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    pub fn receiver(&self) -> Option<&'a Value> {
        self.receiver
    }

    /// Number of script arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn registry(&self) -> &'a RefCell<TypeRegistry> {
        self.registry
    }
}

// =============================================================================
// Primitive readers
// =============================================================================

fn mismatch(expected: &'static str, value: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        actual: value.type_name(),
    }
}

/// An integer read before narrowing to the target width.
enum Integer {
    Exact(i64),
    /// Float accepted under the lenient policy, truncated at the target width.
    Float(f64),
}

fn read_integer(
    value: &Value,
    coercion: Coercion,
    target_type: &'static str,
) -> Result<Integer, ConversionError> {
    match (value, coercion) {
        (Value::Int(v), _) => Ok(Integer::Exact(*v)),
        (Value::Float(f), Coercion::Lenient) => Ok(Integer::Float(*f)),
        (Value::Float(f), Coercion::Strict) => Err(ConversionError::FloatToInteger {
            value: *f,
            target_type,
        }),
        (_, Coercion::Lenient) => Ok(Integer::Exact(0)),
        (other, Coercion::Strict) => Err(mismatch(target_type, other)),
    }
}

fn read_float(
    value: &Value,
    coercion: Coercion,
    target_type: &'static str,
) -> Result<f64, ConversionError> {
    match (value, coercion) {
        (Value::Float(f), _) => Ok(*f),
        (Value::Int(v), _) => Ok(*v as f64),
        (_, Coercion::Lenient) => Ok(0.0),
        (other, Coercion::Strict) => Err(mismatch(target_type, other)),
    }
}

fn read_text(value: &Value, coercion: Coercion) -> Result<Rc<str>, ConversionError> {
    match (value, coercion) {
        (Value::Str(s), _) => Ok(s.clone()),
        (other, Coercion::Lenient) => Ok(Rc::from(other.to_string())),
        (other, Coercion::Strict) => Err(mismatch("string", other)),
    }
}

macro_rules! script_type {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl ScriptType for $ty {
                fn type_name() -> Cow<'static, str> {
                    Cow::Borrowed($name)
                }
            }
        )*
    };
}

script_type! {
    () => "void",
    bool => "bool",
    i32 => "int32",
    u32 => "uint32",
    i64 => "int",
    f32 => "float",
    f64 => "double",
    Rc<str> => "string",
    String => "string",
    &str => "string",
    *mut c_void => "cptr",
    Value => "value",
    ObjectRef => "object",
}

// =============================================================================
// FromValue implementations
// =============================================================================

impl FromValue for () {
    fn from_value(_value: &Value, _coercion: Coercion) -> Result<Self, ConversionError> {
        Ok(())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        match (value, coercion) {
            (Value::Bool(b), _) => Ok(*b),
            (other, Coercion::Lenient) => Ok(other.is_truthy()),
            (other, Coercion::Strict) => Err(mismatch("bool", other)),
        }
    }
}

macro_rules! impl_from_value_narrow_int {
    ($($ty:ty => $name:literal),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
                    match read_integer(value, coercion, $name)? {
                        Integer::Float(f) => Ok(f as $ty),
                        Integer::Exact(v) => match coercion {
                            Coercion::Lenient => Ok(v as $ty),
                            Coercion::Strict => <$ty>::try_from(v).map_err(|_| {
                                ConversionError::IntegerOverflow {
                                    value: v,
                                    target_type: $name,
                                }
                            }),
                        },
                    }
                }
            }
        )*
    };
}

impl_from_value_narrow_int!(i32 => "int32", u32 => "uint32");

impl FromValue for i64 {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        match read_integer(value, coercion, "int")? {
            Integer::Exact(v) => Ok(v),
            Integer::Float(f) => Ok(f as i64),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        read_float(value, coercion, "double")
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        read_float(value, coercion, "float").map(|f| f as f32)
    }
}

impl FromValue for Rc<str> {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        read_text(value, coercion)
    }
}

impl FromValue for String {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => read_text(other, coercion).map(|s| s.to_string()),
        }
    }
}

impl FromValue for *mut c_void {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        match (value, coercion) {
            (Value::CPtr(p), _) => Ok(*p),
            (Value::Nil, _) | (_, Coercion::Lenient) => Ok(std::ptr::null_mut()),
            (other, Coercion::Strict) => Err(mismatch("cptr", other)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value, _coercion: Coercion) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl FromValue for ObjectRef {
    fn from_value(value: &Value, _coercion: Coercion) -> Result<Self, ConversionError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| mismatch("object", value))
    }
}

impl<T: ScriptType> ScriptType for Option<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("{}?", T::type_name()))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, coercion: Coercion) -> Result<Self, ConversionError> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other, coercion).map(Some),
        }
    }
}

// =============================================================================
// IntoValue implementations
// =============================================================================

macro_rules! impl_into_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self, _ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
                    let $v = self;
                    Ok($body)
                }
            }
        )*
    };
}

impl_into_value! {
    () => |_v| Value::Nil,
    bool => |v| Value::Bool(v),
    i32 => |v| Value::Int(i64::from(v)),
    u32 => |v| Value::Int(i64::from(v)),
    i64 => |v| Value::Int(v),
    f32 => |v| Value::Float(f64::from(v)),
    f64 => |v| Value::Float(v),
    Rc<str> => |v| Value::Str(v),
    String => |v| Value::Str(Rc::from(v)),
    *mut c_void => |v| Value::CPtr(v),
    Value => |v| v,
    ObjectRef => |v| Value::Object(v),
}

impl IntoValue for &str {
    fn into_value(self, _ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
        Ok(Value::str(self))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    const ORIGINAL: Option<usize> = T::ORIGINAL;
    const RECEIVER: bool = T::RECEIVER;

    fn into_value(self, ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
        match self {
            Some(value) => value.into_value(ctx),
            None => Ok(Value::Nil),
        }
    }
}

impl<T: ScriptType, E> ScriptType for Result<T, E> {
    fn type_name() -> Cow<'static, str> {
        T::type_name()
    }
}

/// `Err` raises into the calling script.
impl<T, E> IntoValue for Result<T, E>
where
    T: IntoValue,
    E: Into<NativeError>,
{
    const ORIGINAL: Option<usize> = T::ORIGINAL;
    const RECEIVER: bool = T::RECEIVER;

    fn into_value(self, ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
        self.map_err(Into::into)?.into_value(ctx)
    }
}

// =============================================================================
// Original parameter pass-through
// =============================================================================

/// Return type that discards the native result and hands script argument
/// `N` back to the caller unconverted.
///
/// Arguments are counted as the script passes them; on instance methods the
/// receiver is not one of them. Use [`Receiver`] to return the receiver.
///
/// ```
/// use bindery::{Binder, NativeType, Original, Value, Vm};
///
/// #[derive(NativeType)]
/// struct Counter(i64);
///
/// let mut vm = Vm::new();
/// let mut binder = Binder::new(&mut vm);
/// binder
///     .bind_class("Counter", || Counter(0))?
///     .bind("add", |this: &mut Counter, by: i64| {
///         this.0 += by;
///         Original::<0>
///     })?;
///
/// let counter = vm.call(&vm.class_value("Counter")?, "new", &[])?;
/// let by = Value::Float(2.5);
/// assert_eq!(vm.call(&counter, "add", &[by.clone()])?, by);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Original<const N: usize>;

impl<const N: usize> ScriptType for Original<N> {
    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("original<{N}>"))
    }
}

impl<const N: usize> IntoValue for Original<N> {
    const ORIGINAL: Option<usize> = Some(N);

    fn into_value(self, ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
        ctx.original(N)
            .cloned()
            .ok_or(NativeError::OriginalOutOfRange {
                index: N,
                count: ctx.len(),
            })
    }
}

/// Return type that discards the native result and hands the receiver back,
/// for chaining calls on the same object.
///
/// Only instance methods have a receiver; binding a class method returning
/// `Receiver` fails to build.
///
/// ```
/// use bindery::{Binder, NativeType, Receiver, Value, Vm};
///
/// #[derive(NativeType)]
/// struct Counter(i64);
///
/// let mut vm = Vm::new();
/// let mut binder = Binder::new(&mut vm);
/// binder
///     .bind_class("Counter", || Counter(0))?
///     .bind("bump", |this: &mut Counter| {
///         this.0 += 1;
///         Receiver
///     })?;
///
/// let counter = vm.call(&vm.class_value("Counter")?, "new", &[])?;
/// let same = vm.call(&counter, "bump", &[])?;
/// assert_eq!(same, counter);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// ```compile_fail
/// use bindery::{Binder, Receiver, Vm};
///
/// let mut vm = Vm::new();
/// let mut binder = Binder::new(&mut vm);
/// binder.bind_module("Util").unwrap().bind("nothing", || Receiver).unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Receiver;

impl ScriptType for Receiver {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("self")
    }
}

impl IntoValue for Receiver {
    const RECEIVER: bool = true;

    fn into_value(self, ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
        ctx.receiver()
            .cloned()
            .ok_or_else(|| NativeError::invalid_receiver("class methods have no receiver to return"))
    }
}

// =============================================================================
// Owned native instances
// =============================================================================

/// Return type wrapping a fresh native instance into a new runtime object of
/// the class `T` is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct Owned<T: NativeType>(pub T);

impl<T: NativeType> ScriptType for Owned<T> {
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(T::NAME)
    }
}

impl<T: NativeType> IntoValue for Owned<T> {
    fn into_value(self, ctx: &ReturnContext<'_>) -> Result<Value, NativeError> {
        let registry = ctx
            .registry()
            .try_borrow()
            .map_err(|_| NativeError::RegistryBusy)?;
        let descriptor = registry
            .lookup::<T>()
            .ok_or(NativeError::UnboundType { type_name: T::NAME })?;
        Ok(Value::Object(descriptor.wrap(self.0)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient<T: FromValue>(value: Value) -> T {
        T::from_value(&value, Coercion::Lenient).unwrap()
    }

    fn strict<T: FromValue>(value: Value) -> Result<T, ConversionError> {
        T::from_value(&value, Coercion::Strict)
    }

    #[test]
    fn bool_uses_truthiness() {
        assert!(lenient::<bool>(Value::Int(0)));
        assert!(lenient::<bool>(Value::str("")));
        assert!(!lenient::<bool>(Value::Nil));
        assert!(!lenient::<bool>(Value::Bool(false)));
        assert!(strict::<bool>(Value::Int(1)).is_err());
    }

    #[test]
    fn integers_accept_floats_leniently() {
        assert_eq!(lenient::<i32>(Value::Float(2.9)), 2);
        assert_eq!(lenient::<i32>(Value::Float(-2.9)), -2);
        assert_eq!(lenient::<i64>(Value::Float(7.5)), 7);
        assert_eq!(lenient::<u32>(Value::Int(5)), 5);
    }

    #[test]
    fn integers_wrap_like_a_cast() {
        assert_eq!(lenient::<i32>(Value::Int(1 << 32)), 0);
        assert_eq!(lenient::<u32>(Value::Int(-1)), u32::MAX);
    }

    #[test]
    fn non_numeric_reads_as_zero() {
        assert_eq!(lenient::<i32>(Value::str("12")), 0);
        assert_eq!(lenient::<f64>(Value::Nil), 0.0);
    }

    #[test]
    fn strict_integers() {
        assert!(matches!(
            strict::<i32>(Value::Float(1.0)),
            Err(ConversionError::FloatToInteger { .. })
        ));
        assert!(matches!(
            strict::<u32>(Value::Int(-1)),
            Err(ConversionError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            strict::<i32>(Value::str("1")),
            Err(ConversionError::TypeMismatch { .. })
        ));
        assert_eq!(strict::<i32>(Value::Int(-4)).unwrap(), -4);
    }

    #[test]
    fn floats_widen_integers() {
        assert_eq!(lenient::<f64>(Value::Int(3)), 3.0);
        assert_eq!(strict::<f32>(Value::Int(3)).unwrap(), 3.0);
        assert!(strict::<f64>(Value::Bool(true)).is_err());
    }

    #[test]
    fn text_shares_runtime_string() {
        let value = Value::str("hello");
        let text: Rc<str> = lenient(value.clone());
        let Value::Str(original) = &value else {
            unreachable!()
        };
        assert!(Rc::ptr_eq(&text, original));
    }

    #[test]
    fn text_reads_display_form_leniently() {
        assert_eq!(lenient::<String>(Value::Int(42)), "42");
        assert_eq!(&*lenient::<Rc<str>>(Value::Float(1.0)), "1.0");
        assert!(strict::<String>(Value::Int(42)).is_err());
    }

    #[test]
    fn pointers_pass_through() {
        let mut target = 5u8;
        let ptr = &mut target as *mut u8 as *mut c_void;
        assert_eq!(lenient::<*mut c_void>(Value::CPtr(ptr)), ptr);
        assert!(lenient::<*mut c_void>(Value::Nil).is_null());
        assert!(strict::<*mut c_void>(Value::Nil).unwrap().is_null());
        assert!(strict::<*mut c_void>(Value::Int(1)).is_err());
    }

    #[test]
    fn option_maps_nil() {
        assert_eq!(lenient::<Option<i32>>(Value::Nil), None);
        assert_eq!(lenient::<Option<i32>>(Value::Int(3)), Some(3));
        assert_eq!(Option::<i32>::type_name(), "int32?");
    }

    #[test]
    fn object_requires_object() {
        assert!(strict::<ObjectRef>(Value::Int(1)).is_err());
        assert!(ObjectRef::from_value(&Value::Nil, Coercion::Lenient).is_err());
    }

    #[test]
    fn into_value_primitives() {
        let registry = RefCell::new(TypeRegistry::new());
        let ctx = ReturnContext::new(None, &[], &registry);
        assert_eq!(().into_value(&ctx).unwrap(), Value::Nil);
        assert_eq!(7u32.into_value(&ctx).unwrap(), Value::Int(7));
        assert_eq!(1.5f32.into_value(&ctx).unwrap(), Value::Float(1.5));
        assert_eq!("hi".into_value(&ctx).unwrap(), Value::str("hi"));
        assert_eq!(None::<i32>.into_value(&ctx).unwrap(), Value::Nil);
    }

    #[test]
    fn result_err_raises() {
        let registry = RefCell::new(TypeRegistry::new());
        let ctx = ReturnContext::new(None, &[], &registry);
        let ok: Result<i32, String> = Ok(1);
        assert_eq!(ok.into_value(&ctx).unwrap(), Value::Int(1));
        let err: Result<i32, String> = Err("boom".into());
        assert_eq!(err.into_value(&ctx).unwrap_err(), NativeError::raised("boom"));
    }

    #[test]
    fn original_indexes_arguments() {
        let registry = RefCell::new(TypeRegistry::new());
        let args = [Value::Int(1), Value::str("two")];
        let ctx = ReturnContext::new(None, &args, &registry);
        assert_eq!(Original::<1>.into_value(&ctx).unwrap(), Value::str("two"));
        assert!(matches!(
            Original::<2>.into_value(&ctx),
            Err(NativeError::OriginalOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn original_skips_receiver_for_methods() {
        let registry = RefCell::new(TypeRegistry::new());
        let receiver = Value::Bool(true);
        let args = [Value::Int(42)];
        let ctx = ReturnContext::new(Some(&receiver), &args, &registry);
        assert_eq!(ctx.len(), 1);
        assert_eq!(Original::<0>.into_value(&ctx).unwrap(), Value::Int(42));
        assert!(matches!(
            Original::<1>.into_value(&ctx),
            Err(NativeError::OriginalOutOfRange { index: 1, count: 1 })
        ));
        assert_eq!(<Option<Original<1>> as IntoValue>::ORIGINAL, Some(1));
    }

    #[test]
    fn receiver_returns_receiver() {
        let registry = RefCell::new(TypeRegistry::new());
        let receiver = Value::Bool(true);
        let ctx = ReturnContext::new(Some(&receiver), &[], &registry);
        assert_eq!(Receiver.into_value(&ctx).unwrap(), receiver);
        assert!(<Result<Receiver, String> as IntoValue>::RECEIVER);
        assert!(!<Original<0> as IntoValue>::RECEIVER);

        let ctx = ReturnContext::new(None, &[], &registry);
        assert!(matches!(
            Receiver.into_value(&ctx),
            Err(NativeError::InvalidReceiver { .. })
        ));
    }

    #[test]
    fn owned_requires_bound_type() {
        struct Unbound;
        impl NativeType for Unbound {
            const NAME: &'static str = "Unbound";
        }

        let registry = RefCell::new(TypeRegistry::new());
        let ctx = ReturnContext::new(None, &[], &registry);
        assert_eq!(
            Owned(Unbound).into_value(&ctx).unwrap_err(),
            NativeError::UnboundType {
                type_name: "Unbound"
            }
        );
    }
}
