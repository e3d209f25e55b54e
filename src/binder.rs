//! Registration API: binding native types and functions into a runtime.
//!
//! # Example
//!
//! ```
//! use bindery::{Binder, NativeType, Value, Vm};
//!
//! #[derive(NativeType)]
//! struct Foo {
//!     base: i32,
//! }
//!
//! let mut vm = Vm::new();
//! let mut binder = Binder::new(&mut vm);
//! binder
//!     .bind_class("Foo", |a: i32, b: i32| Foo { base: a + b })?
//!     .bind("bar", |foo: &Foo, a: i32, b: i32, c: i32| (foo.base + a + b + c) as f64)?
//!     .bind("baz", |_b: i32| 987)?;
//! binder.bind_module("Util")?.bind("answer", || 42)?;
//!
//! let foo = vm.call(&vm.class_value("Foo")?, "new", &[Value::Int(0), Value::Int(1)])?;
//! let bar = vm.call(&foo, "bar", &[Value::Int(1), Value::Int(2), Value::Int(3)])?;
//! assert_eq!(bar, Value::Float(7.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::marker::PhantomData;

use bindery_core::{
    ArgSpec, CallContext, ClassFlags, ClassId, INITIALIZE, NativeFn, RuntimeError, Value, Vm,
};

use crate::convert::NativeType;
use crate::dispatch::{Constructed, constructor_trampoline, method_trampoline};
use crate::error::{NativeError, RegistrationError};
use crate::options::BinderOptions;
use crate::registry::{SharedRegistry, TypeRegistry};
use crate::signature::{
    ArgPack, MethodKind, NativeFunction, NativeMethod, Signature, TypeInfo, constructor_signature,
};

/// Instance type of modules. Nothing implements `NativeType` for it, so
/// instance methods cannot be bound on a module:
///
/// ```compile_fail
/// use bindery::{Binder, NativeType, Vm};
///
/// #[derive(NativeType)]
/// struct Counter(i64);
///
/// let mut vm = Vm::new();
/// let mut binder = Binder::new(&mut vm);
/// binder.bind_module("Util").unwrap().bind("count", |c: &Counter| c.0);
/// ```
#[derive(Debug)]
pub enum NoInstance {}

/// Binds native types and functions into one runtime.
pub struct Binder<'vm> {
    vm: &'vm mut Vm,
    registry: SharedRegistry,
    options: BinderOptions,
}

impl<'vm> Binder<'vm> {
    /// Binder with default options and a fresh registry.
    pub fn new(vm: &'vm mut Vm) -> Self {
        Self::with_options(vm, BinderOptions::default())
    }

    pub fn with_options(vm: &'vm mut Vm, options: BinderOptions) -> Self {
        Self::with_registry(vm, TypeRegistry::shared(), options)
    }

    /// Binder writing into an existing registry, e.g. to continue binding
    /// into a runtime after an earlier binder was dropped.
    pub fn with_registry(vm: &'vm mut Vm, registry: SharedRegistry, options: BinderOptions) -> Self {
        Self {
            vm,
            registry,
            options,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn options(&self) -> BinderOptions {
        self.options
    }

    pub fn vm(&self) -> &Vm {
        self.vm
    }

    /// Bind a native type as class `name` in `Kernel`, deriving from
    /// `Object`.
    ///
    /// The native type is deduced from the constructor's return type: `T`,
    /// `Option<T>` or `Result<T, E>`.
    pub fn bind_class<M, F>(
        &mut self,
        name: &str,
        ctor: F,
    ) -> Result<ClassBinder<'_, <F::Output as Constructed>::Instance>, RegistrationError>
    where
        M: 'static,
        F: NativeFunction<M>,
        F::Output: Constructed,
    {
        let outer = self.vm.kernel_module();
        let superclass = self.vm.object_class();
        self.bind_class_under(name, ctor, outer, superclass)
    }

    /// Bind a native type as class `name` inside `outer`, deriving from
    /// `superclass`.
    pub fn bind_class_under<M, F>(
        &mut self,
        name: &str,
        ctor: F,
        outer: ClassId,
        superclass: ClassId,
    ) -> Result<ClassBinder<'_, <F::Output as Constructed>::Instance>, RegistrationError>
    where
        M: 'static,
        F: NativeFunction<M>,
        F::Output: Constructed,
    {
        let type_name = <<F::Output as Constructed>::Instance as NativeType>::NAME;
        let mut registry = self
            .registry
            .try_borrow_mut()
            .map_err(|_| RegistrationError::RegistryBusy)?;
        if let Some(existing) = registry.lookup::<<F::Output as Constructed>::Instance>() {
            return Err(RegistrationError::DuplicateType {
                type_name,
                class: existing.path().to_string(),
            });
        }

        let class = self.vm.define_class_under(outer, name, superclass)?;
        let path = class_path(self.vm, class)?;
        let descriptor = registry.register::<<F::Output as Constructed>::Instance>(class, &path)?;
        let data_type = descriptor.data_type().clone();
        registry.record(
            class,
            &path,
            INITIALIZE,
            constructor_signature::<F, M>(type_name),
        )?;
        drop(registry);

        let spec = arg_spec(&self.options, <F::Args as ArgPack>::LEN);
        self.vm.set_flags(class, ClassFlags::DATA | ClassFlags::BOUND)?;
        self.vm.define_method(
            class,
            INITIALIZE,
            spec,
            constructor_trampoline(ctor, self.options, data_type),
        )?;
        tracing::debug!(class = %path, native_type = type_name, arity = spec.required, "bound class");

        Ok(ClassBinder::new(self, class, path))
    }

    /// Bind a module `name` in `Kernel` for free functions.
    pub fn bind_module(&mut self, name: &str) -> Result<ClassBinder<'_, NoInstance>, RegistrationError> {
        let outer = self.vm.kernel_module();
        self.bind_module_under(name, outer)
    }

    /// Bind a module `name` inside `outer`.
    pub fn bind_module_under(
        &mut self,
        name: &str,
        outer: ClassId,
    ) -> Result<ClassBinder<'_, NoInstance>, RegistrationError> {
        let module = self.vm.define_module_under(outer, name)?;
        let path = class_path(self.vm, module)?;
        tracing::debug!(module = %path, "bound module");
        Ok(ClassBinder::new(self, module, path))
    }

    /// Move a native value into a new object of the class `T` is bound to.
    pub fn wrap<T: NativeType>(&self, value: T) -> Result<Value, NativeError> {
        let registry = self
            .registry
            .try_borrow()
            .map_err(|_| NativeError::RegistryBusy)?;
        let descriptor = registry
            .lookup::<T>()
            .ok_or(NativeError::UnboundType { type_name: T::NAME })?;
        Ok(Value::Object(descriptor.wrap(value)?))
    }
}

/// Argument spec reported to the runtime for a callable taking `required`
/// script arguments.
fn arg_spec(options: &BinderOptions, required: usize) -> ArgSpec {
    if options.arity_check {
        ArgSpec::req(required)
    } else {
        ArgSpec::any()
    }
}

fn class_path(vm: &Vm, class: ClassId) -> Result<String, RegistrationError> {
    vm.class(class)
        .map(|record| record.path().to_string())
        .ok_or(RegistrationError::Definition(
            bindery_core::DefinitionError::UnknownClass(class.index()),
        ))
}

/// Binds the methods of one class or module.
///
/// Created by [`Binder::bind_class`] or [`Binder::bind_module`].
///
/// # Type Parameters
///
/// - `'b`: Lifetime of the borrow of the Binder
/// - `T`: Native instance type, or [`NoInstance`] for modules
pub struct ClassBinder<'b, T> {
    vm: &'b mut Vm,
    registry: &'b SharedRegistry,
    options: BinderOptions,
    class: ClassId,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<'b, T: 'static> ClassBinder<'b, T> {
    fn new<'vm>(binder: &'b mut Binder<'vm>, class: ClassId, path: String) -> Self {
        Self {
            vm: &mut *binder.vm,
            registry: &binder.registry,
            options: binder.options,
            class,
            path,
            _marker: PhantomData,
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Qualified path, e.g. `"Kernel::Foo"`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bind `f` under `name`.
    ///
    /// Callables whose first parameter is `&T` or `&mut T` become instance
    /// methods; all others become class methods (module functions on
    /// modules).
    ///
    /// ```ignore
    /// binder
    ///     .bind_class("Foo", Foo::new)?
    ///     .bind("bar", |foo: &Foo, a: i32| foo.bar(a))?   // Foo.new(..).bar(1)
    ///     .bind("baz", |b: i32| b * 2)?;                  // Foo.baz(1)
    /// ```
    ///
    /// Every parameter must implement `FromValue` and the result
    /// `IntoValue`; anything else is rejected at compile time:
    ///
    /// ```compile_fail
    /// use bindery::{Binder, Vm};
    ///
    /// let mut vm = Vm::new();
    /// let mut binder = Binder::new(&mut vm);
    /// binder.bind_module("Util").unwrap().bind("sum", |v: Vec<i32>| v.len() as i64);
    /// ```
    pub fn bind<M, F>(mut self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        M: 'static,
        F: NativeMethod<T, M>,
    {
        self.record(name, F::signature())?;

        let spec = arg_spec(&self.options, <F::Args as ArgPack>::LEN);
        let native = method_trampoline::<T, M, F>(f, self.options, self.registry.clone());
        self.install(name, F::KIND, spec, native)?;
        Ok(self)
    }

    /// Bind a callable with raw access to the receiver and arguments.
    ///
    /// No arity check or conversion happens; `spec` is only reported to the
    /// runtime.
    pub fn bind_raw<F>(
        mut self,
        name: &str,
        kind: MethodKind,
        spec: ArgSpec,
        f: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(&CallContext<'_>) -> Result<Value, RuntimeError> + 'static,
    {
        let signature = Signature {
            kind,
            receiver: None,
            params: Vec::new(),
            ret: TypeInfo::named("value"),
        };
        self.record(name, signature)?;
        self.install(name, kind, spec, NativeFn::new(f))?;
        Ok(self)
    }

    /// Finish binding and return the class id.
    pub fn build(self) -> ClassId {
        self.class
    }

    fn record(&mut self, name: &str, signature: Signature) -> Result<(), RegistrationError> {
        self.registry
            .try_borrow_mut()
            .map_err(|_| RegistrationError::RegistryBusy)?
            .record(self.class, &self.path, name, signature)?;
        Ok(())
    }

    fn install(
        &mut self,
        name: &str,
        kind: MethodKind,
        spec: ArgSpec,
        native: NativeFn,
    ) -> Result<(), RegistrationError> {
        match kind {
            MethodKind::ClassMethod => self.vm.define_class_method(self.class, name, spec, native)?,
            MethodKind::InstanceMethod | MethodKind::Constructor => {
                self.vm.define_method(self.class, name, spec, native)?
            }
        }
        tracing::debug!(class = %self.path, method = name, scope = kind.scope(), arity = spec.arity(), "bound method");
        Ok(())
    }
}
