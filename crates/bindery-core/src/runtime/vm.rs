//! The runtime's class table and call entry points.
//!
//! [`Vm`] owns every class and module record. Embedding code defines classes
//! and installs native methods through it, and drives calls the way a script
//! statement would: `Foo.new(0, 1).bar(1, 2, 3)` is
//! `vm.call(&vm.call(&foo, "new", &[0, 1])?, "bar", &[1, 2, 3])`.

use rustc_hash::FxHashMap;

use super::{
    ArgSpec, CallContext, ClassFlags, ClassId, MethodEntry, NativeFn, ObjectRef, RClass, Value,
};
use crate::{DefinitionError, RuntimeError};

/// Name of the instance method run by `new` on a fresh object.
pub const INITIALIZE: &str = "initialize";

const SEPARATOR: &str = "::";

/// Minimal in-process runtime: class table, constant namespaces and method
/// dispatch. No parser and no interpreter loop.
#[derive(Debug)]
pub struct Vm {
    classes: Vec<RClass>,
    constants: FxHashMap<(ClassId, String), ClassId>,
    object_class: ClassId,
    kernel_module: ClassId,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Create a runtime holding the root `Object` class and the `Kernel`
    /// module.
    pub fn new() -> Self {
        let object_class = ClassId::new(0);
        let kernel_module = ClassId::new(1);
        let mut vm = Self {
            classes: vec![
                RClass::new(
                    object_class,
                    "Object",
                    "Object".to_string(),
                    None,
                    None,
                    ClassFlags::empty(),
                ),
                RClass::new(
                    kernel_module,
                    "Kernel",
                    "Kernel".to_string(),
                    Some(object_class),
                    None,
                    ClassFlags::MODULE,
                ),
            ],
            constants: FxHashMap::default(),
            object_class,
            kernel_module,
        };
        vm.constants
            .insert((object_class, "Object".to_string()), object_class);
        vm.constants
            .insert((object_class, "Kernel".to_string()), kernel_module);
        vm
    }

    /// The root class every class derives from by default.
    pub fn object_class(&self) -> ClassId {
        self.object_class
    }

    /// The module new constants are nested in by default.
    pub fn kernel_module(&self) -> ClassId {
        self.kernel_module
    }

    pub fn class(&self, id: ClassId) -> Option<&RClass> {
        self.classes.get(id.index() as usize)
    }

    fn class_mut(&mut self, id: ClassId) -> Result<&mut RClass, DefinitionError> {
        self.classes
            .get_mut(id.index() as usize)
            .ok_or(DefinitionError::UnknownClass(id.index()))
    }

    fn require(&self, id: ClassId) -> Result<&RClass, DefinitionError> {
        self.class(id)
            .ok_or(DefinitionError::UnknownClass(id.index()))
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Define (or reopen) class `name` inside `outer`.
    ///
    /// Reopening an existing class is allowed as long as the superclass
    /// matches.
    pub fn define_class_under(
        &mut self,
        outer: ClassId,
        name: &str,
        superclass: ClassId,
    ) -> Result<ClassId, DefinitionError> {
        validate_name(name)?;
        self.require(outer)?;
        if self.require(superclass)?.is_module() {
            return Err(DefinitionError::KindMismatch {
                name: self.require(superclass)?.path().to_string(),
                expected: "class",
            });
        }

        if let Some(&existing) = self.constants.get(&(outer, name.to_string())) {
            let class = self.require(existing)?;
            if class.is_module() {
                return Err(DefinitionError::KindMismatch {
                    name: class.path().to_string(),
                    expected: "class",
                });
            }
            if class.superclass() != Some(superclass) {
                return Err(DefinitionError::SuperclassMismatch {
                    name: class.path().to_string(),
                });
            }
            return Ok(existing);
        }

        let id = self.insert(outer, name, Some(superclass), ClassFlags::empty())?;
        tracing::debug!(class = %self.classes[id.index() as usize].path(), "defined class");
        Ok(id)
    }

    /// Define (or reopen) module `name` inside `outer`.
    pub fn define_module_under(
        &mut self,
        outer: ClassId,
        name: &str,
    ) -> Result<ClassId, DefinitionError> {
        validate_name(name)?;
        self.require(outer)?;

        if let Some(&existing) = self.constants.get(&(outer, name.to_string())) {
            let module = self.require(existing)?;
            if !module.is_module() {
                return Err(DefinitionError::KindMismatch {
                    name: module.path().to_string(),
                    expected: "module",
                });
            }
            return Ok(existing);
        }

        let id = self.insert(outer, name, None, ClassFlags::MODULE)?;
        tracing::debug!(module = %self.classes[id.index() as usize].path(), "defined module");
        Ok(id)
    }

    fn insert(
        &mut self,
        outer: ClassId,
        name: &str,
        superclass: Option<ClassId>,
        flags: ClassFlags,
    ) -> Result<ClassId, DefinitionError> {
        let index = u32::try_from(self.classes.len())
            .map_err(|_| DefinitionError::InvalidName(name.to_string()))?;
        let id = ClassId::new(index);
        let path = if outer == self.object_class {
            name.to_string()
        } else {
            format!("{}{}{}", self.require(outer)?.path(), SEPARATOR, name)
        };
        self.classes
            .push(RClass::new(id, name, path, Some(outer), superclass, flags));
        self.constants.insert((outer, name.to_string()), id);
        Ok(id)
    }

    /// Add flags to a class record (e.g. mark its instances as data objects).
    pub fn set_flags(&mut self, class: ClassId, flags: ClassFlags) -> Result<(), DefinitionError> {
        self.class_mut(class)?.flags.insert(flags);
        Ok(())
    }

    /// Mark instances of `class` as carrying a native data slot.
    pub fn set_instance_data(&mut self, class: ClassId) -> Result<(), DefinitionError> {
        self.set_flags(class, ClassFlags::DATA)
    }

    /// Install an instance method. Redefinition replaces the previous entry.
    pub fn define_method(
        &mut self,
        class: ClassId,
        name: &str,
        spec: ArgSpec,
        func: NativeFn,
    ) -> Result<(), DefinitionError> {
        let record = self.class_mut(class)?;
        tracing::debug!(class = %record.path(), method = name, arity = spec.arity(), "defined method");
        record
            .methods
            .insert(name.to_string(), MethodEntry { spec, func });
        Ok(())
    }

    /// Install a class-level method (a module function on modules).
    pub fn define_class_method(
        &mut self,
        class: ClassId,
        name: &str,
        spec: ArgSpec,
        func: NativeFn,
    ) -> Result<(), DefinitionError> {
        let record = self.class_mut(class)?;
        tracing::debug!(class = %record.path(), method = name, arity = spec.arity(), "defined class method");
        record
            .class_methods
            .insert(name.to_string(), MethodEntry { spec, func });
        Ok(())
    }

    // =========================================================================
    // Constant lookup
    // =========================================================================

    /// Resolve a constant path such as `"Foo"` or `"Outer::Inner"`.
    ///
    /// The first segment is searched in `Object`, then in `Kernel`.
    pub fn lookup_class(&self, path: &str) -> Result<ClassId, RuntimeError> {
        let not_found = || RuntimeError::Name {
            path: path.to_string(),
        };
        let mut segments = path.split(SEPARATOR);
        let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(not_found)?;

        let mut current = [self.object_class, self.kernel_module]
            .into_iter()
            .find_map(|scope| self.constant(scope, first))
            .ok_or_else(not_found)?;
        for segment in segments {
            current = self.constant(current, segment).ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Resolve a constant path to a class value usable as a receiver.
    pub fn class_value(&self, path: &str) -> Result<Value, RuntimeError> {
        self.lookup_class(path).map(Value::Class)
    }

    fn constant(&self, scope: ClassId, name: &str) -> Option<ClassId> {
        self.constants.get(&(scope, name.to_string())).copied()
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Allocate an instance of `class` and run its `initialize` with `args`.
    ///
    /// Classes without `initialize` ignore the arguments.
    pub fn new_object(&self, class: ClassId, args: &[Value]) -> Result<Value, RuntimeError> {
        let record = self
            .class(class)
            .ok_or_else(|| RuntimeError::Name {
                path: format!("#<Class:{}>", class.index()),
            })?;
        if record.is_module() {
            return Err(RuntimeError::NoMethod {
                name: "new".to_string(),
                receiver: record.path().to_string(),
            });
        }

        let object = Value::Object(ObjectRef::new(class, record.name.clone()));
        if let Some(entry) = self.find_method(class, INITIALIZE) {
            let func = entry.func.clone();
            let ctx = CallContext::new(&object, INITIALIZE, args);
            func.call(&ctx)?;
        }
        Ok(object)
    }

    /// Invoke method `name` on `receiver`.
    ///
    /// Class receivers dispatch to class methods (with a built-in `new`),
    /// object receivers to instance methods. Both walk the superclass chain.
    pub fn call(&self, receiver: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let entry = match receiver {
            Value::Class(class) => match self.find_class_method(*class, name) {
                Some(entry) => entry,
                None if name == "new" => return self.new_object(*class, args),
                None => return Err(self.no_method(receiver, name)),
            },
            Value::Object(object) => self
                .find_method(object.class(), name)
                .ok_or_else(|| self.no_method(receiver, name))?,
            _ => return Err(self.no_method(receiver, name)),
        };

        tracing::trace!(method = name, argc = args.len(), "dispatch");
        let func = entry.func.clone();
        let ctx = CallContext::new(receiver, name, args);
        func.call(&ctx)
    }

    /// Whether `receiver` has a method called `name`.
    pub fn respond_to(&self, receiver: &Value, name: &str) -> bool {
        self.lookup(receiver, name).is_some()
            || (name == "new"
                && matches!(receiver, Value::Class(id) if self.class(*id).is_some_and(|c| !c.is_module())))
    }

    /// Arity of method `name` on `receiver`, in the runtime's convention.
    pub fn method_arity(&self, receiver: &Value, name: &str) -> Option<i64> {
        self.lookup(receiver, name).map(|entry| entry.spec.arity())
    }

    fn lookup(&self, receiver: &Value, name: &str) -> Option<&MethodEntry> {
        match receiver {
            Value::Class(class) => self.find_class_method(*class, name),
            Value::Object(object) => self.find_method(object.class(), name),
            _ => None,
        }
    }

    /// Superclass chain starting at `class` itself.
    pub fn ancestors(&self, class: ClassId) -> impl Iterator<Item = &RClass> {
        std::iter::successors(self.class(class), |c| {
            c.superclass().and_then(|s| self.class(s))
        })
    }

    fn find_method(&self, class: ClassId, name: &str) -> Option<&MethodEntry> {
        self.ancestors(class).find_map(|c| c.methods.get(name))
    }

    fn find_class_method(&self, class: ClassId, name: &str) -> Option<&MethodEntry> {
        self.ancestors(class).find_map(|c| c.class_methods.get(name))
    }

    fn no_method(&self, receiver: &Value, name: &str) -> RuntimeError {
        let receiver = match receiver {
            Value::Class(id) => self
                .class(*id)
                .map(|c| c.path().to_string())
                .unwrap_or_else(|| receiver.to_string()),
            Value::Object(object) => format!("an instance of {}", object.class_name()),
            other => other.type_name().to_string(),
        };
        RuntimeError::NoMethod {
            name: name.to_string(),
            receiver,
        }
    }
}

fn validate_name(name: &str) -> Result<(), DefinitionError> {
    if name.is_empty() || name.contains(SEPARATOR) {
        return Err(DefinitionError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn constant(value: i64) -> NativeFn {
        NativeFn::new(move |_: &CallContext<'_>| Ok(Value::Int(value)))
    }

    #[test]
    fn builtin_classes() {
        let vm = Vm::new();
        assert_eq!(vm.class(vm.object_class()).unwrap().name(), "Object");
        assert!(vm.class(vm.kernel_module()).unwrap().is_module());
        assert_eq!(vm.lookup_class("Kernel").unwrap(), vm.kernel_module());
    }

    #[test]
    fn define_class_under_kernel_resolves_unqualified() {
        let mut vm = Vm::new();
        let foo = vm
            .define_class_under(vm.kernel_module(), "Foo", vm.object_class())
            .unwrap();
        assert_eq!(vm.class(foo).unwrap().path(), "Kernel::Foo");
        assert_eq!(vm.lookup_class("Foo").unwrap(), foo);
        assert_eq!(vm.lookup_class("Kernel::Foo").unwrap(), foo);
    }

    #[test]
    fn reopen_class_returns_same_id() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let a = vm.define_class_under(object, "Foo", object).unwrap();
        let b = vm.define_class_under(object, "Foo", object).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reopen_with_other_superclass_fails() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let base = vm.define_class_under(object, "Base", object).unwrap();
        vm.define_class_under(object, "Foo", object).unwrap();
        let err = vm.define_class_under(object, "Foo", base).unwrap_err();
        assert!(matches!(err, DefinitionError::SuperclassMismatch { .. }));
    }

    #[test]
    fn module_and_class_names_conflict() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        vm.define_module_under(object, "Util").unwrap();
        let err = vm.define_class_under(object, "Util", object).unwrap_err();
        assert_eq!(err.to_string(), "Util is not a class");

        vm.define_class_under(object, "Thing", object).unwrap();
        let err = vm.define_module_under(object, "Thing").unwrap_err();
        assert_eq!(err.to_string(), "Thing is not a module");
    }

    #[test]
    fn invalid_names_rejected() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        assert!(matches!(
            vm.define_module_under(object, ""),
            Err(DefinitionError::InvalidName(_))
        ));
        assert!(matches!(
            vm.define_class_under(object, "A::B", object),
            Err(DefinitionError::InvalidName(_))
        ));
    }

    #[test]
    fn nested_paths() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let outer = vm.define_module_under(object, "Outer").unwrap();
        let inner = vm.define_class_under(outer, "Inner", object).unwrap();
        assert_eq!(vm.class(inner).unwrap().path(), "Outer::Inner");
        assert_eq!(vm.lookup_class("Outer::Inner").unwrap(), inner);
        assert!(matches!(
            vm.lookup_class("Inner"),
            Err(RuntimeError::Name { .. })
        ));
    }

    #[test]
    fn class_method_dispatch() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let util = vm.define_module_under(object, "Util").unwrap();
        vm.define_class_method(util, "answer", ArgSpec::none(), constant(42))
            .unwrap();

        let receiver = vm.class_value("Util").unwrap();
        assert_eq!(vm.call(&receiver, "answer", &[]).unwrap(), Value::Int(42));
        assert_eq!(vm.method_arity(&receiver, "answer"), Some(0));
        assert!(vm.respond_to(&receiver, "answer"));
        assert!(!vm.respond_to(&receiver, "new"));
    }

    #[test]
    fn new_runs_initialize_on_fresh_object() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let foo = vm.define_class_under(object, "Foo", object).unwrap();
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        vm.define_method(
            foo,
            INITIALIZE,
            ArgSpec::req(1),
            NativeFn::new(move |ctx: &CallContext<'_>| {
                assert!(ctx.receiver().as_object().is_some());
                counter.set(ctx.args()[0].as_int().unwrap_or(0));
                Ok(Value::Nil)
            }),
        )
        .unwrap();

        let instance = vm.call(&Value::Class(foo), "new", &[Value::Int(7)]).unwrap();
        assert_eq!(seen.get(), 7);
        assert_eq!(instance.as_object().unwrap().class(), foo);
    }

    #[test]
    fn instance_methods_are_inherited() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let base = vm.define_class_under(object, "Base", object).unwrap();
        let derived = vm.define_class_under(object, "Derived", base).unwrap();
        vm.define_method(base, "id", ArgSpec::none(), constant(1))
            .unwrap();

        let instance = vm.new_object(derived, &[]).unwrap();
        assert_eq!(vm.call(&instance, "id", &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn missing_method_is_no_method_error() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let foo = vm.define_class_under(object, "Foo", object).unwrap();
        let instance = vm.new_object(foo, &[]).unwrap();

        let err = vm.call(&instance, "qux", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::NoMethod { .. }));
        assert!(err.to_string().contains("Foo"));

        let err = vm.call(&Value::Int(1), "qux", &[]).unwrap_err();
        assert!(err.to_string().contains("int"));
    }

    #[test]
    fn modules_cannot_be_instantiated() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let util = vm.define_module_under(object, "Util").unwrap();
        let err = vm.call(&Value::Class(util), "new", &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::NoMethod { .. }));
    }

    #[test]
    fn raised_error_propagates() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        vm.define_class_method(
            object,
            "fail",
            ArgSpec::any(),
            NativeFn::new(|_: &CallContext<'_>| Err(RuntimeError::raised("boom"))),
        )
        .unwrap();
        let err = vm.call(&Value::Class(object), "fail", &[]).unwrap_err();
        assert_eq!(err, RuntimeError::raised("boom"));
        assert_eq!(vm.method_arity(&Value::Class(object), "fail"), Some(-1));
    }

    #[test]
    fn unknown_ids_are_definition_errors() {
        let mut vm = Vm::new();
        let err = vm
            .define_method(ClassId::new(99), "x", ArgSpec::none(), constant(0))
            .unwrap_err();
        assert_eq!(err, DefinitionError::UnknownClass(99));
    }

    #[test]
    fn set_instance_data_flags_class() {
        let mut vm = Vm::new();
        let object = vm.object_class();
        let foo = vm.define_class_under(object, "Foo", object).unwrap();
        vm.set_instance_data(foo).unwrap();
        assert!(vm.class(foo).unwrap().flags().contains(ClassFlags::DATA));
    }
}
