//! TypeRegistry - native type descriptors and bound callable records.
//!
//! This module provides [`TypeRegistry`], which associates every bound native
//! type with the runtime class it lives in and the [`DataType`] that releases
//! its instances, and records the deduced signature of every bound callable.
//!
//! # Sharing
//!
//! A registry is an ordinary owned value. The `Binder` writes it during
//! registration; the trampolines it generates keep a [`SharedRegistry`]
//! handle and only read it afterwards. Independent runtimes in one process
//! each use their own registry.
//!
//! # Example
//!
//! ```
//! use bindery::{ClassId, NativeType, TypeRegistry};
//!
//! struct Foo;
//! impl NativeType for Foo {
//!     const NAME: &'static str = "Foo";
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Foo>(ClassId::new(2), "Kernel::Foo")?;
//!
//! let descriptor = registry.lookup::<Foo>().unwrap();
//! assert_eq!(descriptor.type_name(), "Foo");
//! assert_eq!(descriptor.class_name(), "Foo");
//! assert!(registry.register::<Foo>(ClassId::new(3), "Other").is_err());
//! # Ok::<(), bindery::RegistrationError>(())
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use bindery_core::{ClassId, DataError, DataType, INITIALIZE, ObjectRef, TypeHash};
use rustc_hash::FxHashMap;

use crate::convert::NativeType;
use crate::error::RegistrationError;
use crate::signature::{MethodKind, Signature};

/// Registry handle shared between a binder and its trampolines.
pub type SharedRegistry = Rc<RefCell<TypeRegistry>>;

/// Association of one native type with its runtime class and release
/// callback.
#[derive(Debug)]
pub struct TypeDescriptor {
    type_name: &'static str,
    type_id: TypeId,
    class: ClassId,
    class_name: Rc<str>,
    path: String,
    hash: TypeHash,
    data_type: Rc<DataType>,
}

impl TypeDescriptor {
    fn new<T: NativeType>(class: ClassId, path: &str) -> Self {
        let class_name = path.rsplit("::").next().unwrap_or(path);
        Self {
            type_name: T::NAME,
            type_id: TypeId::of::<T>(),
            class,
            class_name: Rc::from(class_name),
            path: path.to_string(),
            hash: TypeHash::from_name(path),
            data_type: Rc::new(DataType::new(T::NAME, release::<T>)),
        }
    }

    /// Native type name (`NativeType::NAME`).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Runtime class instances of this type belong to.
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Qualified class path, e.g. `"Kernel::Foo"`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub fn data_type(&self) -> &Rc<DataType> {
        &self.data_type
    }

    /// Move `value` into a new runtime object of this descriptor's class.
    pub fn wrap<T: NativeType>(&self, value: T) -> Result<ObjectRef, DataError> {
        if TypeId::of::<T>() != self.type_id {
            return Err(DataError::TypeMismatch {
                expected: self.type_name,
                actual: T::NAME.to_string(),
            });
        }
        let object = ObjectRef::new(self.class, self.class_name.clone());
        object.set_data_type(self.data_type.clone())?;
        object.attach(Some(Box::new(value)))?;
        Ok(object)
    }
}

/// Release callback of a descriptor's data type: drops the payload as `T`.
fn release<T: NativeType>(data: Box<dyn Any>) {
    match data.downcast::<T>() {
        Ok(instance) => drop(instance),
        Err(other) => {
            tracing::trace!(expected = T::NAME, "releasing payload of another type");
            drop(other)
        }
    }
}

/// Record of one bound callable.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCallable {
    pub name: String,
    pub owner: ClassId,
    /// Qualified path of the owning class or module.
    pub owner_path: String,
    pub signature: Signature,
    pub hash: TypeHash,
}

impl BoundCallable {
    pub fn kind(&self) -> MethodKind {
        self.signature.kind
    }
}

/// Native type descriptors and bound callables of one runtime.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    // === Types ===
    types: FxHashMap<TypeId, TypeDescriptor>,
    type_by_class: FxHashMap<ClassId, TypeId>,
    type_by_hash: FxHashMap<TypeHash, TypeId>,

    // === Callables ===
    callables: FxHashMap<TypeHash, BoundCallable>,
    callables_by_class: FxHashMap<ClassId, Vec<TypeHash>>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry ready to be shared with trampolines.
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    /// Associate `T` with the runtime class `class` at `path`.
    ///
    /// A type binds to exactly one class and a class to exactly one type.
    pub fn register<T: NativeType>(
        &mut self,
        class: ClassId,
        path: &str,
    ) -> Result<&TypeDescriptor, RegistrationError> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.types.get(&type_id) {
            return Err(RegistrationError::DuplicateType {
                type_name: T::NAME,
                class: existing.path.clone(),
            });
        }
        if let Some(existing) = self.lookup_class(class) {
            return Err(RegistrationError::ClassAlreadyBound {
                class: existing.path.clone(),
                type_name: existing.type_name,
            });
        }

        let descriptor = TypeDescriptor::new::<T>(class, path);
        tracing::debug!(native_type = T::NAME, class = path, hash = %descriptor.hash, "registered native type");
        self.type_by_class.insert(class, type_id);
        self.type_by_hash.insert(descriptor.hash, type_id);
        Ok(self.types.entry(type_id).or_insert(descriptor))
    }

    /// Whether `T` is bound.
    pub fn contains<T: NativeType>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Descriptor of `T`, if bound.
    pub fn lookup<T: NativeType>(&self) -> Option<&TypeDescriptor> {
        self.types.get(&TypeId::of::<T>())
    }

    /// Descriptor of the native type bound to `class`.
    pub fn lookup_class(&self, class: ClassId) -> Option<&TypeDescriptor> {
        self.type_by_class
            .get(&class)
            .and_then(|id| self.types.get(id))
    }

    /// Descriptor by the hash of its class path.
    pub fn lookup_hash(&self, hash: TypeHash) -> Option<&TypeDescriptor> {
        self.type_by_hash.get(&hash).and_then(|id| self.types.get(id))
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ==========================================================================
    // Callables
    // ==========================================================================

    /// Record a bound callable.
    ///
    /// One name binds exactly one callable per scope; the constructor occupies
    /// the instance method `initialize`.
    pub fn record(
        &mut self,
        owner: ClassId,
        owner_path: &str,
        name: &str,
        signature: Signature,
    ) -> Result<&BoundCallable, RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::InvalidMethodName(name.to_string()));
        }

        let owner_hash = TypeHash::from_name(owner_path);
        let kind = signature.kind;
        let hash = callable_hash(owner_hash, kind, name);
        let taken = self.callables.contains_key(&hash)
            || match kind {
                MethodKind::Constructor => self
                    .callables
                    .contains_key(&TypeHash::from_method(owner_hash, INITIALIZE)),
                MethodKind::InstanceMethod if name == INITIALIZE => self
                    .callables
                    .contains_key(&TypeHash::from_constructor(owner_hash)),
                _ => false,
            };
        if taken {
            return Err(RegistrationError::DuplicateMethod {
                class: owner_path.to_string(),
                name: name.to_string(),
                scope: kind.scope(),
            });
        }

        self.callables_by_class.entry(owner).or_default().push(hash);
        Ok(self.callables.entry(hash).or_insert(BoundCallable {
            name: name.to_string(),
            owner,
            owner_path: owner_path.to_string(),
            signature,
            hash,
        }))
    }

    /// Bound callable `name` of `owner` in the given scope.
    pub fn callable(&self, owner_path: &str, kind: MethodKind, name: &str) -> Option<&BoundCallable> {
        let hash = callable_hash(TypeHash::from_name(owner_path), kind, name);
        self.callables.get(&hash)
    }

    /// Signature of `name` on `owner`, searching instance methods, then class
    /// methods, then the constructor.
    pub fn signature(&self, owner: ClassId, name: &str) -> Option<&Signature> {
        let mut found = self.callables_of(owner).filter(|c| c.name == name);
        let first = found.next()?;
        let rank = |c: &BoundCallable| match c.kind() {
            MethodKind::InstanceMethod => 0,
            MethodKind::ClassMethod => 1,
            MethodKind::Constructor => 2,
        };
        let best = found.fold(first, |best, c| if rank(c) < rank(best) { c } else { best });
        Some(&best.signature)
    }

    /// Callables bound on `owner`, in registration order.
    pub fn callables_of(&self, owner: ClassId) -> impl Iterator<Item = &BoundCallable> {
        self.callables_by_class
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|hash| self.callables.get(hash))
    }

    pub fn callables(&self) -> impl Iterator<Item = &BoundCallable> {
        self.callables.values()
    }

    pub fn callable_count(&self) -> usize {
        self.callables.len()
    }
}

fn callable_hash(owner: TypeHash, kind: MethodKind, name: &str) -> TypeHash {
    match kind {
        MethodKind::Constructor => TypeHash::from_constructor(owner),
        MethodKind::ClassMethod => TypeHash::from_class_method(owner, name),
        MethodKind::InstanceMethod => TypeHash::from_method(owner, name),
    }
}
