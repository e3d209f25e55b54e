//! Class and module records of the runtime.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use super::NativeFn;

/// Index of a class or module in the runtime's class table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub const fn new(index: u32) -> Self {
        ClassId(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

bitflags! {
    /// Properties of a class record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u8 {
        /// Record is a module: no instances, no superclass.
        const MODULE = 1 << 0;
        /// Instances carry a native data slot.
        const DATA = 1 << 1;
        /// A native type has been bound to this class.
        const BOUND = 1 << 2;
    }
}

/// Required-argument contract attached to a method definition.
///
/// Informational for the runtime (reported by `Vm::method_arity`); argument
/// counts are enforced by the callee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ArgSpec {
    /// Number of required positional arguments.
    pub required: usize,
    /// Accepts any number of extra arguments.
    pub rest: bool,
}

impl ArgSpec {
    /// No arguments.
    pub const fn none() -> Self {
        Self {
            required: 0,
            rest: false,
        }
    }

    /// Exactly `n` required arguments.
    pub const fn req(n: usize) -> Self {
        Self {
            required: n,
            rest: false,
        }
    }

    /// Any number of arguments.
    pub const fn any() -> Self {
        Self {
            required: 0,
            rest: true,
        }
    }

    /// Arity in the runtime's reporting convention: `n` for exactly `n`
    /// arguments, `-(n + 1)` when extra arguments are accepted.
    pub fn arity(self) -> i64 {
        if self.rest {
            -(self.required as i64) - 1
        } else {
            self.required as i64
        }
    }
}

/// A method table entry.
#[derive(Clone)]
pub struct MethodEntry {
    pub spec: ArgSpec,
    pub func: NativeFn,
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// A class or module.
#[derive(Debug)]
pub struct RClass {
    pub(crate) id: ClassId,
    pub(crate) name: Rc<str>,
    pub(crate) path: String,
    pub(crate) outer: Option<ClassId>,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) flags: ClassFlags,
    pub(crate) methods: FxHashMap<String, MethodEntry>,
    pub(crate) class_methods: FxHashMap<String, MethodEntry>,
}

impl RClass {
    pub(crate) fn new(
        id: ClassId,
        name: &str,
        path: String,
        outer: Option<ClassId>,
        superclass: Option<ClassId>,
        flags: ClassFlags,
    ) -> Self {
        Self {
            id,
            name: Rc::from(name),
            path,
            outer,
            superclass,
            flags,
            methods: FxHashMap::default(),
            class_methods: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Simple name, e.g. `"Foo"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified path, e.g. `"Outer::Foo"`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn outer(&self) -> Option<ClassId> {
        self.outer
    }

    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    pub fn is_module(&self) -> bool {
        self.flags.contains(ClassFlags::MODULE)
    }

    /// Names of the instance methods defined directly on this class.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Names of the class-level methods defined directly on this class.
    pub fn class_method_names(&self) -> impl Iterator<Item = &str> {
        self.class_methods.keys().map(String::as_str)
    }
}
