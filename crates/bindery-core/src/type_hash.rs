//! Deterministic hash-based identity for bound types and callables.
//!
//! [`TypeHash`] is a 64-bit hash computed from names, so the same class path
//! or method name always yields the same identity regardless of registration
//! order.
//!
//! # Examples
//!
//! ```
//! use bindery_core::TypeHash;
//!
//! let foo = TypeHash::from_name("Foo");
//! assert_eq!(foo, TypeHash::from_name("Foo"));
//!
//! let bar = TypeHash::from_method(foo, "bar");
//! let baz = TypeHash::from_class_method(foo, "bar");
//! assert_ne!(bar, baz);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Different entity kinds sharing a name still produce distinct hashes.
pub mod hash_constants {
    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for class-level (singleton) method hashes
    pub const CLASS_METHOD: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for instance method hashes
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;
}

/// A deterministic 64-bit hash identifying a type or a bound callable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified name such as `"Outer::Foo"`.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of an instance method `name` on the type `owner`.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str) -> Self {
        Self::mix(hash_constants::METHOD, owner, name)
    }

    /// Hash of a class-level method `name` on the type `owner`.
    #[inline]
    pub fn from_class_method(owner: TypeHash, name: &str) -> Self {
        Self::mix(hash_constants::CLASS_METHOD, owner, name)
    }

    /// Hash of the constructor of `owner`.
    #[inline]
    pub fn from_constructor(owner: TypeHash) -> Self {
        TypeHash(hash_constants::CONSTRUCTOR ^ owner.0.rotate_left(17))
    }

    /// Check whether this is the empty hash.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn mix(domain: u64, owner: TypeHash, name: &str) -> Self {
        let name_hash = xxh64(name.as_bytes(), owner.0);
        TypeHash(domain ^ name_hash.wrapping_mul(0x9e3779b97f4a7c15) ^ owner.0)
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
