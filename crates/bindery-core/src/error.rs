//! Error types raised by the runtime.
//!
//! ```text
//! RuntimeError     - raised into the calling script (what a `rescue` would see)
//! DefinitionError  - class/module/method definition failures
//! ```

use thiserror::Error;

/// An error raised while the runtime executes a call.
///
/// These are the exceptions a script would observe. The variant names follow
/// the exception classes of the runtime (`ArgumentError`, `TypeError`, ...).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A call received a different number of arguments than it requires.
    #[error("ArgumentError: wrong number of arguments ({given} for {expected})")]
    ArgumentCount { given: usize, expected: usize },

    /// An argument or receiver had the wrong dynamic type.
    #[error("TypeError: {message}")]
    Type { message: String },

    /// No method with this name exists on the receiver.
    #[error("NoMethodError: undefined method '{name}' for {receiver}")]
    NoMethod { name: String, receiver: String },

    /// A constant (class or module path) could not be resolved.
    #[error("NameError: uninitialized constant {path}")]
    Name { path: String },

    /// An instance method ran on an object whose native data was never
    /// constructed or has already been released.
    #[error("RuntimeError: uninitialized {class} object")]
    Uninitialized { class: String },

    /// The receiver's native data is already borrowed by an outer call.
    #[error("RuntimeError: {class} object is already in use")]
    Busy { class: String },

    /// A native callable raised an error of its own.
    #[error("RuntimeError: {message}")]
    Raised { message: String },
}

impl RuntimeError {
    /// Create a `TypeError` with a message.
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::Type {
            message: message.into(),
        }
    }

    /// Create a generic raised error.
    pub fn raised(message: impl Into<String>) -> Self {
        RuntimeError::Raised {
            message: message.into(),
        }
    }
}

/// Errors that occur while defining classes, modules or methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A class already exists under this name with a different superclass.
    #[error("superclass mismatch for class {name}")]
    SuperclassMismatch { name: String },

    /// The name is already taken by a module, not a class (or vice versa).
    #[error("{name} is not a {expected}")]
    KindMismatch { name: String, expected: &'static str },

    /// The outer namespace or superclass id does not exist.
    #[error("unknown class id {0}")]
    UnknownClass(u32),

    /// The name is empty or contains a namespace separator.
    #[error("invalid constant name '{0}'")]
    InvalidName(String),
}
