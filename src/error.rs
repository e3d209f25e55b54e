//! Error types of the binding layer.
//!
//! ```text
//! ConversionError   - one runtime value could not become a native value
//! NativeError       - a bound call failed (converted into a RuntimeError)
//! RegistrationError - binding a class, module or method failed
//! ```

use bindery_core::{DataError, DefinitionError, RuntimeError};
use thiserror::Error;

/// Errors that can occur when converting a runtime value to a native value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Value of the wrong dynamic type under the strict policy
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Integer does not fit the target width under the strict policy
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow { value: i64, target_type: &'static str },

    /// Float read as an integer under the strict policy
    #[error("float conversion error: value {value} cannot be represented as {target_type}")]
    FloatToInteger {
        value: f64,
        target_type: &'static str,
    },
}

/// Errors that can occur while a bound native callable runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Argument count differs from the declared arity
    #[error("wrong number of arguments ({given} for {expected})")]
    ArgumentCount { given: usize, expected: usize },

    /// Converting one argument failed
    #[error("argument {index}: {source}")]
    Argument {
        index: usize,
        #[source]
        source: ConversionError,
    },

    /// Error converting a value outside the argument list
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The receiver of an instance method is not an object
    #[error("invalid receiver: {message}")]
    InvalidReceiver { message: String },

    /// Reaching the receiver's native data failed
    #[error(transparent)]
    Data(#[from] DataError),

    /// A returned native value has no bound class
    #[error("no class bound for native type {type_name}")]
    UnboundType { type_name: &'static str },

    /// The type registry is being modified
    #[error("type registry is busy")]
    RegistryBusy,

    /// A returned original parameter is not part of the call
    #[error("original parameter {index} out of bounds (call has {count} parameters)")]
    OriginalOutOfRange { index: usize, count: usize },

    /// Error raised by a nested runtime call
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Error returned by the native callable itself
    #[error("{message}")]
    Raised { message: String },
}

impl NativeError {
    /// Create an "invalid receiver" error with a message.
    pub fn invalid_receiver(message: impl Into<String>) -> Self {
        NativeError::InvalidReceiver {
            message: message.into(),
        }
    }

    /// Create an error raised by native code.
    pub fn raised(message: impl Into<String>) -> Self {
        NativeError::Raised {
            message: message.into(),
        }
    }
}

impl From<String> for NativeError {
    fn from(message: String) -> Self {
        NativeError::Raised { message }
    }
}

impl From<&str> for NativeError {
    fn from(message: &str) -> Self {
        NativeError::raised(message)
    }
}

impl From<NativeError> for RuntimeError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::ArgumentCount { given, expected } => {
                RuntimeError::ArgumentCount { given, expected }
            }
            NativeError::Data(err) => err.into(),
            NativeError::Runtime(err) => err,
            NativeError::Raised { message } => RuntimeError::Raised { message },
            err @ (NativeError::Argument { .. }
            | NativeError::Conversion(_)
            | NativeError::InvalidReceiver { .. }) => RuntimeError::type_error(err.to_string()),
            err @ (NativeError::UnboundType { .. }
            | NativeError::RegistryBusy
            | NativeError::OriginalOutOfRange { .. }) => RuntimeError::raised(err.to_string()),
        }
    }
}

/// Errors that can occur while binding classes, modules and methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    // =========================================================================
    // Type errors
    // =========================================================================
    /// The native type is already bound to a class
    #[error("native type {type_name} is already bound to class {class}")]
    DuplicateType {
        type_name: &'static str,
        class: String,
    },

    /// The class already has a native type bound
    #[error("class {class} is already bound to native type {type_name}")]
    ClassAlreadyBound {
        class: String,
        type_name: &'static str,
    },

    // =========================================================================
    // Method errors
    // =========================================================================
    /// A callable with this name is already bound in the same scope
    #[error("{scope} method '{name}' is already bound on {class}")]
    DuplicateMethod {
        class: String,
        name: String,
        scope: &'static str,
    },

    /// Method name is empty
    #[error("invalid method name '{0}'")]
    InvalidMethodName(String),

    // =========================================================================
    // Runtime errors
    // =========================================================================
    /// The runtime rejected a class or method definition
    #[error("definition failed: {0}")]
    Definition(#[from] DefinitionError),

    /// The type registry is borrowed elsewhere
    #[error("type registry is busy")]
    RegistryBusy,
}
