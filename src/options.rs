//! Binding configuration.

/// How argument values of the wrong dynamic type are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// Never fail for primitive types: non-numeric values read as `0`,
    /// integers wrap to narrower widths like a C cast, floats truncate
    /// toward zero and non-string values read as their display form.
    #[default]
    Lenient,
    /// Raise a `TypeError` on subtype mismatch. Floats are not read as
    /// integers and out-of-range integers are rejected; integers still
    /// widen to floats.
    Strict,
}

/// Options applied to every callable bound through a `Binder`.
///
/// # Example
///
/// ```
/// use bindery::{BinderOptions, Coercion};
///
/// let options = BinderOptions::new()
///     .coercion(Coercion::Strict)
///     .arity_check(true);
/// assert_eq!(options.coercion, Coercion::Strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinderOptions {
    /// Argument conversion policy.
    pub coercion: Coercion,
    /// Reject calls whose argument count differs from the declared arity.
    ///
    /// When disabled, missing trailing arguments read as `nil` and extra
    /// arguments are ignored.
    pub arity_check: bool,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self {
            coercion: Coercion::Lenient,
            arity_check: true,
        }
    }
}

impl BinderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict conversions with arity checking.
    pub fn strict() -> Self {
        Self::default().coercion(Coercion::Strict)
    }

    pub fn coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn arity_check(mut self, enabled: bool) -> Self {
        self.arity_check = enabled;
        self
    }
}
