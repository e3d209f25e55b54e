//! Call context bridging the runtime and native functions.

use std::fmt;

use super::Value;

/// Everything a native function sees of one call: the receiver (`self`)
/// and the raw, unconverted argument list.
pub struct CallContext<'a> {
    receiver: &'a Value,
    method: &'a str,
    args: &'a [Value],
}

impl<'a> CallContext<'a> {
    pub fn new(receiver: &'a Value, method: &'a str, args: &'a [Value]) -> Self {
        Self {
            receiver,
            method,
            args,
        }
    }

    /// The receiver: an object for instance methods, a class value for
    /// class methods.
    pub fn receiver(&self) -> &'a Value {
        self.receiver
    }

    /// Name the method was invoked under.
    pub fn method(&self) -> &'a str {
        self.method
    }

    /// Raw argument list, receiver excluded.
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("method", &self.method)
            .field("arg_count", &self.arg_count())
            .finish()
    }
}
