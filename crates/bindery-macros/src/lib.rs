//! Bindery Proc Macros
//!
//! This crate provides the derive macro that marks a Rust type as a native
//! type bindable to a runtime class.
//!
//! # Example
//!
//! ```ignore
//! use bindery::NativeType;
//!
//! #[derive(NativeType)]
//! #[bindery(name = "Player")]
//! pub struct Player {
//!     health: i32,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_native_type;

/// Derive the `NativeType` trait for a type.
///
/// The generated implementation names the type as scripts and signatures
/// see it.
///
/// # Attributes
///
/// - `#[bindery(name = "...")]` - Override the runtime-facing type name
///   (default: the Rust type name)
#[proc_macro_derive(NativeType, attributes(bindery))]
pub fn derive_native_type(input: TokenStream) -> TokenStream {
    derive_native_type::derive_native_type_impl(input)
}
