//! Compile-fail tests for derive macro error paths.
//!
//! These tests verify that `#[derive(NativeType)]` rejects malformed
//! `#[bindery(...)]` attributes with a pointed error.

#[test]
fn macro_compile_fail_tests() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/compile_fail/*.rs");
}
