//! Test unknown bindery attribute error.

use bindery::NativeType;

#[derive(NativeType)]
#[bindery(value)]
struct Player;

fn main() {
    let _ = Player;
}
