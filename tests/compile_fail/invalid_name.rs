//! Test qualified name error.

use bindery::NativeType;

#[derive(NativeType)]
#[bindery(name = "Outer::Player")]
struct Player;

fn main() {
    let _ = Player;
}
