#![crate_type = "lib"]

mod model;

pub use model::User;

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static XUser: User = User::new(42, 7);
