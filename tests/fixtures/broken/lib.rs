#![crate_type = "lib"]

pub struct User {
    pub id: u32,
}

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static XUser: User = User { id: "not a number" };
