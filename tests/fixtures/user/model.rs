#[repr(C)]
#[derive(Debug, Default)]
pub struct User {
    pub id: u32,
    pub age: u32,
}

impl User {
    pub const fn new(id: u32, age: u32) -> Self {
        Self { id, age }
    }
}
