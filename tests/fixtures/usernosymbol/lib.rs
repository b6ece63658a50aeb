#![crate_type = "lib"]

#[derive(Debug, Default)]
pub struct User {
    pub id: u32,
}

#[derive(Debug, Default)]
pub struct Order {
    pub total: u64,
}
