#[derive(Debug, Default)]
pub struct User {
    pub id: u32,
}
