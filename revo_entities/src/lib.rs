//! Database entities.

pub mod conversations;

pub mod prelude {
    pub use super::conversations::Entity as Conversations;
}
