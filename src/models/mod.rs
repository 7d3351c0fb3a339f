pub mod alert;
pub mod update;

pub use alert::Alert;
pub use update::{Comment, Item, Update};
