pub mod alerts;
pub mod items;
