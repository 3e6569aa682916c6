//! Row models and DTOs, one module per table.

pub mod accessory;
pub mod audit;
pub mod inbox;
pub mod item;
pub mod media;
pub mod note;
pub mod notification;
pub mod order;
pub mod product;
pub mod session;
pub mod user;
