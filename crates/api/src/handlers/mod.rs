pub mod accessories;
pub mod admin;
pub mod audit;
pub mod auth;
pub mod inbox;
pub mod items;
pub mod media;
pub mod notes;
pub mod notification;
pub mod orders;
pub mod products;
pub mod routing;
