//! Orderflow domain core.
//!
//! Zero-IO building blocks shared by the database, event and API layers:
//! role and status vocabularies, the product/sample routing table, pricing
//! arithmetic, audit helpers and input validation.

pub mod audit;
pub mod error;
pub mod hashing;
pub mod media;
pub mod notes;
pub mod orders;
pub mod pagination;
pub mod pricing;
pub mod roles;
pub mod routing;
pub mod types;
pub mod validation;
