//! Order event bus and outbound notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`OrderEvent`]: what happened to an order, and who should hear about it.
//! - [`delivery`]: external delivery channels (email).

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, OrderEvent};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, Mailer};
