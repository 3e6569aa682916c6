//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool` (or an executor, when the call must join a transaction) as the
//! first argument.

pub mod accessory_repo;
pub mod audit_repo;
pub mod inbox_repo;
pub mod item_repo;
pub mod media_repo;
pub mod note_repo;
pub mod notification_repo;
pub mod order_repo;
pub mod product_repo;
pub mod routing_repo;
pub mod session_repo;
pub mod user_repo;

pub use accessory_repo::AccessoryRepo;
pub use audit_repo::AuditLogRepo;
pub use inbox_repo::InboxRepo;
pub use item_repo::ItemRepo;
pub use media_repo::MediaRepo;
pub use note_repo::NoteRepo;
pub use notification_repo::NotificationRepo;
pub use order_repo::OrderRepo;
pub use product_repo::ProductRepo;
pub use routing_repo::{RoutingRepo, TransitionError, TransitionOutcome, TransitionRequest};
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
