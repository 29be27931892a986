//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument and return `sqlx::Error`.

pub mod activity_repo;
pub mod disposition_history_repo;
pub mod disposition_repo;
pub mod letter_repo;
pub mod link_repo;
pub mod notification_repo;
pub mod user_repo;

pub use activity_repo::ActivityRepo;
pub use disposition_history_repo::DispositionHistoryRepo;
pub use disposition_repo::DispositionRepo;
pub use letter_repo::LetterRepo;
pub use link_repo::LinkRepo;
pub use notification_repo::NotificationRepo;
pub use user_repo::UserRepo;
