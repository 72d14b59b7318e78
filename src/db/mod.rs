mod core;
mod items;
mod schema;

pub use self::core::Database;
pub use self::core::DbLockErrorExt;
pub use self::items::TopicStats;
