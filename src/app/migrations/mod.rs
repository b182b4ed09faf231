// Concrete migrations: one legacy → canonical mapping per collection.

pub mod blogs;
pub mod bots;
pub mod partners;
pub mod posts;
pub mod users;

pub use blogs::{Blog, BlogMigration};
pub use bots::{Bot, BotMigration};
pub use partners::{Partner, PartnerMigration};
pub use posts::{Post, PostMigration};
pub use users::{User, UserMigration};
