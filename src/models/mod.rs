//! Data models for the forum topic board.

mod pagination;
mod topic;
mod user;

pub use pagination::*;
pub use topic::*;
pub use user::*;
