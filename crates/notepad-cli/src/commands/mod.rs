pub mod add;
pub mod common;
pub mod delete;
pub mod drafts;
pub mod edit;
pub mod list;
pub mod share;
pub mod shared;
pub mod show;
