pub mod group;
pub mod group_member;
pub mod refresh_token;
pub mod transaction;
pub mod user;
