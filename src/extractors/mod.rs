pub mod current_user;
pub mod json;
pub mod pagination;

pub use current_user::CurrentUser;
pub use json::Json;
pub use pagination::Pagination;
