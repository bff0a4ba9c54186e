pub mod user;
pub mod alert;

pub use user::User;
pub use alert::{Alert, Direction};
