mod handler;
pub mod model;

pub use handler::{edit_account, get_self, login, register};
