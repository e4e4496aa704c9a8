mod handler;
pub mod model;

pub use handler::{add_to_wishlist, get_wishlist, remove_from_wishlist};
