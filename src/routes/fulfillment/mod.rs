mod handler;
pub mod model;

pub use handler::{mark_shipped, orders_to_deliver};
pub use model::reconcile_shipped;
