pub mod account;
pub mod fulfillment;
pub mod product;
pub mod wishlist;
