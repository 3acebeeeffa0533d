pub mod store;
pub mod web;

pub use store::{open, primary, DbError, FarmStore, Health};
pub use web::web_loop;
