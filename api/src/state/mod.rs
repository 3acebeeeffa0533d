mod settings;
mod transaction;
mod user;

pub use settings::*;
pub use transaction::*;
pub use user::*;
