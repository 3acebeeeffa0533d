pub mod clock;
pub mod hooks;
pub mod mine;
pub mod settings;
pub mod store;
pub mod utils;

pub use clock::*;
pub use hooks::*;
pub use mine::*;
pub use settings::*;
pub use store::*;
pub use utils::*;
