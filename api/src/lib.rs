pub mod consts;
pub mod error;
pub mod event;
pub mod level;
pub mod session;
pub mod state;
pub mod utils;

pub use crate::consts::*;

pub mod prelude {
    pub use crate::consts::*;
    pub use crate::error::*;
    pub use crate::event::*;
    pub use crate::level::*;
    pub use crate::session::*;
    pub use crate::state::*;
    pub use crate::utils::*;
}
