pub mod builder;
pub mod format;
pub mod layout;
pub mod model;
pub mod types;

pub use builder::*;
pub use layout::*;
pub use model::*;
pub use types::*;
