//! Command implementations for leaf-info

pub mod info;
pub mod refresh;
pub mod status;

pub use info::info;
pub use refresh::refresh;
pub use status::status;
