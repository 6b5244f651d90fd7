mod constants;
mod input;
pub mod types;

pub use constants::*;
pub use input::sanitize_package;
