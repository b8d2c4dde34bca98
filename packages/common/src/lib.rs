pub mod error;
pub mod filesystem;
pub mod model;
pub mod visitor;

pub use error::*;
pub use filesystem::*;
pub use model::*;
pub use visitor::*;
