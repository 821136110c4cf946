mod context;
mod token;
mod user;

pub use context::*;
pub use token::*;
pub use user::*;
