mod bounded_cache;
mod user_directory_memory;
mod user_directory_rest;

pub use bounded_cache::*;
pub use user_directory_memory::*;
pub use user_directory_rest::*;
