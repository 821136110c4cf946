// store

mod cache;

pub use cache::*;

// directory

mod user_directory;

pub use user_directory::*;
