mod cache_reporter;
mod server;

pub use cache_reporter::*;
pub use server::*;
