mod auth_service_impl;
mod token_codec_jwt;

pub use auth_service_impl::*;
pub use token_codec_jwt::*;
