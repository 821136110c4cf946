mod error;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorBody, ApiErrorCode, recover_error};
pub use router::{authenticate, routes, with_auth};
