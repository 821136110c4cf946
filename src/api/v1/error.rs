use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiErrorCode {
    #[error("{0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("system error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::BadRequest(_) => "BAD_REQUEST",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiErrorCode::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ApiErrorBody {
        ApiErrorBody {
            error: ApiError {
                code: self.code(),
                message: self.to_string(),
            },
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error.class() {
            ErrorClass::BadRequest => match error {
                AuthError::Validation(message) => ApiErrorCode::BadRequest(message),
                other => ApiErrorCode::BadRequest(other.to_string()),
            },
            ErrorClass::Unauthorized => {
                debug!("authentication rejected: {}", error);
                ApiErrorCode::Unauthorized
            }
            ErrorClass::Internal => ApiErrorCode::internal(error),
        }
    }
}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        ApiErrorCode::from(AuthError::from(error))
    }
}

fn classify(err: &Rejection) -> ApiErrorCode {
    if let Some(err) = err.find::<ApiErrorCode>() {
        err.clone()
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        debug!("undecodable body: {}", err);
        ApiErrorCode::BadRequest("invalid request body".to_string())
    } else if err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
    {
        ApiErrorCode::BadRequest("invalid request body".to_string())
    } else if err.find::<reject::InvalidHeader>().is_some() {
        ApiErrorCode::Unauthorized
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else {
        ApiErrorCode::internal(format!("Unhandled rejection: {:?}", err))
    }
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = classify(&err);
    let json = warp::reply::json(&code.body());
    Ok(warp::reply::with_status(json, code.status_code()))
}
