use super::error::*;
use crate::application_port::{AuthService, SignInInput, SignUpInput};
use crate::domain_model::RequestContext;
use crate::logger::*;
use serde::Deserialize;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub async fn sign_in(
    body: SignInRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let sign_in_input = SignInInput {
        email: body.email,
        password: body.password,
    };
    let tokens = auth_service
        .sign_in(sign_in_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&tokens))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&tokens))
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub repeat_password: String,
}

pub async fn sign_up(
    body: SignUpRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let sign_up_input = SignUpInput {
        email: body.email,
        password: body.password,
        repeat_password: body.repeat_password,
    };
    let tokens = auth_service
        .sign_up(sign_up_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&tokens),
        StatusCode::CREATED,
    ))
}

pub async fn heartbeat(ctx: RequestContext) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = ctx
        .user_id()
        .ok_or_else(|| reject::custom(ApiErrorCode::Unauthorized))?;
    trace!(%user_id, "heartbeat");

    Ok(StatusCode::NO_CONTENT)
}
