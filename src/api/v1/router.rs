use super::error::*;
use super::handler;
use crate::application_port::TokenCodec;
use crate::domain_model::RequestContext;
use crate::logger::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let sign_in = warp::path("auth")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::sign_in);

    let refresh = warp::path("auth")
        .and(warp::path::end())
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let sign_up = warp::path("signup")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::sign_up);

    let heartbeat = warp::path("heartbeat")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_auth(server.token_codec.clone()))
        .and_then(handler::heartbeat);

    sign_in.or(refresh).or(sign_up).or(heartbeat)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Checks an `Authorization` header value and returns the caller's context.
///
/// Only `Bearer <token>` is accepted; the token must verify against `token_codec`.
pub fn authenticate(
    token_codec: &dyn TokenCodec,
    authorization: Option<&str>,
) -> Result<RequestContext, ApiErrorCode> {
    let header = authorization.ok_or_else(|| {
        debug!("missing authorization header");
        ApiErrorCode::Unauthorized
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            debug!("unsupported authorization scheme");
            ApiErrorCode::Unauthorized
        })?;

    let claims = token_codec.verify(token).map_err(|err| {
        match token_codec.peek(token) {
            Ok(unverified) => {
                debug!(untrusted_sub = %unverified.into_untrusted().sub, "rejected token: {err}")
            }
            Err(_) => debug!("rejected token: {err}"),
        }
        ApiErrorCode::from(err)
    })?;
    Ok(RequestContext::authenticated(claims.sub))
}

/// Rejects the request with 401 unless it carries a valid bearer token.
pub fn with_auth(
    token_codec: Arc<dyn TokenCodec>,
) -> impl Filter<Extract = (RequestContext,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        move |authorization: Option<String>| {
            let token_codec = token_codec.clone();
            async move {
                authenticate(token_codec.as_ref(), authorization.as_deref())
                    .map_err(reject::custom)
            }
        },
    )
}
