use crate::domain_model::*;
use crate::domain_port::{UserDirectory, UserDirectoryError};
use crate::logger::*;
use reqwest::{Response, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the user service's REST API.
pub struct RestUserDirectory {
    http_client: reqwest::Client,
    base_url: String,
}

impl RestUserDirectory {
    pub fn try_new(base_url: &str) -> Result<Self, UserDirectoryError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, UserDirectoryError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UserDirectoryError::Upstream(e.to_string()))?;
        Ok(RestUserDirectory {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    fn user_url(&self, id: &str) -> String {
        format!("{}/users/{}", self.base_url, id)
    }

    async fn get_user(&self, id: &str) -> Result<UserIdentity, UserDirectoryError> {
        let response = self
            .http_client
            .get(self.user_url(id))
            .send()
            .await
            .map_err(upstream)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(upstream),
            StatusCode::NOT_FOUND => Err(UserDirectoryError::NotFound),
            _ => Err(unexpected(response).await),
        }
    }
}

fn upstream(err: reqwest::Error) -> UserDirectoryError {
    warn!("user service request failed: {}", err);
    UserDirectoryError::Upstream(err.to_string())
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    }
}

async fn unexpected(response: Response) -> UserDirectoryError {
    let status = response.status();
    let message = error_message(response).await;
    warn!(%status, "unexpected user service response: {}", message);
    UserDirectoryError::Upstream(format!("{status}: {message}"))
}

/// Id of a created user, taken from the last path segment of `Location`.
fn created_id(response: &Response) -> Option<String> {
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    location
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl UserDirectory for RestUserDirectory {
    async fn lookup_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, UserDirectoryError> {
        let response = self
            .http_client
            .get(self.users_url())
            .query(&[("email", email), ("password", password)])
            .send()
            .await
            .map_err(upstream)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(upstream),
            StatusCode::NOT_FOUND => Err(UserDirectoryError::NotFound),
            StatusCode::BAD_REQUEST => Err(UserDirectoryError::InvalidInput(
                error_message(response).await,
            )),
            _ => Err(unexpected(response).await),
        }
    }

    async fn create_user(&self, dto: CreateUserDto) -> Result<UserIdentity, UserDirectoryError> {
        let response = self
            .http_client
            .post(self.users_url())
            .json(&dto)
            .send()
            .await
            .map_err(upstream)?;

        match response.status() {
            StatusCode::CREATED => {
                let id = created_id(&response).ok_or_else(|| {
                    UserDirectoryError::Upstream("created user without location".to_string())
                })?;
                debug!(user_id = %id, "user created upstream");
                self.get_user(&id).await
            }
            StatusCode::BAD_REQUEST => Err(UserDirectoryError::InvalidInput(
                error_message(response).await,
            )),
            StatusCode::CONFLICT => Err(UserDirectoryError::AlreadyExists),
            _ => Err(unexpected(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "uuid": "6123abc",
            "email": "a@b.com",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    fn dto() -> CreateUserDto {
        CreateUserDto {
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
            repeat_password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn lookup_maps_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("email", "a@b.com"))
            .and(query_param("password", "pw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("password", "wrong"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = RestUserDirectory::try_new(&format!("{}/", server.uri())).unwrap();

        let found = dir.lookup_by_email_and_password("a@b.com", "pw").await.unwrap();
        assert_eq!(found.uuid, UserId("6123abc".to_string()));
        assert_eq!(found.email, "a@b.com");

        assert!(matches!(
            dir.lookup_by_email_and_password("a@b.com", "wrong").await,
            Err(UserDirectoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn create_follows_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(body_json(serde_json::json!({
                "email": "a@b.com",
                "password": "pw",
                "repeat_password": "pw"
            })))
            .respond_with(
                ResponseTemplate::new(201).insert_header("Location", "/users/6123abc"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/6123abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = RestUserDirectory::try_new(&server.uri()).unwrap();
        let created = dir.create_user(dto()).await.unwrap();
        assert_eq!(created.uuid, UserId("6123abc".to_string()));
    }

    #[tokio::test]
    async fn create_maps_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "message": "email is invalid" })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let dir = RestUserDirectory::try_new(&server.uri()).unwrap();
        match dir.create_user(dto()).await {
            Err(UserDirectoryError::InvalidInput(message)) => {
                assert_eq!(message, "email is invalid")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            dir.create_user(dto()).await,
            Err(UserDirectoryError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn server_errors_and_timeouts_are_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("email", "slow@b.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(user_json())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("email", "a@b.com"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir =
            RestUserDirectory::with_timeout(&server.uri(), Duration::from_millis(100)).unwrap();
        assert!(matches!(
            dir.lookup_by_email_and_password("a@b.com", "pw").await,
            Err(UserDirectoryError::Upstream(_))
        ));
        assert!(matches!(
            dir.lookup_by_email_and_password("slow@b.com", "pw").await,
            Err(UserDirectoryError::Upstream(_))
        ));
    }
}
