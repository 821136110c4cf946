use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{UserId, UserIdentity};
use crate::domain_port::*;
use crate::infra::*;
use crate::logger::*;
use crate::server::CacheReporter;
use crate::settings::Settings;
use anyhow::anyhow;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub token_codec: Arc<dyn TokenCodec>,
    reporter_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Server {
    /// Wires services that were built elsewhere. No background task is started.
    pub fn from_parts(auth_service: Arc<dyn AuthService>, token_codec: Arc<dyn TokenCodec>) -> Self {
        Self {
            auth_service,
            token_codec,
            reporter_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            audience: settings.jwt.audience.clone(),
            signing_key: settings.jwt.secret.clone().into_bytes(),
        }));

        let refresh_cache = Arc::new(BoundedCache::new(settings.cache.capacity_bytes));

        let user_directory: Arc<dyn UserDirectory> = match settings.user.backend.as_str() {
            "memory" => {
                let directory = InMemoryUserDirectory::default();
                for seed in &settings.user.seed {
                    let uuid: UserId = seed.uuid.parse()?;
                    directory
                        .seed(
                            UserIdentity {
                                uuid,
                                email: seed.email.clone(),
                            },
                            &seed.password,
                        )
                        .map_err(|e| anyhow!(e))?;
                }
                info!(users = directory.len(), "in-memory user directory ready");
                Arc::new(directory)
            }
            "rest" => {
                let url = settings
                    .user
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow!("user.url is required for the rest backend"))?;
                info!(url, "using user service");
                Arc::new(RestUserDirectory::try_new(url).map_err(|e| anyhow!(e))?)
            }
            other => return Err(anyhow!("Unknown user backend: {}", other)),
        };

        let refresh_ttl = match settings.jwt.refresh_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let policy = TokenPolicy {
            audience: settings.jwt.audience.clone(),
            access_ttl: Duration::from_secs(settings.jwt.access_ttl_secs),
            refresh_ttl,
        };
        let refresh_store: Arc<dyn Cache> = refresh_cache.clone();
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_directory,
            token_codec.clone(),
            refresh_store,
            policy,
        ));

        let server = Self::from_parts(auth_service, token_codec);

        if settings.cache.stats_interval_secs > 0 {
            let reporter = CacheReporter::new(
                refresh_cache,
                Duration::from_secs(settings.cache.stats_interval_secs),
                server.cancel.clone(),
            );
            let handle = tokio::spawn(async move { reporter.run().await });
            *server.reporter_handle.lock() = Some(handle);
        }

        info!("server started");
        Ok(server)
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.reporter_handle.lock().take();
        if let Some(handle) = handle {
            let r = handle.await;
            info!("cache reporter handle dropped: {:?}", r);
        }
    }
}
