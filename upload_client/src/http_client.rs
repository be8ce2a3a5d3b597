use anyhow::anyhow;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};

use crate::error::Result;

/// Static bearer credentials for the coordination service.  Obtaining and
/// refreshing the token is the embedding application's concern; the engine
/// only attaches what it is given.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token: String,
}

/// Builds the client used to talk to the upload-coordination service.
pub fn build_auth_http_client(auth_config: &Option<AuthConfig>) -> Result<ClientWithMiddleware> {
    let auth_middleware = auth_config.as_ref().map(AuthMiddleware::from);
    let reqwest_client = reqwest::Client::builder().build()?;
    Ok(ClientBuilder::new(reqwest_client).maybe_with(auth_middleware).build())
}

/// Builds the client used for part transfers.  Part targets are
/// pre-authorized, so no auth middleware is attached.
pub fn build_http_client() -> Result<ClientWithMiddleware> {
    let reqwest_client = reqwest::Client::builder().build()?;
    Ok(ClientBuilder::new(reqwest_client).build())
}

/// Helper trait to allow the reqwest_middleware client to optionally add a middleware.
trait OptionalMiddleware {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self;
}

impl OptionalMiddleware for ClientBuilder {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self {
        match middleware {
            Some(m) => self.with(m),
            None => self,
        }
    }
}

/// AuthMiddleware adds the session's bearer token to outbound coordinator
/// requests.
pub struct AuthMiddleware {
    token: String,
}

impl From<&AuthConfig> for AuthMiddleware {
    fn from(cfg: &AuthConfig) -> Self {
        Self {
            token: cfg.token.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let header = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow!("invalid auth token: {e}")))?;

        req.headers_mut().insert(AUTHORIZATION, header);
        next.run(req, extensions).await
    }
}
