use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use sessmem_sessions::{CacheError, CacheResult, EmailCodeData, VerifyCodeRequest};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::wire::{self, BLACKLISTED_HEADER, ErrorBody, LAST_SEEN_HEADER};
use crate::{CacheMode, SessionCache};

/// HTTP access to a remote sessmem server.
///
/// Each call is exactly one round trip. There is no retry and no fallback
/// to a local store; connection and protocol failures surface as
/// [`CacheError::Transport`].
#[derive(Debug, Clone)]
pub struct RemoteCache {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteCache {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> CacheResult<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Like [`new`](Self::new) with a preconfigured HTTP client.
    pub fn with_client(base_url: &str, http: reqwest::Client) -> CacheResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CacheError::invalid_request(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(CacheError::invalid_request(format!(
                "base URL must be http(s): {base_url}"
            )));
        }
        Ok(Self { http, base_url })
    }

    /// The server this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> CacheResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CacheError::internal("base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    async fn send(&self, builder: RequestBuilder) -> CacheResult<Response> {
        let resp = builder.send().await.map_err(transport)?;
        check(resp).await
    }
}

async fn check(resp: Response) -> CacheResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(wire) => wire.into_error(status.as_u16()),
        Err(_) => CacheError::from_wire(None, Some(body), status.as_u16()),
    };
    tracing::debug!(status = status.as_u16(), kind = err.kind(), "remote call failed");
    Err(err)
}

fn transport(err: reqwest::Error) -> CacheError {
    CacheError::transport(err.to_string())
}

fn header<'a>(resp: &'a Response, name: &str) -> CacheResult<&'a str> {
    resp.headers()
        .get(name)
        .ok_or_else(|| CacheError::transport(format!("response is missing the {name} header")))?
        .to_str()
        .map_err(|_| CacheError::transport(format!("{name} header is not ASCII")))
}

fn signature_segment(signature: &[u8]) -> CacheResult<String> {
    if signature.is_empty() {
        return Err(CacheError::invalid_request("token signature is empty"));
    }
    Ok(wire::encode_signature(signature))
}

#[async_trait]
impl SessionCache for RemoteCache {
    async fn blacklist(&self, signature: &[u8]) -> CacheResult<()> {
        let segment = signature_segment(signature)?;
        let url = self.url(&["blacklist", &segment])?;
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    async fn is_blacklisted(&self, signature: &[u8]) -> CacheResult<bool> {
        let segment = signature_segment(signature)?;
        let url = self.url(&["blacklist", &segment])?;
        let resp = self.send(self.request(Method::GET, url)).await?;
        match header(&resp, BLACKLISTED_HEADER)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(CacheError::transport(format!(
                "unexpected {BLACKLISTED_HEADER} header value {other:?}"
            ))),
        }
    }

    async fn save_last_seen(&self, user_id: Uuid) -> CacheResult<()> {
        let url = self.url(&["lastSeen", &user_id.to_string()])?;
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    async fn get_last_seen(&self, user_id: Uuid) -> CacheResult<OffsetDateTime> {
        let url = self.url(&["lastSeen", &user_id.to_string()])?;
        let resp = self.send(self.request(Method::GET, url)).await?;
        let raw = header(&resp, LAST_SEEN_HEADER)?;
        let seconds: i64 = raw.parse().map_err(|_| {
            CacheError::transport(format!("{LAST_SEEN_HEADER} header is not a number: {raw:?}"))
        })?;
        OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|e| CacheError::transport(format!("{LAST_SEEN_HEADER} out of range: {e}")))
    }

    async fn issue_code(&self, user_id: Uuid, email: &str) -> CacheResult<EmailCodeData> {
        let url = self.url(&["emailCodes", &user_id.to_string()])?;
        let builder = self
            .request(Method::POST, url)
            .query(&[("email", email)]);
        let resp = self.send(builder).await?;
        resp.json::<EmailCodeData>().await.map_err(transport)
    }

    async fn verify_code(&self, user_id: Uuid, email: &str, code: &str) -> CacheResult<()> {
        let url = self.url(&["emailCodes", &user_id.to_string(), "verify"])?;
        let body = VerifyCodeRequest {
            new_email: email.to_owned(),
            code: code.to_owned(),
        };
        self.send(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(())
    }

    async fn pending_code(&self, user_id: Uuid) -> CacheResult<Option<EmailCodeData>> {
        let url = self.url(&["emailCodes", &user_id.to_string()])?;
        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport)?;
        // Only the server's own not_found answer means "nothing pending"; a
        // bare 404 comes from a path the server does not route.
        if resp.status() == StatusCode::NOT_FOUND {
            let body = resp.text().await.map_err(transport)?;
            return match serde_json::from_str::<ErrorBody>(&body) {
                Ok(ErrorBody { kind: Some(kind), .. }) if kind == CacheError::NotFound.kind() => {
                    Ok(None)
                }
                _ => Err(CacheError::transport(format!(
                    "unexpected 404 from {}: {body:?}",
                    self.base_url
                ))),
            };
        }
        let resp = check(resp).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        resp.json::<EmailCodeData>().await.map(Some).map_err(transport)
    }

    fn mode(&self) -> CacheMode {
        CacheMode::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let cache = RemoteCache::new("http://mem.internal:8080").unwrap();
        let user = Uuid::nil();
        assert_eq!(
            cache
                .url(&["emailCodes", &user.to_string(), "verify"])
                .unwrap()
                .as_str(),
            "http://mem.internal:8080/emailCodes/00000000-0000-0000-0000-000000000000/verify"
        );

        let cache = RemoteCache::new("http://mem.internal/cache/").unwrap();
        assert_eq!(
            cache.url(&["blacklist", "YWJj"]).unwrap().as_str(),
            "http://mem.internal/cache/blacklist/YWJj"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(RemoteCache::new("not a url").is_err());
        assert!(RemoteCache::new("mailto:a@b.com").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let cache = RemoteCache::new("http://127.0.0.1:1").unwrap();
        let err = cache.is_blacklisted(b"sig").await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_empty_signature_rejected_locally() {
        let cache = RemoteCache::new("http://127.0.0.1:1").unwrap();
        let err = cache.blacklist(b"").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }
}
