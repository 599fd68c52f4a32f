//! Blocking Graph API client.
//!
//! Requests carry a bearer token and JSON bodies. Collection reads follow
//! `@odata.nextLink` until the last page. Every request goes through
//! [`with_retry`], so throttling and gateway errors are retried.

use crate::error::{Error, Result, parse_retry_after};
use crate::retry::{LogCallback, with_retry};
use crate::types::{GraphConfig, ODataPage, RetryConfig};
use reconcile::{EntityKind, RemoteEntitySummary, TenantApi};
use serde::de::DeserializeOwned;
use serde_json::Value;
use ureq::Body;
use ureq::http::Response;

const USER_AGENT: &str = concat!("intune-import/", env!("CARGO_PKG_VERSION"));

/// Graph API client bound to one tenant token.
///
/// # Example
///
/// ```no_run
/// use graphkit::{GraphClient, GraphConfig};
///
/// let client = GraphClient::new(&GraphConfig::default(), "eyJ0eXAi...").unwrap();
/// let tags: Vec<serde_json::Value> = client.list_all("deviceManagement/roleScopeTags").unwrap();
/// println!("Found {} scope tags", tags.len());
/// ```
pub struct GraphClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    retry: RetryConfig,
}

impl GraphClient {
    /// Create a client for the configured cloud and API version.
    pub fn new(config: &GraphConfig, token: impl Into<String>) -> Result<Self> {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();

        Self::with_agent(
            ureq::Agent::new_with_config(agent_config),
            config.base_url(),
            token,
        )
    }

    /// Create a client from a prepared agent and API root.
    ///
    /// The agent must be configured with `http_status_as_error(false)`.
    pub fn with_agent(
        agent: ureq::Agent,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken("access token is empty".to_string()));
        }

        Ok(Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            retry: RetryConfig::default(),
        })
    }

    /// Replace the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a collection, e.g. `deviceManagement/deviceConfigurations`.
    #[must_use]
    pub fn collection_url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim_matches('/'))
    }

    /// URL of one object in a collection.
    #[must_use]
    pub fn item_url(&self, resource: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(resource), id)
    }

    /// GET a URL and decode the JSON response.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        with_retry(&self.retry, Some(&LogCallback), || {
            let response = self
                .agent
                .get(url)
                .header("Authorization", self.bearer())
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .call()?;
            read_json(check_status(response)?)
        })
    }

    /// POST a JSON body, returning the created object.
    pub fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        with_retry(&self.retry, Some(&LogCallback), || {
            let response = self
                .agent
                .post(url)
                .header("Authorization", self.bearer())
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_json(body)?;
            read_json(check_status(response)?)
        })
    }

    /// PATCH a JSON body. The response body, if any, is ignored.
    pub fn patch_json(&self, url: &str, body: &Value) -> Result<()> {
        with_retry(&self.retry, Some(&LogCallback), || {
            let response = self
                .agent
                .patch(url)
                .header("Authorization", self.bearer())
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_json(body)?;
            check_status(response).map(|_| ())
        })
    }

    /// Read every item of a collection, following `@odata.nextLink`.
    pub fn list_all<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        let mut url = self.collection_url(resource);
        let mut items = Vec::new();

        loop {
            log::debug!("Fetching page: {}", url);
            let page: ODataPage<T> = self.get_json(&url)?;
            items.extend(page.value);

            match page.next_link {
                Some(next) => url = next,
                None => return Ok(items),
            }
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl TenantApi for GraphClient {
    fn fetch_all(&self, kind: EntityKind) -> anyhow::Result<Vec<RemoteEntitySummary>> {
        Ok(self.list_all(kind.resource())?)
    }

    fn create(&self, kind: EntityKind, body: &Value) -> anyhow::Result<Value> {
        Ok(self.post_json(&self.collection_url(kind.resource()), body)?)
    }

    fn patch(&self, kind: EntityKind, id: &str, body: &Value) -> anyhow::Result<()> {
        Ok(self.patch_json(&self.item_url(kind.resource(), id), body)?)
    }
}

/// Turn a non-success response into an [`Error::Api`].
fn check_status(response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }

    let retry_after = parse_retry_after(
        response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok()),
    );
    let text = response.into_body().read_to_string().unwrap_or_default();
    Err(Error::from_response(status, &text, retry_after))
}

fn read_json<T: DeserializeOwned>(mut response: Response<Body>) -> Result<T> {
    let text = response.body_mut().read_to_string()?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn client(base: &str) -> GraphClient {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .http_status_as_error(false)
                .proxy(None)
                .timeout_global(Some(Duration::from_secs(10)))
                .build(),
        );
        GraphClient::with_agent(agent, base, "token")
            .unwrap()
            .with_retry(RetryConfig::new(
                3,
                Duration::from_millis(1),
                Duration::from_millis(5),
            ))
    }

    /// Serve canned responses, one per connection. The responses are built
    /// from the server's base URL. The handle yields each request line.
    fn serve<F>(build: F) -> (String, thread::JoinHandle<Vec<String>>)
    where
        F: FnOnce(&str) -> Vec<String>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let responses = build(&base);

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line.trim().is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut body = vec![0u8; content_length];
                reader.read_exact(&mut body).unwrap();

                requests.push(request_line.trim_end().to_string());
                reader.get_mut().write_all(response.as_bytes()).unwrap();
            }
            requests
        });

        (base, handle)
    }

    fn response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = GraphClient::new(&GraphConfig::default(), "  ").err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_urls() {
        let client = GraphClient::new(&GraphConfig::default(), "token").unwrap();
        assert_eq!(client.base_url(), "https://graph.microsoft.com/beta");
        assert_eq!(
            client.collection_url("deviceManagement/roleScopeTags"),
            "https://graph.microsoft.com/beta/deviceManagement/roleScopeTags"
        );
        assert_eq!(
            client.item_url("/deviceManagement/deviceConfigurations/", "B"),
            "https://graph.microsoft.com/beta/deviceManagement/deviceConfigurations/B"
        );
    }

    #[test]
    fn test_list_all_follows_next_link() {
        let (base, handle) = serve(|base| {
            vec![
                response(
                    "200 OK",
                    "",
                    &format!(
                        r#"{{"value":[{{"id":"0","displayName":"Default","isBuiltIn":true}}],"@odata.nextLink":"{}/deviceManagement/roleScopeTags?$skiptoken=2"}}"#,
                        base
                    ),
                ),
                response(
                    "200 OK",
                    "",
                    r#"{"value":[{"id":"3","displayName":"Corporate","isBuiltIn":false}]}"#,
                ),
            ]
        });

        let tags = client(&base).fetch_all(EntityKind::ScopeTag).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].is_built_in, Some(true));
        assert_eq!(tags[1].display_name, "Corporate");

        let requests = handle.join().unwrap();
        assert_eq!(requests[0], "GET /deviceManagement/roleScopeTags HTTP/1.1");
        assert!(requests[1].contains("$skiptoken=2"));
    }

    #[test]
    fn test_throttled_request_retried() {
        let (base, handle) = serve(|_| {
            vec![
                response(
                    "429 Too Many Requests",
                    "Retry-After: 0\r\n",
                    r#"{"error":{"code":"TooManyRequests","message":"slow down"}}"#,
                ),
                response("200 OK", "", r#"{"value":[]}"#),
            ]
        });

        let items = client(&base)
            .fetch_all(EntityKind::CompliancePolicy)
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(handle.join().unwrap().len(), 2);
    }

    #[test]
    fn test_create_returns_remote_object() {
        let (base, handle) = serve(|_| {
            vec![response(
                "201 Created",
                "",
                r#"{"id":"new-id","displayName":"Baseline"}"#,
            )]
        });

        let created = client(&base)
            .create(
                EntityKind::DeviceConfiguration,
                &serde_json::json!({"displayName": "Baseline"}),
            )
            .unwrap();
        assert_eq!(created["id"], "new-id");
        assert_eq!(
            handle.join().unwrap()[0],
            "POST /deviceManagement/deviceConfigurations HTTP/1.1"
        );
    }

    #[test]
    fn test_rejected_request_not_retried() {
        let (base, handle) = serve(|_| {
            vec![response(
                "400 Bad Request",
                "",
                r#"{"error":{"code":"BadRequest","message":"Invalid property"}}"#,
            )]
        });

        let err = client(&base)
            .patch_json(
                &format!("{}/deviceManagement/deviceConfigurations/B", base),
                &serde_json::json!({"id": "B"}),
            )
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert!(err.to_string().contains("Invalid property"));
        assert_eq!(handle.join().unwrap().len(), 1);
    }
}
