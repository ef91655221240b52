use super::types::{
    feed_counts, join_pks, ApiError, EntriesWire, EntryPayload, EntryPk, EntryState, Envelope,
    FeedInfo, FeedPk, FeedPks, FeedPksWire, FeedsWire, Order, StateChange, StateChangeWire,
};
use crate::util::decode_entities;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Upper bound for a single API response body.
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// The four operations the list view needs from the server.
///
/// Arguments are owned so the returned futures only borrow `self`; the view
/// moves an `Arc` of the implementation into each spawned request task.
pub trait EntryApi: Send + Sync + 'static {
    /// Fetch entries by pk. Results come back in the order requested; ids the
    /// server did not return are skipped.
    fn get_entries(
        &self,
        pks: Vec<EntryPk>,
        order: Order,
    ) -> impl Future<Output = Result<Vec<EntryPayload>, ApiError>> + Send;

    /// Ordered entry pks for a view. An empty `feeds` list means every feed,
    /// `state: None` means every state.
    fn get_feeds_pks(
        &self,
        feeds: Vec<FeedPk>,
        state: Option<EntryState>,
        order: Order,
    ) -> impl Future<Output = Result<FeedPks, ApiError>> + Send;

    /// Set the state of entries. With `if_state`, only entries currently in
    /// that state are changed.
    fn set_entries(
        &self,
        pks: Vec<EntryPk>,
        state: EntryState,
        if_state: Option<EntryState>,
    ) -> impl Future<Output = Result<StateChange, ApiError>> + Send;

    /// Feed titles and counts.
    fn get_feeds(
        &self,
        feeds: Vec<FeedPk>,
    ) -> impl Future<Output = Result<Vec<FeedInfo>, ApiError>> + Send;
}

/// HTTP transport for the yarr JSON API.
///
/// Requests are sent one at a time in submission order; the fair mutex hands
/// the next turn to the longest waiter. Every request is bounded by a timeout
/// so a hung server cannot wedge the view's loading flag.
pub struct HttpApi {
    client: reqwest::Client,
    base: Option<Url>,
    session: Option<SecretString>,
    timeout: Duration,
    turn: Mutex<()>,
}

impl HttpApi {
    /// Build a transport. `base_url: None` produces a disabled API whose calls
    /// all fail with [`ApiError::Disabled`] without touching the network.
    pub fn new(
        base_url: Option<&str>,
        session: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base = match base_url {
            Some(raw) => Some(parse_base_url(raw)?),
            None => None,
        };

        // PERF-019: Keep a small idle pool, the client talks to a single host
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base,
            session,
            timeout,
            turn: Mutex::new(()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.base.is_some()
    }

    /// API root, used to resolve relative entry links.
    pub fn base_url(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Perform a GET against `{base}/{endpoint}/` and return the raw body once
    /// the envelope reports success.
    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, ApiError> {
        let Some(base) = &self.base else {
            return Err(ApiError::Disabled);
        };

        let mut url = base
            .join(&format!("{}/", endpoint))
            .map_err(|_| ApiError::InvalidUrl)?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        let _turn = self.turn.lock().await;
        tracing::debug!(endpoint, url = %url, "API request");

        let mut request = self.client.get(url);
        if let Some(session) = &self.session {
            request = request.header(
                reqwest::header::COOKIE,
                format!("sessionid={}", session.expose_secret()),
            );
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::Network)?;

        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status().as_u16()));
        }

        let body = tokio::time::timeout(
            self.timeout,
            read_limited_text(response, MAX_RESPONSE_SIZE),
        )
        .await
        .map_err(|_| ApiError::Timeout)??;

        let envelope: Envelope = serde_json::from_str(&body)?;
        if !envelope.success {
            let msg = envelope
                .msg
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Request failed".to_string());
            tracing::debug!(endpoint, msg = %msg, "API rejected request");
            return Err(ApiError::Rejected(msg));
        }

        Ok(body)
    }
}

impl EntryApi for HttpApi {
    async fn get_entries(
        &self,
        pks: Vec<EntryPk>,
        order: Order,
    ) -> Result<Vec<EntryPayload>, ApiError> {
        let params = [
            ("entry_pks", join_pks(&pks)),
            ("order", order.as_str().to_string()),
        ];
        let body = self.request("entry/get", &params).await?;
        let mut wire: EntriesWire = serde_json::from_str(&body)?;

        let mut entries = Vec::with_capacity(pks.len());
        for pk in pks {
            match wire.entries.remove(&pk.to_string()) {
                Some(entry) => entries.push(EntryPayload {
                    pk,
                    feed: entry.feed,
                    state: entry.state,
                    html: Arc::from(entry.html),
                }),
                None => tracing::debug!(pk = %pk, "Entry missing from response"),
            }
        }
        Ok(entries)
    }

    async fn get_feeds_pks(
        &self,
        feeds: Vec<FeedPk>,
        state: Option<EntryState>,
        order: Order,
    ) -> Result<FeedPks, ApiError> {
        let mut params = vec![
            ("feed_pks", join_pks(&feeds)),
            ("order", order.as_str().to_string()),
        ];
        if let Some(state) = state {
            params.push(("state", state.code().to_string()));
        }
        let body = self.request("feed/pks", &params).await?;
        let wire: FeedPksWire = serde_json::from_str(&body)?;
        Ok(FeedPks {
            pks: wire.pks,
            feed_unread: feed_counts(wire.feed_unread),
        })
    }

    async fn set_entries(
        &self,
        pks: Vec<EntryPk>,
        state: EntryState,
        if_state: Option<EntryState>,
    ) -> Result<StateChange, ApiError> {
        let mut params = vec![
            ("entry_pks", join_pks(&pks)),
            ("state", state.code().to_string()),
        ];
        if let Some(if_state) = if_state {
            params.push(("if_state", if_state.code().to_string()));
        }
        let body = self.request("entry/set", &params).await?;
        let wire: StateChangeWire = serde_json::from_str(&body)?;
        Ok(StateChange {
            msg: wire.msg.unwrap_or_default(),
            feed_unread: feed_counts(wire.feed_unread),
        })
    }

    async fn get_feeds(&self, feeds: Vec<FeedPk>) -> Result<Vec<FeedInfo>, ApiError> {
        let params = [
            ("feed_pks", join_pks(&feeds)),
            ("fields", "title,text,count_unread".to_string()),
        ];
        let body = self.request("feed/get", &params).await?;
        let wire: FeedsWire = serde_json::from_str(&body)?;

        let mut infos: Vec<FeedInfo> = wire
            .feeds
            .into_iter()
            .filter_map(|(key, feed)| {
                let pk = key.parse::<i64>().ok()?;
                // The server HTML-escapes text fields
                let title = feed
                    .text
                    .filter(|t| !t.is_empty())
                    .or(feed.title)
                    .map(|t| decode_entities(&t).into_owned())
                    .unwrap_or_else(|| "untitled".to_string());
                Some(FeedInfo {
                    pk: FeedPk(pk),
                    title,
                    unread: feed.count_unread,
                })
            })
            .collect();
        infos.sort_by_key(|f| f.pk);
        Ok(infos)
    }
}

/// Validate the configured API root and make sure relative joins append to it.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim()).map_err(|_| ApiError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl);
    }
    if url.scheme() == "http" {
        tracing::warn!(api_url = %url, "Using plain HTTP for the API; the session cookie is sent unencrypted");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ApiError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> HttpApi {
        HttpApi::new(
            Some(&format!("{}/yarr/api", server.uri())),
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_disabled_api_short_circuits() {
        let api = HttpApi::new(None, None, Duration::from_secs(5)).unwrap();
        assert!(!api.is_enabled());
        let result = api.get_entries(vec![EntryPk(1)], Order::Desc).await;
        assert!(matches!(result, Err(ApiError::Disabled)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpApi::new(Some("ftp://example.com/api"), None, Duration::from_secs(5));
        assert!(matches!(result, Err(ApiError::InvalidUrl)));
        let result = HttpApi::new(Some("not a url"), None, Duration::from_secs(5));
        assert!(matches!(result, Err(ApiError::InvalidUrl)));
    }

    #[tokio::test]
    async fn test_get_entries_returns_requested_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/yarr/api/entry/get/"))
            .and(query_param("entry_pks", "3,1,2"))
            .and(query_param("order", "asc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success": true, "entries": {
                    "1": {"feed": 7, "state": 0, "html": "<div>one</div>"},
                    "2": {"feed": 7, "state": 1, "html": "<div>two</div>"},
                    "3": {"feed": 8, "state": 2, "html": "<div>three</div>"}
                }}"#,
            ))
            .mount(&server)
            .await;

        let entries = api_for(&server)
            .get_entries(vec![EntryPk(3), EntryPk(1), EntryPk(2)], Order::Asc)
            .await
            .unwrap();

        let pks: Vec<EntryPk> = entries.iter().map(|e| e.pk).collect();
        assert_eq!(pks, vec![EntryPk(3), EntryPk(1), EntryPk(2)]);
        assert_eq!(entries[0].state, EntryState::Saved);
        assert_eq!(entries[0].feed, FeedPk(8));
        assert_eq!(&*entries[1].html, "<div>one</div>");
    }

    #[tokio::test]
    async fn test_get_entries_skips_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/yarr/api/entry/get/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success": true, "entries": {"5": {"feed": 1, "state": 0, "html": "x"}}}"#,
            ))
            .mount(&server)
            .await;

        let entries = api_for(&server)
            .get_entries(vec![EntryPk(4), EntryPk(5)], Order::Desc)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pk, EntryPk(5));
    }

    #[tokio::test]
    async fn test_rejected_response_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success": false, "msg": "Unknown operation"}"#),
            )
            .mount(&server)
            .await;

        let result = api_for(&server)
            .set_entries(vec![EntryPk(1)], EntryState::Read, None)
            .await;
        match result {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Unknown operation"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_entries_sends_if_state_and_parses_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/yarr/api/entry/set/"))
            .and(query_param("entry_pks", "1,2"))
            .and(query_param("state", "1"))
            .and(query_param("if_state", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success": true, "msg": "Marked as read", "feed_unread": {"3": 0, "4": 12}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let change = api_for(&server)
            .set_entries(
                vec![EntryPk(1), EntryPk(2)],
                EntryState::Read,
                Some(EntryState::Unread),
            )
            .await
            .unwrap();
        assert_eq!(change.msg, "Marked as read");
        assert_eq!(change.feed_unread.get(&FeedPk(4)), Some(&12));
        assert_eq!(change.feed_unread.get(&FeedPk(3)), Some(&0));
    }

    #[tokio::test]
    async fn test_get_feeds_pks_omits_state_for_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/yarr/api/feed/pks/"))
            .and(query_param("feed_pks", ""))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success": true, "pks": [9, 8, 7], "feed_unread": {"1": 3}}"#,
            ))
            .mount(&server)
            .await;

        let result = api_for(&server)
            .get_feeds_pks(Vec::new(), None, Order::Desc)
            .await
            .unwrap();
        assert_eq!(result.pks, vec![EntryPk(9), EntryPk(8), EntryPk(7)]);
        assert_eq!(result.feed_unread.get(&FeedPk(1)), Some(&3));

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default().to_string();
        assert!(!query.contains("state="), "query was {}", query);
    }

    #[tokio::test]
    async fn test_get_feeds_decodes_titles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/yarr/api/feed/get/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success": true, "feeds": {
                    "2": {"title": "Tom &amp; Jerry", "text": "", "count_unread": 4},
                    "1": {"title": "Raw", "text": "Custom name", "count_unread": 0}
                }}"#,
            ))
            .mount(&server)
            .await;

        let feeds = api_for(&server)
            .get_feeds(vec![FeedPk(1), FeedPk(2)])
            .await
            .unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].title, "Custom name");
        assert_eq!(feeds[1].title, "Tom & Jerry");
        assert_eq!(feeds[1].unread, Some(4));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = api_for(&server).get_entries(vec![EntryPk(1)], Order::Desc).await;
        assert!(matches!(result, Err(ApiError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let result = api_for(&server).get_entries(vec![EntryPk(1)], Order::Desc).await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_session_cookie_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cookie", "sessionid=abc123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"success": true, "entries": {}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpApi::new(
            Some(&server.uri()),
            Some(SecretString::from("abc123")),
            Duration::from_secs(5),
        )
        .unwrap();
        let entries = api.get_entries(vec![EntryPk(1)], Order::Desc).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success": true, "entries": {}}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let api = HttpApi::new(Some(&server.uri()), None, Duration::from_millis(100)).unwrap();
        let result = api.get_entries(vec![EntryPk(1)], Order::Desc).await;
        assert!(matches!(result, Err(ApiError::Timeout)));
    }
}
