//! Generic rate-limited, error-classifying, paginating API client.
//!
//! One [`ApiClient`] per remote API, parameterized by that API's auth,
//! header set, error map and pagination conventions. The client holds no
//! mutable state after construction, so a single instance is safe to share
//! across threads; every call blocks until its terminal outcome is known.

use std::sync::Arc;
use std::thread;

use serde_json::Value;

use crate::classify::ErrorMap;
use crate::error::Error;
use crate::http::{HttpAuth, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use crate::paginate::{url_with_cursor, PageRules};
use crate::retry::RetryPolicy;

pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    /// This instance's own header set, fixed at construction. Never shared
    /// with or mutated by other instances.
    headers: Vec<(String, String)>,
    auth: HttpAuth,
    errors: ErrorMap,
    retry: RetryPolicy,
    paging: PageRules,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, errors: ErrorMap) -> Self {
        Self {
            transport,
            headers: Vec::new(),
            auth: HttpAuth::None,
            errors,
            retry: RetryPolicy::default(),
            paging: PageRules::default(),
        }
    }

    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_paging(mut self, paging: PageRules) -> Self {
        self.paging = paging;
        self
    }

    /// One logical call: retry through rate limiting, then either parse the
    /// 200 body or classify the failure.
    pub fn call(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<RequestBody>,
    ) -> Result<Value, Error> {
        let response = self.execute_with_retry(method, url, &body)?;

        if response.is_ok() {
            return serde_json::from_slice(&response.body).map_err(|e| Error::JsonOn200 {
                url: url.to_owned(),
                reason: e.to_string(),
            });
        }

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(parsed) => {
                let error = self.errors.classify(response.status, &parsed);
                log::debug!("classified {} from '{url}' as {}", response.status, error.kind);
                Err(Error::Api(error))
            }
            Err(_) => Err(Error::Http {
                url: url.to_owned(),
                status: response.status,
                body: response.text().into_owned(),
            }),
        }
    }

    /// [`Self::call`] plus transparent cursor pagination: while the response
    /// advertises more pages, re-issue the request with the cursor attached
    /// and merge each page's items into the first response, in page order.
    ///
    /// The cursor rides in the JSON body when the call has one, otherwise as
    /// a query parameter. Responses without pagination fields pass through
    /// untouched.
    pub fn call_paged(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let mut body = body;
        let mut merged = self.call(method, url, body.clone().map(RequestBody::Json))?;
        let mut cursor = self.paging.next_cursor_of(&merged);
        let mut pages = 1u32;

        while let Some(current) = cursor {
            if pages >= self.paging.max_pages {
                return Err(Error::MaxPagesReached {
                    url: url.to_owned(),
                    pages,
                });
            }

            let page = match body.as_mut() {
                Some(data) => {
                    if let Some(fields) = data.as_object_mut() {
                        fields.insert(
                            self.paging.cursor_param.to_owned(),
                            Value::String(current),
                        );
                    }
                    self.call(method, url, Some(RequestBody::Json(data.clone())))?
                }
                None => self.call(
                    method,
                    &url_with_cursor(url, self.paging.cursor_param, &current),
                    None,
                )?,
            };

            self.paging.merge_page(&mut merged, &page);
            cursor = self.paging.next_cursor_of(&page);
            pages += 1;
            log::debug!("merged page {pages} from '{url}'");
        }

        Ok(merged)
    }

    /// Iterative 429 loop. Attempts are bounded by `max_retry_rounds + 1`;
    /// any non-429 response, success or not, is terminal for the loop.
    fn execute_with_retry(
        &self,
        method: HttpMethod,
        url: &str,
        body: &Option<RequestBody>,
    ) -> Result<HttpResponse, Error> {
        let mut attempt = 0u32;
        loop {
            let response = self.transport.execute(self.build_request(method, url, body))?;
            if response.status != 429 {
                return Ok(response);
            }

            if attempt >= self.retry.max_retry_rounds {
                return Err(Error::MaxRetriesReached {
                    url: url.to_owned(),
                    attempts: attempt + 1,
                });
            }

            let delay = self.retry.backoff.delay(attempt);
            log::warn!("rate limited on '{url}', sleeping {delay:?} before retrying");
            thread::sleep(delay);
            attempt += 1;
        }
    }

    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: &Option<RequestBody>,
    ) -> HttpRequest {
        let mut request = HttpRequest::new(method, url).with_auth(self.auth.clone());
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        if let Some(body) = body {
            request = request.with_body(body.clone());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ApiErrorKind;
    use crate::http::TransportError;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Plays back a fixed response script and records every request.
    struct ScriptedTransport {
        script: Mutex<Vec<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().expect("request store poisoned").len()
        }

        fn recorded(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store poisoned")
                .clone()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests
                .lock()
                .expect("request store poisoned")
                .push(request);
            let mut script = self.script.lock().expect("script poisoned");
            assert!(!script.is_empty(), "transport script exhausted");
            script.remove(0)
        }
    }

    fn zero_sleep_client(transport: Arc<ScriptedTransport>, rounds: u32) -> ApiClient {
        ApiClient::new(transport, ErrorMap::new().status(401, ApiErrorKind::InvalidToken))
            .with_retry(RetryPolicy::fixed(Duration::ZERO, rounds))
    }

    #[test]
    fn rate_limit_storm_exhausts_after_max_plus_one_attempts() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::new(429, "")),
            Ok(HttpResponse::new(429, "")),
            Ok(HttpResponse::new(429, "")),
        ]);
        let client = zero_sleep_client(transport.clone(), 2);

        let error = client
            .call(HttpMethod::Get, "https://api.test/users/me", None)
            .expect_err("three 429s must exhaust two rounds");

        assert!(
            matches!(error, Error::MaxRetriesReached { attempts: 3, .. }),
            "got {error:?}"
        );
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn recovery_mid_storm_returns_the_parsed_body() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::new(429, "")),
            Ok(HttpResponse::ok_json(r#"{"object": "user"}"#)),
        ]);
        let client = zero_sleep_client(transport.clone(), 5);

        let value = client
            .call(HttpMethod::Get, "https://api.test/users/me", None)
            .expect("second attempt succeeds");

        assert_eq!(value["object"], "user");
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn non_json_error_body_is_an_http_error_not_a_classified_one() {
        let transport =
            ScriptedTransport::new(vec![Ok(HttpResponse::new(502, "<html>bad gateway</html>"))]);
        let client = zero_sleep_client(transport, 0);

        let error = client
            .call(HttpMethod::Get, "https://api.test/users/me", None)
            .expect_err("502 must fail");

        assert!(
            matches!(&error, Error::Http { status: 502, body, .. } if body.contains("bad gateway"))
        );
    }

    #[test]
    fn non_json_200_body_is_a_protocol_violation() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::ok_json("<html>ok</html>"))]);
        let client = zero_sleep_client(transport, 0);

        let error = client
            .call(HttpMethod::Get, "https://api.test/users/me", None)
            .expect_err("non-json 200 must fail");

        assert!(matches!(error, Error::JsonOn200 { .. }));
    }

    #[test]
    fn bodyless_pagination_moves_the_cursor_into_the_query_string() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::ok_json(
                r#"{"results": [1], "has_more": true, "next_cursor": "c2"}"#,
            )),
            Ok(HttpResponse::ok_json(
                r#"{"results": [2], "has_more": false, "next_cursor": null}"#,
            )),
        ]);
        let client = zero_sleep_client(transport.clone(), 0);

        let merged = client
            .call_paged(HttpMethod::Get, "https://api.test/users", None)
            .expect("two pages");

        assert_eq!(merged["results"], serde_json::json!([1, 2]));
        let urls: Vec<String> = transport.recorded().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.test/users",
                "https://api.test/users?start_cursor=c2"
            ]
        );
    }

    #[test]
    fn body_pagination_embeds_the_cursor_in_the_request_body() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::ok_json(
                r#"{"results": ["a"], "has_more": true, "next_cursor": "c2"}"#,
            )),
            Ok(HttpResponse::ok_json(
                r#"{"results": ["b"], "has_more": false, "next_cursor": null}"#,
            )),
        ]);
        let client = zero_sleep_client(transport.clone(), 0);

        let merged = client
            .call_paged(
                HttpMethod::Post,
                "https://api.test/databases/1/query",
                Some(serde_json::json!({"filter": {"x": 1}})),
            )
            .expect("two pages");

        assert_eq!(merged["results"], serde_json::json!(["a", "b"]));

        let second = &transport.recorded()[1];
        let Some(RequestBody::Json(body)) = &second.body else {
            panic!("second request must carry a json body");
        };
        assert_eq!(body["start_cursor"], "c2");
        assert_eq!(body["filter"]["x"], 1);
    }

    #[test]
    fn non_advancing_cursor_trips_the_page_ceiling() {
        let stuck_page = || {
            Ok(HttpResponse::ok_json(
                r#"{"results": [0], "has_more": true, "next_cursor": "same"}"#,
            ))
        };
        let transport = ScriptedTransport::new((0..4).map(|_| stuck_page()).collect());
        let client = zero_sleep_client(transport, 0).with_paging(PageRules::default().with_max_pages(3));

        let error = client
            .call_paged(HttpMethod::Get, "https://api.test/users", None)
            .expect_err("ceiling must trip");

        assert!(matches!(error, Error::MaxPagesReached { pages: 3, .. }));
    }
}
