//! # Herald Mailgun
//!
//! Wrapper for sending email through the Mailgun API, on the shared herald
//! pipeline. Works with trial accounts; EU-hosted domains use the `api.eu`
//! host, selected with [`MailgunConfig::eu_domain`].
//!
//! Token and domain are validated at construction: an invalid token
//! surfaces as [`herald_core::ApiErrorKind::InvalidToken`], a domain the
//! token cannot see as [`herald_core::ApiErrorKind::InvalidDomain`].

use std::sync::Arc;

use serde::Deserialize;

use herald_core::{
    ApiClient, ApiError, ApiErrorKind, Error, ErrorMap, HttpAuth, HttpMethod, HttpTransport,
    ReqwestTransport, RequestBody, RetryPolicy,
};

const BASE_URL: &str = "https://api.mailgun.net";
const BASE_URL_EU: &str = "https://api.eu.mailgun.net";

/// Connection settings for [`MailgunClient::connect`].
pub struct MailgunConfig {
    token: String,
    domain: String,
    sender_name: String,
    eu_domain: bool,
    retry: RetryPolicy,
    transport: Arc<dyn HttpTransport>,
}

impl MailgunConfig {
    pub fn new(
        token: impl Into<String>,
        domain: impl Into<String>,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            domain: domain.into(),
            sender_name: sender_name.into(),
            eu_domain: false,
            retry: RetryPolicy::default(),
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    /// Route calls through the EU host.
    pub fn eu_domain(mut self) -> Self {
        self.eu_domain = true;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }
}

/// Queued-message receipt returned by the messages endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendReceipt {
    pub id: String,
    pub message: String,
}

/// Mailgun API client bound to one sending domain.
pub struct MailgunClient {
    api: ApiClient,
    base_url: &'static str,
    domain: String,
    sender_name: String,
}

impl std::fmt::Debug for MailgunClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunClient")
            .field("base_url", &self.base_url)
            .field("domain", &self.domain)
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

impl MailgunClient {
    /// Validate token and domain and return a ready client.
    ///
    /// The domain lookup doubles as the credential check: a 401 propagates
    /// as the invalid-token condition, while any other failure on the
    /// lookup means the domain itself is wrong for this token.
    pub fn connect(config: MailgunConfig) -> Result<Self, Error> {
        let api = ApiClient::new(config.transport, error_map())
            .with_auth(HttpAuth::Basic {
                username: String::from("api"),
                password: config.token,
            })
            .with_retry(config.retry);

        let client = Self {
            api,
            base_url: if config.eu_domain { BASE_URL_EU } else { BASE_URL },
            domain: config.domain,
            sender_name: config.sender_name,
        };
        client.validate_domain()?;
        Ok(client)
    }

    /// Send a plain-text message to one or more recipients. The `from`
    /// address is derived from the sender name and sending domain.
    pub fn send_message(
        &self,
        recipients: &[String],
        subject: &str,
        text: &str,
    ) -> Result<SendReceipt, Error> {
        let mut form = vec![(
            String::from("from"),
            format!("{} <mailgun@{}>", self.sender_name, self.domain),
        )];
        for recipient in recipients {
            form.push((String::from("to"), recipient.clone()));
        }
        form.push((String::from("subject"), subject.to_owned()));
        form.push((String::from("text"), text.to_owned()));

        let url = format!("{}/v3/{}/messages", self.base_url, self.domain);
        let response = self
            .api
            .call(HttpMethod::Post, &url, Some(RequestBody::Form(form)))?;

        serde_json::from_value(response.clone()).map_err(|e| {
            Error::JsonOn200 {
                url,
                reason: format!("unexpected receipt shape: {e} in {response}"),
            }
        })
    }

    fn validate_domain(&self) -> Result<(), Error> {
        let url = format!("{}/v4/domains/{}", self.base_url, self.domain);
        match self.api.call(HttpMethod::Get, &url, None) {
            Ok(_) => Ok(()),
            Err(Error::Api(api)) if api.kind == ApiErrorKind::InvalidToken => {
                Err(Error::Api(api))
            }
            Err(Error::Api(api)) => Err(Error::Api(ApiError {
                kind: ApiErrorKind::InvalidDomain,
                status: api.status,
                code: api.code.clone(),
                message: format!("invalid domain '{}': {api}", self.domain),
            })),
            Err(Error::Http { status, body, .. }) => Err(Error::Api(ApiError {
                kind: ApiErrorKind::InvalidDomain,
                status,
                code: None,
                message: format!("invalid domain '{}': {body}", self.domain),
            })),
            Err(other) => Err(other),
        }
    }
}

/// Only 401 is documented with a stable meaning; everything else keeps its
/// raw body under the catch-all kind.
fn error_map() -> ErrorMap {
    ErrorMap::new().status(401, ApiErrorKind::InvalidToken)
}
