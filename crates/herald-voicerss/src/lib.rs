//! # Herald VoiceRSS
//!
//! Wrapper for downloading text-to-speech audio from the VoiceRSS API
//! (<https://www.voicerss.org/api/>). A free API key allows 350 requests a
//! day; each request converts up to roughly 100kb of text, about 25 000
//! characters depending on encoding.
//!
//! The API speaks no JSON: success is raw audio bytes, failure is a
//! free-text sentence inside a 200 body. See [`match_inline_error`] for the
//! sentinel handling.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use herald_core::{
    HttpMethod, HttpRequest, HttpTransport, ReqwestTransport, RequestBody, TransportError,
};

const API_URL: &str = "https://api.voicerss.org";

/// Failure sentences the API embeds in an otherwise successful response.
/// There is no structured error channel; the published strings are matched
/// as substrings of the body text.
const INLINE_ERRORS: [&str; 9] = [
    "The account is inactive!",
    "The subscription is expired or requests count limitation is exceeded!",
    "The request content length is too large!",
    "The language does not support!",
    "The language is not specified!",
    "The text is not specified!",
    "The API key is not available!",
    "The API key is not specified!",
    "The subscription does not support SSML!",
];

/// Failures surfaced by [`VoiceRssClient`].
#[derive(Debug, Error)]
pub enum VoiceRssError {
    #[error("text is {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("voicerss returned status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("voicerss api error: {message}")]
    Api { message: &'static str },
    #[error("failed writing audio to '{path}': {reason}")]
    Io { path: PathBuf, reason: String },
}

/// VoiceRSS text-to-speech client.
pub struct VoiceRssClient {
    api_key: String,
    language: String,
    format: String,
    max_text_len: usize,
    transport: Arc<dyn HttpTransport>,
}

impl VoiceRssClient {
    /// Client with the documented defaults: `en-us`, `16khz_16bit_mono`,
    /// 25 000 character ceiling.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: String::from("en-us"),
            format: String::from("16khz_16bit_mono"),
            max_text_len: 25_000,
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Synthesize `text` and return the raw audio bytes.
    pub fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceRssError> {
        if text.len() > self.max_text_len {
            return Err(VoiceRssError::TextTooLong {
                len: text.len(),
                max: self.max_text_len,
            });
        }

        let form = vec![
            (String::from("key"), self.api_key.clone()),
            (String::from("src"), text.to_owned()),
            (String::from("hl"), self.language.clone()),
            (String::from("f"), self.format.clone()),
        ];
        let request =
            HttpRequest::new(HttpMethod::Post, API_URL).with_body(RequestBody::Form(form));

        let response = self.transport.execute(request)?;
        if !response.is_ok() {
            return Err(VoiceRssError::UnexpectedStatus {
                status: response.status,
            });
        }

        if let Some(message) = match_inline_error(&response.body) {
            return Err(VoiceRssError::Api { message });
        }

        Ok(response.body)
    }

    /// Synthesize `text` and write the audio to `path`, appending a `.wav`
    /// extension when the path has none. Returns the final path.
    pub fn synthesize_to_file(
        &self,
        text: &str,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, VoiceRssError> {
        let audio = self.synthesize(text)?;

        let mut path = path.as_ref().to_path_buf();
        if path
            .extension()
            .map_or(true, |ext| !ext.eq_ignore_ascii_case("wav"))
        {
            path.set_extension("wav");
        }

        fs::write(&path, audio).map_err(|e| VoiceRssError::Io {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(path)
    }
}

/// Scan a 200 body for the API's published failure sentences.
///
/// Special case, kept on purpose: the remote reports errors as prose with no
/// status or code to key on, so the only available check is a substring
/// match against the documented strings.
fn match_inline_error(body: &[u8]) -> Option<&'static str> {
    let text = String::from_utf8_lossy(body);
    INLINE_ERRORS
        .iter()
        .find(|sentinel| text.contains(*sentinel))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::HttpResponse;
    use std::sync::Mutex;

    struct ScriptedTransport {
        script: Mutex<Vec<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().expect("requests poisoned").push(request);
            let mut script = self.script.lock().expect("script poisoned");
            assert!(!script.is_empty(), "transport script exhausted");
            Ok(script.remove(0))
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> VoiceRssClient {
        VoiceRssClient::new("key-1").with_transport(transport)
    }

    #[test]
    fn synthesize_posts_the_documented_form_fields() {
        let transport = ScriptedTransport::new(vec![HttpResponse::new(200, vec![1u8, 2, 3])]);
        let audio = client(transport.clone())
            .synthesize("hello")
            .expect("audio bytes");

        assert_eq!(audio, vec![1, 2, 3]);
        let requests = transport.requests.lock().expect("requests poisoned");
        let Some(RequestBody::Form(pairs)) = &requests[0].body else {
            panic!("synthesis must use a form body");
        };
        assert!(pairs.contains(&(String::from("src"), String::from("hello"))));
        assert!(pairs.contains(&(String::from("hl"), String::from("en-us"))));
    }

    #[test]
    fn oversized_text_is_rejected_before_any_request() {
        let transport = ScriptedTransport::new(vec![]);
        let error = client(transport.clone())
            .with_max_text_len(4)
            .synthesize("hello")
            .expect_err("five characters over a four limit");

        assert!(matches!(
            error,
            VoiceRssError::TextTooLong { len: 5, max: 4 }
        ));
        assert!(transport.requests.lock().expect("requests poisoned").is_empty());
    }

    #[test]
    fn inline_error_sentence_in_a_200_body_is_an_api_error() {
        let transport = ScriptedTransport::new(vec![HttpResponse::new(
            200,
            "ERROR: The API key is not available!",
        )]);

        let error = client(transport)
            .synthesize("hello")
            .expect_err("sentinel must be detected");

        assert!(
            matches!(error, VoiceRssError::Api { message } if message == "The API key is not available!")
        );
    }

    #[test]
    fn non_200_status_is_surfaced_as_such() {
        let transport = ScriptedTransport::new(vec![HttpResponse::new(503, "")]);

        let error = client(transport)
            .synthesize("hello")
            .expect_err("503 must fail");

        assert!(matches!(error, VoiceRssError::UnexpectedStatus { status: 503 }));
    }

    #[test]
    fn synthesize_to_file_appends_wav_and_writes_the_audio() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("greeting");

        let transport = ScriptedTransport::new(vec![HttpResponse::new(200, vec![7u8; 16])]);
        let written = client(transport)
            .synthesize_to_file("hello", &target)
            .expect("file written");

        assert_eq!(written.extension().and_then(|e| e.to_str()), Some("wav"));
        assert_eq!(fs::read(&written).expect("read back").len(), 16);
    }
}
