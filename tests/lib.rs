//! Shared support for the herald workspace behavior tests.

use std::sync::{Arc, Mutex};

use herald_core::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Transport double that plays back a fixed script of outcomes and records
/// every request it receives.
pub struct ScriptedTransport {
    script: Mutex<Vec<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Script of plain responses, no transport failures.
    pub fn replying(responses: Vec<HttpResponse>) -> Arc<Self> {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request store poisoned").len()
    }

    pub fn recorded(&self) -> Vec<HttpRequest> {
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
