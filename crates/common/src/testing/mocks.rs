//! Scripted mock implementations of the capability seams.

// Mutex poisoning is acceptable in test mocks - if a test panics, the whole
// test fails anyway.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use quillpad_domain::{QuillpadError, Result, ServerFault};

use crate::ports::{
    AuthorizationOutcome, AuthorizationUi, RpcConnector, RpcTransport, StoreEndpoint,
};

type ScriptMap = Mutex<HashMap<String, VecDeque<Result<Value>>>>;

/// A captured RPC invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Method name as passed to `call`.
    pub method: String,
    /// Params as passed to `call`.
    pub params: Value,
}

/// Blocking transport that replays scripted responses per method.
///
/// Each scripted response is consumed once, in order. Calling an unscripted
/// method fails with a server fault, which keeps tests honest about the
/// exact exchanges they expect.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: ScriptMap,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for `method`.
    pub fn script(&self, method: &str, response: Result<Value>) {
        self.scripts.lock().unwrap().entry(method.to_string()).or_default().push_back(response);
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RpcTransport for ScriptedTransport {
    fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall { method: method.to_string(), params: params.clone() });

        self.scripts.lock().unwrap().get_mut(method).and_then(VecDeque::pop_front).unwrap_or_else(
            || {
                Err(QuillpadError::Server(ServerFault::BadRequest(format!(
                    "unscripted method: {method}"
                ))))
            },
        )
    }
}

/// Connector that hands out pre-registered transports by endpoint URL.
///
/// Records every connect so tests can assert which store URL and token a
/// derived client was bound to.
#[derive(Default)]
pub struct ScriptedConnector {
    transports: Mutex<HashMap<String, Arc<dyn RpcTransport>>>,
    connects: Mutex<Vec<StoreEndpoint>>,
}

impl ScriptedConnector {
    /// Create an empty connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `transport` for connections to `url`.
    pub fn register(&self, url: &str, transport: Arc<dyn RpcTransport>) {
        self.transports.lock().unwrap().insert(url.to_string(), transport);
    }

    /// Every endpoint a connect was requested for, in order.
    #[must_use]
    pub fn connects(&self) -> Vec<StoreEndpoint> {
        self.connects.lock().unwrap().clone()
    }
}

impl RpcConnector for ScriptedConnector {
    fn connect(&self, endpoint: &StoreEndpoint) -> Result<Arc<dyn RpcTransport>> {
        self.connects.lock().unwrap().push(endpoint.clone());
        self.transports.lock().unwrap().get(&endpoint.url).cloned().ok_or_else(|| {
            QuillpadError::Transport(format!("no transport registered for {}", endpoint.url))
        })
    }
}

/// What the mock authorization surface should do when presented a URL.
#[derive(Debug, Clone)]
pub enum AuthorizationScript {
    /// Grant access and redirect back with this verifier.
    Authorize(String),
    /// Dismiss the page.
    Cancel,
    /// Fail the surface itself (browser could not open, etc).
    Fail(String),
}

/// Mock of the browser/redirect surface used during the OAuth handshake.
pub struct MockAuthorizationUi {
    script: Mutex<AuthorizationScript>,
    presented: Mutex<Vec<String>>,
}

impl MockAuthorizationUi {
    /// Surface that grants access with `verifier`.
    #[must_use]
    pub fn authorizing(verifier: &str) -> Self {
        Self {
            script: Mutex::new(AuthorizationScript::Authorize(verifier.to_string())),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Surface on which the user always cancels.
    #[must_use]
    pub fn cancelling() -> Self {
        Self {
            script: Mutex::new(AuthorizationScript::Cancel),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Surface that fails to present at all.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            script: Mutex::new(AuthorizationScript::Fail(message.to_string())),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// URLs presented so far.
    #[must_use]
    pub fn presented_urls(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationUi for MockAuthorizationUi {
    async fn present_authorization(&self, url: &str) -> Result<AuthorizationOutcome> {
        self.presented.lock().unwrap().push(url.to_string());
        match self.script.lock().unwrap().clone() {
            AuthorizationScript::Authorize(verifier) => {
                Ok(AuthorizationOutcome::Authorized { verifier })
            }
            AuthorizationScript::Cancel => Ok(AuthorizationOutcome::Cancelled),
            AuthorizationScript::Fail(message) => Err(QuillpadError::Transport(message)),
        }
    }
}
