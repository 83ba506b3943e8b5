//! Scripted transport for unit tests.

use crate::transport::{ApiRequest, ApiResponse, Connector, Transport};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Answers requests from per-path scripts. The last scripted answer for a
/// path repeats forever; an unscripted path answers 404.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Option<ApiResponse>>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, response: ApiResponse) {
        self.script(path, Some(response));
    }

    /// Scripts a transport failure (no HTTP response at all).
    pub fn fail(&self, path: &str) {
        self.script(path, None);
    }

    fn script(&self, path: &str, entry: Option<ApiResponse>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(entry);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Live clones of this transport, sessions included.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.requests)
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

pub fn transport_error() -> Error {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("an invalid url never builds");
    Error::Http(err)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        let mut scripts = self.scripts.lock().unwrap();
        let entry = match scripts.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().flatten(),
            Some(queue) => match queue.front() {
                Some(entry) => entry.clone(),
                None => Some(ApiResponse::new(404, "not found")),
            },
            None => Some(ApiResponse::new(404, "not found")),
        };

        entry.ok_or_else(transport_error)
    }
}

impl Connector for ScriptedTransport {
    fn connect(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(self.clone()))
    }
}
