//! Scripted model for tests and dry runs

use crate::error::ModelError;
use crate::llm::{ModelClient, ModelRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A `ModelClient` that replays queued replies in order.
///
/// Every request is recorded so tests can inspect the prompts that were sent.
/// When the queue runs dry, calls fail with [`ModelError::EmptyResponse`].
#[derive(Default)]
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModelClient {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Script that answers with `replies` in order
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    /// Queue a text reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Ok(reply.into()));
    }

    /// Queue a failure
    pub fn push_error(&self, error: ModelError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        self.requests.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(ModelError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let model = ScriptedModelClient::with_replies(["one", "two"]);
        assert_eq!(model.complete(ModelRequest::text("a")).await.unwrap(), "one");
        assert_eq!(model.complete(ModelRequest::text("b")).await.unwrap(), "two");
        assert!(matches!(
            model.complete(ModelRequest::text("c")).await,
            Err(ModelError::EmptyResponse)
        ));
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.requests()[1].prompt, "b");
    }

    #[test]
    fn test_queued_error_is_returned() {
        tokio_test::block_on(async {
            let model = ScriptedModelClient::new();
            model.push_error(ModelError::Unavailable("offline".to_string()));
            model.push_reply("after");

            assert!(matches!(
                model.complete(ModelRequest::text("a")).await,
                Err(ModelError::Unavailable(_))
            ));
            assert_eq!(model.complete(ModelRequest::text("b")).await.unwrap(), "after");
        });
    }
}
