use super::{VisionRequest, VisionService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted reply for [`MockVisionClient`].
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    RateLimited,
    Rejected,
    Failure,
}

#[derive(Clone)]
pub struct MockVisionClient {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<VisionRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockVisionClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(MockReply::Text(reply.into()))
    }

    pub fn with_rate_limit(self) -> Self {
        self.push(MockReply::RateLimited)
    }

    pub fn with_rejection(self) -> Self {
        self.push(MockReply::Rejected)
    }

    pub fn with_failure(self) -> Self {
        self.push(MockReply::Failure)
    }

    fn push(self, reply: MockReply) -> Self {
        self.replies.lock().unwrap().push(reply);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<VisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockVisionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionService for MockVisionClient {
    async fn describe(&self, request: &VisionRequest) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.requests.lock().unwrap().push(request.clone());

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            // Default mock response
            return Ok(serde_json::json!({
                "captions": [{
                    "text": format!("Mock caption for {} image(s)", request.images.len()),
                    "category": "General",
                    "hashtags": ["#mock"],
                    "emojis": ["📸"]
                }]
            })
            .to_string());
        }

        match &replies[(count - 1) % replies.len()] {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::RateLimited => Err(Error::RateLimited("mock rate limit".to_string())),
            MockReply::Rejected => Err(Error::UpstreamRejected("mock rejection".to_string())),
            MockReply::Failure => Err(Error::AiProvider("mock failure".to_string())),
        }
    }
}
