use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

/// Fixed address of the inference backend.
pub const ENDPOINT: &str = "http://127.0.0.1:5000/ask-ai";

/// Body of a single submit. Absent fields go over the wire as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    pub prompt: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
struct AskResponse {
    response: Option<String>,
    error: Option<String>,
}

/// What the backend said, once a JSON body came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Rejected(String),
}

#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    endpoint: String,
}

impl InferenceClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ask(&self, request: &AskRequest) -> Result<Reply> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        // The backend reports validation failures as 4xx with an `error` body,
        // so the status alone decides nothing here.
        let status = response.status();
        let body: AskResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("unreadable response body (status {}): {}", status, e))?;

        classify(body)
    }
}

fn classify(body: AskResponse) -> Result<Reply> {
    match body {
        AskResponse { error: Some(error), .. } if !error.is_empty() => Ok(Reply::Rejected(error)),
        AskResponse { response: Some(text), .. } => Ok(Reply::Answer(text)),
        _ => Err(anyhow!("response carried neither `response` nor `error`")),
    }
}
