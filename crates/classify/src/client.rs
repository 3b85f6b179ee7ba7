use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classification service returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// The external classification service: canonical descriptions in, a
/// canonical→category map out. No latency guarantee, so the caller owns
/// the timeout.
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        descriptions: &[String],
    ) -> impl Future<Output = Result<HashMap<String, String>, ClassifyError>> + Send;
}

/// Sharing a classifier between the pipeline and its owner (for call
/// inspection, or reuse across imports) only needs an `Arc`.
impl<C: Classifier> Classifier for std::sync::Arc<C> {
    fn classify(
        &self,
        descriptions: &[String],
    ) -> impl Future<Output = Result<HashMap<String, String>, ClassifyError>> + Send {
        self.as_ref().classify(descriptions)
    }
}

/// HTTP client for the classification service.
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self, ClassifyError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            endpoint: endpoint.into(),
            token,
        })
    }
}

impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        descriptions: &[String],
    ) -> Result<HashMap<String, String>, ClassifyError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "descriptions": descriptions }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json().await?)
    }
}

/// Scripted classifier for tests: a fixed answer, optional latency,
/// optional failure, and a call counter for the grouping invariant.
#[derive(Default)]
pub struct MockClassifier {
    answers: HashMap<String, String>,
    delay: Option<Duration>,
    fail: bool,
    calls: Mutex<Vec<usize>>,
}

impl MockClassifier {
    pub fn new(answers: HashMap<String, String>) -> Self {
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock").len()
    }

    /// Input sizes per call, in call order.
    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().expect("mock lock").clone()
    }
}

impl Classifier for MockClassifier {
    async fn classify(
        &self,
        descriptions: &[String],
    ) -> Result<HashMap<String, String>, ClassifyError> {
        self.calls.lock().expect("mock lock").push(descriptions.len());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ClassifyError::Api {
                status: 503,
                message: "injected failure".to_string(),
            });
        }
        Ok(descriptions
            .iter()
            .filter_map(|d| self.answers.get(d).map(|c| (d.clone(), c.clone())))
            .collect())
    }
}
