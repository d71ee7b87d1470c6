//! Scripted collaborators for exercising the stages without a network

use std::sync::Mutex;

use async_trait::async_trait;

use crate::analysis::{AnalysisRequest, Analyst};
use crate::decision::{DecisionOracle, DecisionRequest};
use crate::design::{DesignGenerator, DesignRequest};
use crate::domain::Decision;
use crate::error::CollaboratorError;

/// Designer that replays a queue of replies; the last reply repeats
pub struct ScriptedDesigner {
    replies: Mutex<Vec<Result<String, CollaboratorError>>>,
    requests: Mutex<Vec<DesignRequest>>,
}

impl ScriptedDesigner {
    pub fn new(replies: Vec<Result<String, CollaboratorError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn err(error: CollaboratorError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<DesignRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

fn next_reply<T: Clone>(queue: &Mutex<Vec<Result<T, CollaboratorError>>>) -> Result<T, CollaboratorError> {
    let mut queue = queue
        .lock()
        .map_err(|_| CollaboratorError::Service("reply queue poisoned".to_string()))?;
    match queue.len() {
        0 => Err(CollaboratorError::Configuration("no scripted reply".to_string())),
        1 => queue[0].clone(),
        _ => queue.remove(0),
    }
}

#[async_trait]
impl DesignGenerator for ScriptedDesigner {
    async fn generate(&self, request: &DesignRequest) -> Result<String, CollaboratorError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        next_reply(&self.replies)
    }
}

/// Analyst that replays a queue of replies; the last reply repeats
pub struct ScriptedAnalyst {
    replies: Mutex<Vec<Result<String, CollaboratorError>>>,
}

impl ScriptedAnalyst {
    pub fn new(replies: Vec<Result<String, CollaboratorError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
        }
    }
}

#[async_trait]
impl Analyst for ScriptedAnalyst {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<String, CollaboratorError> {
        next_reply(&self.replies)
    }
}

/// Oracle that replays a queue of decisions; the last one repeats
pub struct ScriptedOracle {
    replies: Mutex<Vec<Result<Decision, CollaboratorError>>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Result<Decision, CollaboratorError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
        }
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, CollaboratorError> {
        next_reply(&self.replies)
    }
}
