//! The user-lifecycle scenario: create a user, think, update the user.

use async_trait::async_trait;
use reqload_adapters::{HttpClient, TransportError};
use reqload_domain::{
    CheckRecorder, Group, assert_response_body_post, assert_response_body_put,
    assert_response_code,
};
use reqload_types::{HttpMethod, Request, Response, UserPayload};
use std::time::Duration;

pub const POST_GROUP: &str = "postScenario";
pub const PUT_GROUP: &str = "putScenario";

pub const USER_NAME: &str = "Dummy";
pub const CREATE_JOB: &str = "leader";
pub const UPDATE_JOB: &str = "zion resident";

pub const CREATE_STATUS: u16 = 201;
pub const UPDATE_STATUS: u16 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("{phase} request failed: {source}")]
    Transport {
        phase: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("encode {phase} payload: {source}")]
    Payload {
        phase: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// One iteration of virtual-user work.
///
/// Failed checks are recorded and never surface as `Err`; an `Err` means the
/// iteration was aborted.
#[async_trait]
pub trait Scenario: Send + Sync {
    async fn run(
        &self,
        client: &dyn HttpClient,
        checks: &dyn CheckRecorder,
    ) -> Result<(), ScenarioError>;
}

#[derive(Debug, Clone)]
pub struct UserLifecycleScenario {
    base_url: String,
    think_time: Duration,
}

impl UserLifecycleScenario {
    pub fn new(base_url: impl Into<String>, think_time: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            think_time,
        }
    }

    pub fn create_url(&self) -> String {
        format!("{}/api/users", self.base_url)
    }

    pub fn update_url(&self) -> String {
        format!("{}/api/users/2", self.base_url)
    }

    async fn send(
        client: &dyn HttpClient,
        phase: &'static str,
        method: HttpMethod,
        url: String,
        job: &str,
    ) -> Result<Response, ScenarioError> {
        let payload = UserPayload {
            name: USER_NAME.to_string(),
            job: job.to_string(),
        };
        let request = Request::json(method, url, &payload)
            .map_err(|source| ScenarioError::Payload { phase, source })?;

        client
            .send(&request)
            .await
            .map_err(|source| ScenarioError::Transport { phase, source })
    }
}

#[async_trait]
impl Scenario for UserLifecycleScenario {
    async fn run(
        &self,
        client: &dyn HttpClient,
        checks: &dyn CheckRecorder,
    ) -> Result<(), ScenarioError> {
        {
            let group = Group::new(checks, POST_GROUP);
            let res = Self::send(client, "create", HttpMethod::Post, self.create_url(), CREATE_JOB)
                .await?;
            assert_response_code(&group, &res, CREATE_STATUS);
            assert_response_body_post(&group, &res, "name", USER_NAME);
            assert_response_body_post(&group, &res, "job", CREATE_JOB);
        }

        tokio::time::sleep(self.think_time).await;

        let group = Group::new(checks, PUT_GROUP);
        let res = Self::send(client, "update", HttpMethod::Put, self.update_url(), UPDATE_JOB)
            .await?;
        assert_response_code(&group, &res, UPDATE_STATUS);
        assert_response_body_put(&group, &res, "name", USER_NAME);
        assert_response_body_put(&group, &res, "job", UPDATE_JOB);

        Ok(())
    }
}
