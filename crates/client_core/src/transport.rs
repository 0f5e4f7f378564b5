//! Collaborator contract with the interview server and its HTTP implementation.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{InterviewConfig, SessionId},
    error::ApiError,
    protocol::{
        CodeExecuteRequest, CodeExecuteResponse, EvaluateRequest, EvaluateResponse,
        MessageRequest, MessageResponse, SessionStateResponse, StartSessionRequest,
        StartSessionResponse,
    },
};
use url::Url;

use crate::error::{ApiCallError, EndpointError, Operation};

const START_SESSION_PATH: &str = "api/session/start";
const SESSION_PATH: &str = "api/session/";
const MESSAGE_PATH: &str = "api/interview/message";
const EVALUATE_PATH: &str = "api/interview/evaluate";
const EXECUTE_PATH: &str = "api/code/execute";

#[async_trait]
pub trait InterviewApi: Send + Sync {
    async fn start_session(
        &self,
        config: &InterviewConfig,
    ) -> Result<StartSessionResponse, ApiCallError>;
    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionStateResponse, ApiCallError>;
    async fn post_message(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<MessageResponse, ApiCallError>;
    async fn execute_code(
        &self,
        session_id: &SessionId,
        code: &str,
    ) -> Result<CodeExecuteResponse, ApiCallError>;
    async fn evaluate(&self, session_id: &SessionId) -> Result<EvaluateResponse, ApiCallError>;
}

pub struct HttpInterviewApi {
    http: Client,
    base: Url,
}

impl HttpInterviewApi {
    pub fn new(server_url: &str) -> Result<Self, EndpointError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, EndpointError> {
        let mut base = Url::parse(server_url.trim()).map_err(|source| EndpointError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(EndpointError::NotABase(server_url.to_string()));
        }
        // Relative joins replace the last path segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}{path}", self.base.path());
        url.set_path(&joined);
        url
    }

    fn session_endpoint(&self, session_id: &SessionId) -> Url {
        let mut url = self.endpoint(SESSION_PATH);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(session_id.as_str());
        }
        url
    }

    async fn post_json<Req, Resp>(
        &self,
        operation: Operation,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ApiCallError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|source| ApiCallError::Transport { operation, source })?;
        decode_response(operation, response).await
    }
}

async fn decode_response<Resp>(operation: Operation, response: Response) -> Result<Resp, ApiCallError>
where
    Resp: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        // An unreadable error body degrades to the generic message rather than a transport error.
        let body = response.bytes().await.unwrap_or_default();
        let parsed = ApiError::from_body(&body);
        return Err(ApiCallError::rejected(
            operation,
            status.as_u16(),
            parsed.as_ref().and_then(ApiError::detail_text),
            parsed.as_ref().and_then(|err| err.code),
        ));
    }

    response
        .json::<Resp>()
        .await
        .map_err(|source| ApiCallError::Transport { operation, source })
}

#[async_trait]
impl InterviewApi for HttpInterviewApi {
    async fn start_session(
        &self,
        config: &InterviewConfig,
    ) -> Result<StartSessionResponse, ApiCallError> {
        self.post_json(
            Operation::StartSession,
            START_SESSION_PATH,
            &StartSessionRequest::from(config),
        )
        .await
    }

    async fn fetch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionStateResponse, ApiCallError> {
        let operation = Operation::FetchSession;
        let response = self
            .http
            .get(self.session_endpoint(session_id))
            .send()
            .await
            .map_err(|source| ApiCallError::Transport { operation, source })?;
        decode_response(operation, response).await
    }

    async fn post_message(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<MessageResponse, ApiCallError> {
        self.post_json(
            Operation::PostMessage,
            MESSAGE_PATH,
            &MessageRequest {
                session_id: session_id.clone(),
                message: message.to_string(),
            },
        )
        .await
    }

    async fn execute_code(
        &self,
        session_id: &SessionId,
        code: &str,
    ) -> Result<CodeExecuteResponse, ApiCallError> {
        self.post_json(
            Operation::ExecuteCode,
            EXECUTE_PATH,
            &CodeExecuteRequest {
                session_id: session_id.clone(),
                code: code.to_string(),
            },
        )
        .await
    }

    async fn evaluate(&self, session_id: &SessionId) -> Result<EvaluateResponse, ApiCallError> {
        self.post_json(
            Operation::Evaluate,
            EVALUATE_PATH,
            &EvaluateRequest {
                session_id: session_id.clone(),
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
