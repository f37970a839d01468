//! SCM sessions
//!
//! A session moves through `Closed -> Open -> Closed`. [`Connector::open`]
//! performs the first transition, [`ScmSession::close`] the second. Once
//! closed, a session rejects every further command with
//! [`GatewayError::SessionClosed`]; closing it again is a no-op.

use async_trait::async_trait;
use cairn_core::domain::checkpoint::CheckpointResult;
use cairn_core::domain::project::{ProjectHandle, ProjectKind};
use cairn_core::settings::ConnectionSettings;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::{CommandError, GatewayError, Result};
use crate::response::Response;

/// Description attached to every checkpoint the gateway creates
pub const CHECKPOINT_DESCRIPTION: &str = "Checkpoint created by cairn";

/// An open session against the SCM server
#[async_trait]
pub trait ScmSession: Send + Sync {
    /// Looks up a project configuration by name
    ///
    /// # Errors
    /// [`GatewayError::NotFound`] when the server does not know the name.
    async fn resolve_project(&self, configuration_name: &str) -> Result<ProjectHandle>;

    /// Checkpoints `project` with `label` and returns the new revision
    async fn checkpoint(&self, project: &ProjectHandle, label: &str) -> Result<CheckpointResult>;

    /// Releases the session; idempotent
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// # Errors
    /// [`GatewayError::Connection`] when the server cannot be reached or
    /// refuses the credentials.
    async fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn ScmSession>>;
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    host: &'a str,
    port: u16,
    user: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ConnectResponse {
    session_id: String,
}

/// Error body the server sends with non-2xx answers
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    exit_code: Option<i32>,
}

/// Opens [`ApiSession`]s over HTTP
#[derive(Debug, Clone, Default)]
pub struct ApiConnector {
    client: Client,
}

impl ApiConnector {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Uses a preconfigured HTTP client (timeouts, proxies, TLS roots)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for ApiConnector {
    async fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn ScmSession>> {
        let (api_host, api_port) = settings.api_endpoint();
        let base_url = format!("{}://{}:{}", settings.scheme(), api_host, api_port);
        let session = ApiSession::connect(self.client.clone(), base_url, settings).await?;
        Ok(Box::new(session))
    }
}

/// Session talking JSON over HTTP to an integration point
#[derive(Debug)]
pub struct ApiSession {
    client: Client,
    base_url: String,
    session_id: String,
    open: bool,
}

impl ApiSession {
    /// Connects to the server behind `base_url`
    pub async fn connect(
        client: Client,
        base_url: impl Into<String>,
        settings: &ConnectionSettings,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let url = format!("{}/api/v1/sessions", base_url);
        debug!(
            url = %url,
            user = %settings.user_name,
            host = %settings.host,
            port = settings.port,
            "Opening SCM session"
        );

        let request = ConnectRequest {
            host: &settings.host,
            port: settings.port,
            user: &settings.user_name,
            password: settings.password.reveal(),
        };
        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::connection(format!("{} is unreachable: {}", base_url, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::connection(format!(
                "{} rejected the credentials of user '{}' (status {})",
                base_url,
                settings.user_name,
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let detail = error_message(response).await;
            return Err(GatewayError::connection(format!(
                "{} answered with status {}: {}",
                base_url,
                status.as_u16(),
                detail
            )));
        }

        let body: ConnectResponse = response.json().await.map_err(|e| {
            GatewayError::connection(format!("invalid session response from {}: {}", base_url, e))
        })?;

        info!(session_id = %body.session_id, base_url = %base_url, "SCM session established");
        Ok(Self {
            client,
            base_url,
            session_id: body.session_id,
            open: true,
        })
    }

    /// Runs a command and returns the server's response
    ///
    /// The response is returned as-is; callers decide whether a non-zero
    /// exit code is fatal. Any non-2xx answer is a [`CommandError`].
    pub async fn execute(&self, command: &Command) -> Result<Response> {
        let text = command.text();
        let response = self.send(command, &text).await?;
        decode(response, text).await
    }

    async fn send(&self, command: &Command, text: &str) -> Result<reqwest::Response> {
        if !self.open {
            return Err(GatewayError::SessionClosed);
        }

        let url = format!("{}/api/v1/sessions/{}/commands", self.base_url, self.session_id);
        debug!(command = %text, "Executing SCM command");

        let response = self
            .client
            .post(&url)
            .json(command)
            .send()
            .await
            .map_err(|e| CommandError::new(format!("request failed: {}", e), -1, text))?;
        Ok(response)
    }
}

async fn decode(response: reqwest::Response, text: String) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        let (message, exit_code) = match response.json::<ErrorBody>().await {
            Ok(body) => (body.message, body.exit_code.unwrap_or(-1)),
            Err(_) => (format!("server answered with status {}", status.as_u16()), -1),
        };
        return Err(CommandError::new(message, exit_code, text).into());
    }

    response
        .json::<Response>()
        .await
        .map_err(|e| CommandError::new(format!("unreadable response: {}", e), -1, text).into())
}

#[async_trait]
impl ScmSession for ApiSession {
    async fn resolve_project(&self, configuration_name: &str) -> Result<ProjectHandle> {
        let command = Command::project_info(configuration_name);
        let text = command.text();

        let response = self.send(&command, &text).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(configuration_name.to_string()));
        }
        let response = decode(response, text.clone()).await?;

        if let Err(err) = response.ensure_success(&text) {
            if err.message.to_ascii_lowercase().contains("does not exist") {
                return Err(GatewayError::NotFound(configuration_name.to_string()));
            }
            return Err(err.into());
        }

        let item = response
            .work_items
            .first()
            .ok_or_else(|| GatewayError::NotFound(configuration_name.to_string()))?;

        let configuration_path = item
            .field("fullConfigSyntax")
            .and_then(|field| field.as_str())
            .filter(|path| !path.is_empty())
            .unwrap_or(item.id.as_str())
            .to_string();

        let is_build = item.field("isBuild").and_then(|f| f.as_bool()) == Some(true);
        let kind = match item.field("projectType").and_then(|f| f.as_str()) {
            _ if is_build => ProjectKind::Build,
            Some(project_type) => ProjectKind::from_project_type(project_type),
            None => ProjectKind::Normal,
        };

        debug!(
            configuration = configuration_name,
            path = %configuration_path,
            kind = ?kind,
            "Resolved project configuration"
        );
        Ok(ProjectHandle::new(configuration_name, configuration_path, kind))
    }

    async fn checkpoint(&self, project: &ProjectHandle, label: &str) -> Result<CheckpointResult> {
        let command = Command::checkpoint(&project.configuration_path, label, CHECKPOINT_DESCRIPTION);
        let text = command.text();

        let response = self.execute(&command).await?;
        response.ensure_success(&text)?;

        let revision = response.result_item_id(&project.configuration_path, "resultant", &text)?;
        Ok(CheckpointResult {
            exit_code: response.exit_code,
            command_text: text,
            resultant_revision_id: revision,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let url = format!("{}/api/v1/sessions/{}", self.base_url, self.session_id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| GatewayError::connection(format!("failed to terminate session: {}", e)))?;

        if !response.status().is_success() {
            warn!(
                session_id = %self.session_id,
                status = response.status().as_u16(),
                "Server did not acknowledge session termination"
            );
        } else {
            debug!(session_id = %self.session_id, "SCM session terminated");
        }
        Ok(())
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text),
        Err(_) => format!("status {}", status.as_u16()),
    }
}
