//! HD Naumen REST client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use super::{TicketKeys, TicketingError, TicketingSystem};
use crate::config::TicketingConfig;

/// HD Naumen REST client.
pub struct NaumenClient {
    client: Client,
    base_url: String,
    access_key: String,
}

/// `getData` response (only the fields we read).
#[derive(Debug, Deserialize)]
struct GetDataResponse {
    fields: GetDataFields,
}

#[derive(Debug, Deserialize)]
struct GetDataFields {
    message: GetDataMessage,
}

#[derive(Debug, Deserialize)]
struct GetDataMessage {
    header: GetDataHeader,
}

#[derive(Debug, Deserialize)]
struct GetDataHeader {
    #[serde(rename = "serviceCall")]
    service_call: ServiceCall,
}

#[derive(Debug, Deserialize)]
struct ServiceCall {
    #[serde(rename = "UUID", default)]
    uuid: String,
    #[serde(default)]
    title: String,
}

/// `get/<uuid>` response.
#[derive(Debug, Deserialize)]
struct TicketDetails {
    #[serde(rename = "sumDescription", default)]
    sum_description: String,
}

impl NaumenClient {
    /// Create a new client.
    pub fn new(config: &TicketingConfig) -> Result<Self, TicketingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| TicketingError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
        })
    }

    fn key(&self) -> String {
        urlencoding::encode(&self.access_key).into_owned()
    }

    /// `.../gateway/services/rest/<function>?accessKey=K&params=<params>`
    fn gateway_url(&self, function: &str, params: &str) -> String {
        format!(
            "{}/gateway/services/rest/{}?accessKey={}&params={}",
            self.base_url,
            function,
            self.key(),
            params
        )
    }

    fn map_send_error(e: reqwest::Error) -> TicketingError {
        if e.is_timeout() {
            TicketingError::Timeout
        } else {
            TicketingError::Transport(e.to_string())
        }
    }

    async fn get(&self, url: &str) -> Result<Response, TicketingError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(Self::map_send_error)
    }

    /// Fail unless the status is one of `accepted`; return the body otherwise.
    async fn expect_status(
        response: Response,
        operation: &'static str,
        accepted: &[u16],
    ) -> Result<String, TicketingError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TicketingError::Transport(e.to_string()))?;

        if !accepted.contains(&status) {
            return Err(TicketingError::Http {
                operation,
                status,
                body: body.chars().take(200).collect(),
            });
        }
        Ok(body)
    }

    fn parse<'de, T: Deserialize<'de>>(
        body: &'de str,
        operation: &'static str,
    ) -> Result<T, TicketingError> {
        serde_json::from_str(body).map_err(|e| TicketingError::Parse {
            operation,
            reason: e.to_string(),
        })
    }

    async fn upload(&self, ticket_id: &str, path: &Path) -> Result<(), TicketingError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TicketingError::Attachment {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.zip".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| TicketingError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let url = format!(
            "{}/sd/services/rest/add-file/{}?accessKey={}",
            self.base_url,
            urlencoding::encode(ticket_id),
            self.key()
        );
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Self::expect_status(response, "add-file", &[200, 201, 202]).await?;
        debug!(ticket = %ticket_id, file = %path.display(), "Attachment uploaded");
        Ok(())
    }
}

#[async_trait]
impl TicketingSystem for NaumenClient {
    async fn fetch_sum_description_and_keys(
        &self,
        task_id: &str,
    ) -> Result<TicketKeys, TicketingError> {
        let url = self.gateway_url(
            "getData",
            &format!("{},user", urlencoding::encode(task_id)),
        );
        let body = Self::expect_status(self.get(&url).await?, "getData", &[200]).await?;
        let data: GetDataResponse = Self::parse(&body, "getData")?;
        let service_call = data.fields.message.header.service_call;

        if service_call.uuid.is_empty() {
            return Err(TicketingError::EmptyField {
                operation: "getData",
                field: "serviceCall.UUID",
            });
        }

        let url = format!(
            "{}/sd/services/rest/get/{}?accessKey={}",
            self.base_url,
            urlencoding::encode(&service_call.uuid),
            self.key()
        );
        let body = Self::expect_status(self.get(&url).await?, "get", &[200]).await?;
        let details: TicketDetails = Self::parse(&body, "get")?;

        debug!(
            task = %task_id,
            ticket = %service_call.uuid,
            sub_request = %service_call.title,
            "Fetched ticket keys"
        );

        Ok(TicketKeys {
            ticket_id: service_call.uuid,
            sub_request_id: service_call.title,
            sum_description: details.sum_description,
        })
    }

    async fn claim_ticket(&self, ticket_id: &str) -> Result<(), TicketingError> {
        let url = self.gateway_url(
            "takeSCResponsibility",
            &format!("'{}',user", urlencoding::encode(ticket_id)),
        );
        Self::expect_status(self.get(&url).await?, "takeSCResponsibility", &[200, 202]).await?;
        info!(ticket = %ticket_id, "Ticket claimed");
        Ok(())
    }

    async fn attach_artifacts_and_accept(
        &self,
        ticket_id: &str,
        resolution_text: &str,
        artifacts: &[PathBuf],
    ) -> Result<(), TicketingError> {
        for path in artifacts {
            self.upload(ticket_id, path).await?;
        }

        let url = self.gateway_url(
            "setSCAcceptance",
            &format!(
                "'{}','{}',user",
                urlencoding::encode(ticket_id),
                urlencoding::encode(resolution_text)
            ),
        );
        let response = self.get(&url).await?;
        Self::expect_status(response, "setSCAcceptance", &[200, 201, 202, 204]).await?;
        info!(
            ticket = %ticket_id,
            attachments = artifacts.len(),
            "Ticket moved to awaiting acceptance"
        );
        Ok(())
    }
}
