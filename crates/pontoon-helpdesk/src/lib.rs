// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the helpdesk boundary.
//!
//! Only the calls the core issues are modeled: event ingestion into an
//! inbox, private operator notifications into a conversation, and a single
//! message lookup used to resolve reply threading. Everything else about
//! the helpdesk's resource model stays on the helpdesk's side.
//!
//! Non-2xx responses map to [`PontoonError::Helpdesk`], which the relay
//! queue treats as retryable; nothing here ever panics the process.

use pontoon_config::model::HelpdeskConfig;
use pontoon_core::{HelpdeskMessageId, PontoonError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ACCESS_TOKEN_HEADER: &str = "api_access_token";

/// An inbound event being relayed into a helpdesk inbox.
#[derive(Debug, Clone, Serialize)]
pub struct RelayMessageRequest {
    pub content: String,
    /// "incoming" for partner messages, "outgoing" for self-sent ones.
    pub message_type: String,
    /// Foreign message id; echoed back by helpdesk webhooks so the bridge
    /// can recognize its own traffic.
    pub source_id: String,
    /// Network address of the chat partner the conversation belongs to.
    pub sender_identifier: String,
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "ContentAttributes::is_empty")]
    pub content_attributes: ContentAttributes,
}

/// Threading attributes attached to a relayed message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<i64>,
}

impl ContentAttributes {
    fn is_empty(&self) -> bool {
        self.in_reply_to.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: i64,
}

/// Details of one helpdesk message, fetched to stitch quotes together.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDetails {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub sender: Option<MessageSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSender {
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Client for the helpdesk REST boundary.
#[derive(Clone)]
pub struct HelpdeskClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HelpdeskClient {
    /// Build a client from configuration. Requires the access token.
    pub fn new(config: &HelpdeskConfig) -> Result<Self, PontoonError> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| PontoonError::Config("helpdesk.access_token is required".into()))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.api_timeout_ms))
            .build()
            .map_err(|e| PontoonError::Helpdesk {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn url(&self, account_id: i64, path: &str) -> String {
        format!("{}/api/v1/accounts/{account_id}{path}", self.base_url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PontoonError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body.chars().take(200).collect::<String>(),
              "helpdesk call failed");
        Err(PontoonError::helpdesk_status(
            format!("helpdesk returned {status}"),
            status.as_u16(),
        ))
    }

    /// Relay a bridged event into an inbox. Returns the helpdesk's id for
    /// the created message, which feeds the correlation store.
    pub async fn relay_event(
        &self,
        account_id: i64,
        inbox_id: i64,
        request: &RelayMessageRequest,
    ) -> Result<HelpdeskMessageId, PontoonError> {
        let url = self.url(account_id, &format!("/inboxes/{inbox_id}/messages"));
        debug!(%url, source_id = %request.source_id, "relaying event to helpdesk");

        let response = self
            .http
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| PontoonError::Helpdesk {
                message: format!("relay request failed: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        let created: CreatedMessage = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PontoonError::Helpdesk {
                message: format!("relay response not decodable: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(HelpdeskMessageId(created.id))
    }

    /// Post a private note to the command-origin conversation (status
    /// updates, pairing challenges, access-denied answers).
    pub async fn notify(
        &self,
        account_id: i64,
        conversation_id: i64,
        content: &str,
    ) -> Result<(), PontoonError> {
        let url = self.url(
            account_id,
            &format!("/conversations/{conversation_id}/messages"),
        );

        let response = self
            .http
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&serde_json::json!({
                "content": content,
                "message_type": "outgoing",
                "private": true,
            }))
            .send()
            .await
            .map_err(|e| PontoonError::Helpdesk {
                message: format!("notify request failed: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// Fetch one message, used to resolve the quoted message's network id
    /// when an agent replies in a thread. `None` when the helpdesk does
    /// not know the message (graceful degradation: send without quote).
    pub async fn get_message(
        &self,
        account_id: i64,
        message_id: i64,
    ) -> Result<Option<MessageDetails>, PontoonError> {
        let url = self.url(account_id, &format!("/messages/{message_id}"));

        let response = self
            .http
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .send()
            .await
            .map_err(|e| PontoonError::Helpdesk {
                message: format!("message lookup failed: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let details: MessageDetails = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PontoonError::Helpdesk {
                message: format!("message lookup response not decodable: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Some(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> HelpdeskConfig {
        HelpdeskConfig {
            base_url: base_url.to_string(),
            access_token: Some("test-token".to_string()),
            api_timeout_ms: 2_000,
            default_account_id: 1,
        }
    }

    fn relay_request() -> RelayMessageRequest {
        RelayMessageRequest {
            content: "hello from the network".into(),
            message_type: "incoming".into(),
            source_id: "3EB0ABC".into(),
            sender_identifier: "5585999999999@network".into(),
            sender_name: Some("Alice".into()),
            attachment_url: None,
            content_attributes: ContentAttributes { in_reply_to: None },
        }
    }

    #[test]
    fn new_requires_access_token() {
        let mut cfg = config("http://localhost:3000");
        cfg.access_token = None;
        assert!(HelpdeskClient::new(&cfg).is_err());
    }

    #[tokio::test]
    async fn relay_event_returns_created_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/1/inboxes/7/messages"))
            .and(header("api_access_token", "test-token"))
            .and(body_partial_json(serde_json::json!({
                "source_id": "3EB0ABC",
                "message_type": "incoming",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 991,
            })))
            .mount(&server)
            .await;

        let client = HelpdeskClient::new(&config(&server.uri())).unwrap();
        let id = client.relay_event(1, 7, &relay_request()).await.unwrap();
        assert_eq!(id, HelpdeskMessageId(991));
    }

    #[tokio::test]
    async fn relay_event_maps_server_error_to_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = HelpdeskClient::new(&config(&server.uri())).unwrap();
        let err = client.relay_event(1, 7, &relay_request()).await.unwrap_err();
        match err {
            PontoonError::Helpdesk { status, .. } => assert_eq!(status, Some(502)),
            other => panic!("expected helpdesk error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_hint_is_serialized_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "content_attributes": { "in_reply_to": 500 },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 992,
            })))
            .mount(&server)
            .await;

        let client = HelpdeskClient::new(&config(&server.uri())).unwrap();
        let mut request = relay_request();
        request.content_attributes.in_reply_to = Some(500);
        let id = client.relay_event(1, 7, &request).await.unwrap();
        assert_eq!(id, HelpdeskMessageId(992));
    }

    #[tokio::test]
    async fn notify_posts_private_outgoing_note() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/1/conversations/42/messages"))
            .and(body_partial_json(serde_json::json!({
                "private": true,
                "message_type": "outgoing",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1,
            })))
            .mount(&server)
            .await;

        let client = HelpdeskClient::new(&config(&server.uri())).unwrap();
        client.notify(1, 42, "session connected").await.unwrap();
    }

    #[tokio::test]
    async fn get_message_returns_none_for_unknown_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/messages/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HelpdeskClient::new(&config(&server.uri())).unwrap();
        assert!(client.get_message(1, 404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_message_decodes_source_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/messages/500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 500,
                "content": "quoted text",
                "source_id": "3EB0QUOTED",
                "message_type": "incoming",
                "sender": { "phone_number": "+5585999999999" },
            })))
            .mount(&server)
            .await;

        let client = HelpdeskClient::new(&config(&server.uri())).unwrap();
        let details = client.get_message(1, 500).await.unwrap().unwrap();
        assert_eq!(details.source_id.as_deref(), Some("3EB0QUOTED"));
        assert_eq!(
            details.sender.unwrap().phone_number.as_deref(),
            Some("+5585999999999")
        );
    }
}
