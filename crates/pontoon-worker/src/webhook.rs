// SPDX-FileCopyrightText: 2026 Pontoon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpdesk webhook ingestion.
//!
//! Every worker exposes the same `/webhook` route; the helpdesk may hit
//! any of them. Management commands and sends are forwarded to the primary,
//! which knows (or decides) which worker owns the target session.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use pontoon_config::model::WebhookConfig;
use pontoon_core::traits::network::DIRECT_ADDRESS_SUFFIX;
use pontoon_core::{HelpdeskMessageId, MediaKind, QuoteRef, SessionId, SessionMetadata};
use pontoon_ipc::{ControlMessage, OutboundAttachment, OutboundInstruction};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::Worker;

/// Helpdesk webhook payload, parsed permissively: the helpdesk sends far
/// more fields than the bridge reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub event: String,
    pub id: Option<i64>,
    pub content: Option<String>,
    pub private: bool,
    pub source_id: Option<String>,
    pub sender: Option<WebhookSender>,
    pub inbox: Option<WebhookInbox>,
    pub account: Option<WebhookAccount>,
    pub conversation: Option<WebhookConversation>,
    pub contact: Option<WebhookContact>,
    pub attachments: Vec<WebhookAttachment>,
    pub content_attributes: Option<WebhookContentAttributes>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookSender {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookInbox {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookAccount {
    pub id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookConversation {
    pub id: Option<i64>,
    pub meta: Option<WebhookConversationMeta>,
    pub contact_inbox: Option<WebhookContactInbox>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookConversationMeta {
    pub sender: Option<WebhookMetaSender>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookMetaSender {
    pub identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookContactInbox {
    pub source_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookContact {
    pub identifier: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookAttachment {
    pub data_url: Option<String>,
    pub file_type: Option<String>,
    pub name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookContentAttributes {
    pub in_reply_to: Option<i64>,
}

type WebhookResponse = (StatusCode, Json<serde_json::Value>);

fn ok(message: &str) -> WebhookResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": message })),
    )
}

fn bad_request(error: &str) -> WebhookResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": error })),
    )
}

fn accepted(message: &str) -> WebhookResponse {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "message": message })),
    )
}

/// Route one helpdesk webhook event.
pub(crate) async fn handle_webhook(
    State(worker): State<Arc<Worker>>,
    Json(payload): Json<WebhookPayload>,
) -> WebhookResponse {
    debug!(event = %payload.event, message_id = ?payload.id, "webhook received");

    if payload.event != "message_created" {
        return ok("event not processed");
    }
    if payload.sender.as_ref().and_then(|s| s.kind.as_deref()) != Some("user") {
        return ok("not an agent message");
    }
    if payload.private {
        return ok("private note ignored");
    }

    let content = payload.content.clone().unwrap_or_default();
    let keyword = content
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();

    if keyword == worker.config.webhook.command_keyword.to_lowercase() {
        return handle_management_command(&worker, &payload, &content).await;
    }

    if payload.source_id.is_some() {
        // Messages the bridge itself relayed carry a source id; sending
        // them back out would loop forever.
        debug!(source_id = ?payload.source_id, "bridge echo ignored");
        return ok("bridge echo ignored");
    }

    handle_agent_message(&worker, payload).await
}

/// Whether the caller may run protected commands.
///
/// With both lists empty, commands are unprotected (and loudly logged so).
fn is_authorized(
    config: &WebhookConfig,
    agent_name: Option<&str>,
    contact_phone: Option<&str>,
) -> bool {
    if config.authorized_agent_names.is_empty() && config.authorized_phone_numbers.is_empty() {
        warn!("no webhook authorization lists configured, commands are unprotected");
        return true;
    }
    let name_ok = agent_name.is_some_and(|name| {
        config
            .authorized_agent_names
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(name.trim()))
    });
    let phone_ok = contact_phone.is_some_and(|phone| {
        config
            .authorized_phone_numbers
            .iter()
            .any(|allowed| allowed.trim() == phone.trim())
    });
    name_ok || phone_ok
}

async fn handle_management_command(
    worker: &Arc<Worker>,
    payload: &WebhookPayload,
    content: &str,
) -> WebhookResponse {
    let agent_name = payload.sender.as_ref().and_then(|s| s.name.as_deref());
    let contact_phone = payload.contact.as_ref().and_then(|c| c.phone_number.as_deref());
    let account_id = payload.account.as_ref().and_then(|a| a.id);
    let conversation_id = payload.conversation.as_ref().and_then(|c| c.id);

    if !is_authorized(&worker.config.webhook, agent_name, contact_phone) {
        warn!(
            agent = ?agent_name,
            phone = ?contact_phone,
            "unauthorized management command rejected"
        );
        if let (Some(account_id), Some(conversation_id)) = (account_id, conversation_id) {
            let text = format!(
                "Access denied: {} is not allowed to run the \"{}\" command.",
                agent_name.unwrap_or("this user"),
                worker.config.webhook.command_keyword
            );
            if let Err(e) = worker.helpdesk.notify(account_id, conversation_id, &text).await {
                warn!(error = %e, "access-denied notification failed");
            }
        }
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "not authorized" })),
        );
    }

    let (Some(inbox_id), Some(conversation_id), Some(account_id)) = (
        payload.inbox.as_ref().and_then(|i| i.id),
        conversation_id,
        account_id,
    ) else {
        warn!("management command payload incomplete");
        return bad_request("management command payload incomplete");
    };

    let parts: Vec<&str> = content.split_whitespace().collect();
    let relay_target_id = parts
        .get(1)
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(inbox_id);
    let relay_account_id = parts
        .get(2)
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(account_id);

    let session_id = SessionId(inbox_id.to_string());
    let metadata = SessionMetadata {
        session_id: session_id.clone(),
        display_name: payload
            .inbox
            .as_ref()
            .and_then(|i| i.name.clone())
            .unwrap_or_else(|| format!("Session {inbox_id}")),
        relay_target_id,
        relay_account_id,
        command_origin_conversation_id: Some(conversation_id),
        command_origin_account_id: Some(account_id),
        connected_identity: None,
    };

    info!(
        session_id = %session_id,
        relay_target_id,
        relay_account_id,
        triggered_by = ?agent_name,
        "management command accepted, forwarding to primary"
    );
    worker
        .send_to_primary(ControlMessage::RequestAssign {
            session_id,
            metadata,
            requesting_worker: worker.id,
        })
        .await;

    accepted("management command forwarded")
}

fn resolve_recipient(payload: &WebhookPayload) -> Option<String> {
    if let Some(identifier) = payload
        .conversation
        .as_ref()
        .and_then(|c| c.meta.as_ref())
        .and_then(|m| m.sender.as_ref())
        .and_then(|s| s.identifier.clone())
    {
        return Some(identifier);
    }
    if let Some(source_id) = payload
        .conversation
        .as_ref()
        .and_then(|c| c.contact_inbox.as_ref())
        .and_then(|ci| ci.source_id.clone())
    {
        return Some(source_id);
    }
    if let Some(identifier) = payload.contact.as_ref().and_then(|c| c.identifier.clone()) {
        return Some(identifier);
    }
    payload
        .contact
        .as_ref()
        .and_then(|c| c.phone_number.as_ref())
        .map(|phone| {
            format!(
                "{}{DIRECT_ADDRESS_SUFFIX}",
                phone.trim_start_matches('+')
            )
        })
}

fn media_kind(file_type: Option<&str>) -> MediaKind {
    match file_type.unwrap_or_default() {
        "image" => MediaKind::Image,
        "audio" => MediaKind::Audio,
        "video" => MediaKind::Video,
        _ => MediaKind::Document,
    }
}

async fn handle_agent_message(worker: &Arc<Worker>, payload: WebhookPayload) -> WebhookResponse {
    let Some(inbox_id) = payload.inbox.as_ref().and_then(|i| i.id) else {
        return bad_request("payload carries no inbox");
    };
    let Some(helpdesk_message_id) = payload.id else {
        return bad_request("payload carries no message id");
    };
    let Some(recipient) = resolve_recipient(&payload) else {
        warn!(inbox_id, "no recipient resolvable from payload");
        return bad_request("no recipient resolvable from payload");
    };
    let account_id = payload
        .account
        .as_ref()
        .and_then(|a| a.id)
        .unwrap_or(worker.config.helpdesk.default_account_id);

    let attachment = payload.attachments.first().and_then(|att| {
        att.data_url.as_ref().map(|url| OutboundAttachment {
            url: url.clone(),
            media: media_kind(att.file_type.as_deref()),
            file_name: att.name.clone(),
            mime_type: att.content_type.clone(),
        })
    });

    let quote = match payload
        .content_attributes
        .as_ref()
        .and_then(|ca| ca.in_reply_to)
    {
        Some(reply_to_id) => resolve_quote(worker, account_id, reply_to_id, &recipient).await,
        None => None,
    };

    let instruction = OutboundInstruction {
        session_id: SessionId(inbox_id.to_string()),
        recipient,
        content: payload.content,
        helpdesk_message_id: HelpdeskMessageId(helpdesk_message_id),
        attachment,
        quote,
    };

    info!(
        session_id = %instruction.session_id,
        helpdesk_id = helpdesk_message_id,
        has_attachment = instruction.attachment.is_some(),
        has_quote = instruction.quote.is_some(),
        "agent message forwarded for delivery"
    );
    worker
        .send_to_primary(ControlMessage::SendOutboundMessage { instruction })
        .await;

    accepted("message forwarded for delivery")
}

/// Resolve an agent reply into a network quote via the helpdesk message's
/// recorded source id. Any failure degrades to sending without a quote.
async fn resolve_quote(
    worker: &Arc<Worker>,
    account_id: i64,
    reply_to_id: i64,
    recipient: &str,
) -> Option<QuoteRef> {
    let details = match worker.helpdesk.get_message(account_id, reply_to_id).await {
        Ok(Some(details)) => details,
        Ok(None) => {
            debug!(reply_to_id, "quoted helpdesk message unknown, sending without quote");
            return None;
        }
        Err(e) => {
            warn!(reply_to_id, error = %e, "quoted message lookup failed, sending without quote");
            return None;
        }
    };

    let foreign_id = details.source_id?;
    let incoming = details.message_type.as_deref() == Some("incoming");

    // Quoting a partner's message inside a group needs the original
    // sender as participant.
    let participant = if recipient.ends_with(pontoon_core::traits::network::GROUP_ADDRESS_SUFFIX)
        && incoming
    {
        details
            .sender
            .and_then(|s| s.phone_number)
            .map(|phone| format!("{}{DIRECT_ADDRESS_SUFFIX}", phone.trim_start_matches('+')))
    } else {
        None
    };

    Some(QuoteRef {
        foreign_id: pontoon_core::ForeignMessageId(foreign_id),
        participant,
        from_self: !incoming,
        preview: details.content.unwrap_or_else(|| "[media]".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pontoon_core::{NetworkClient, WorkerId};
    use pontoon_ipc::ControlMessage;
    use pontoon_test_utils::MockNetwork;
    use tokio::sync::mpsc;

    async fn test_worker(
        webhook_toml: &str,
    ) -> (
        Arc<Worker>,
        mpsc::Receiver<ControlMessage>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = pontoon_config::load_config_from_str(webhook_toml).unwrap();
        config.storage.database_path =
            dir.path().join("w.db").to_str().unwrap().to_string();
        config.helpdesk.access_token = Some("token".into());
        let network = Arc::new(MockNetwork::new());
        let (worker, outbox) =
            Worker::new(WorkerId(1), config, network as Arc<dyn NetworkClient>)
                .await
                .unwrap();
        (worker, outbox, dir)
    }

    fn command_payload(content: &str, agent: &str) -> WebhookPayload {
        WebhookPayload {
            event: "message_created".into(),
            id: Some(1001),
            content: Some(content.into()),
            private: false,
            source_id: None,
            sender: Some(WebhookSender {
                kind: Some("user".into()),
                name: Some(agent.into()),
            }),
            inbox: Some(WebhookInbox {
                id: Some(7),
                name: Some("Support".into()),
            }),
            account: Some(WebhookAccount { id: Some(1) }),
            conversation: Some(WebhookConversation {
                id: Some(42),
                meta: None,
                contact_inbox: None,
            }),
            contact: None,
            attachments: vec![],
            content_attributes: None,
        }
    }

    #[tokio::test]
    async fn non_message_events_are_ignored() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let payload = WebhookPayload {
            event: "conversation_updated".into(),
            ..Default::default()
        };
        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn private_notes_are_ignored() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let mut payload = command_payload("hello there", "Ana");
        payload.private = true;
        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn command_is_forwarded_with_relay_targets_from_args() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let payload = command_payload("raise 9 2", "Ana");

        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        match outbox.try_recv().unwrap() {
            ControlMessage::RequestAssign {
                session_id,
                metadata,
                requesting_worker,
            } => {
                assert_eq!(session_id, SessionId("7".into()));
                assert_eq!(metadata.display_name, "Support");
                assert_eq!(metadata.relay_target_id, 9);
                assert_eq!(metadata.relay_account_id, 2);
                assert_eq!(metadata.command_origin_conversation_id, Some(42));
                assert_eq!(requesting_worker, WorkerId(1));
            }
            other => panic!("expected RequestAssign, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_defaults_relay_targets_to_own_inbox() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let (status, _) =
            handle_webhook(State(worker), Json(command_payload("raise", "Ana"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        match outbox.try_recv().unwrap() {
            ControlMessage::RequestAssign { metadata, .. } => {
                assert_eq!(metadata.relay_target_id, 7);
                assert_eq!(metadata.relay_account_id, 1);
            }
            other => panic!("expected RequestAssign, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_command_is_rejected() {
        let toml = r#"
[webhook]
authorized_agent_names = ["Ana"]
"#;
        let (worker, mut outbox, _dir) = test_worker(toml).await;
        let (status, _) =
            handle_webhook(State(worker), Json(command_payload("raise", "Mallory"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn authorized_agent_name_is_case_insensitive() {
        let toml = r#"
[webhook]
authorized_agent_names = ["Ana"]
"#;
        let (worker, mut outbox, _dir) = test_worker(toml).await;
        let (status, _) =
            handle_webhook(State(worker), Json(command_payload("raise", "ana"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(outbox.try_recv().is_ok());
    }

    #[tokio::test]
    async fn bridge_echo_with_source_id_is_ignored() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let mut payload = command_payload("a normal reply", "Ana");
        payload.source_id = Some("3EB0ABC".into());
        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn agent_message_becomes_outbound_instruction() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let mut payload = command_payload("hello customer", "Ana");
        payload.conversation = Some(WebhookConversation {
            id: Some(42),
            meta: Some(WebhookConversationMeta {
                sender: Some(WebhookMetaSender {
                    identifier: Some(format!("5585999990000{DIRECT_ADDRESS_SUFFIX}")),
                }),
            }),
            contact_inbox: None,
        });

        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        match outbox.try_recv().unwrap() {
            ControlMessage::SendOutboundMessage { instruction } => {
                assert_eq!(instruction.session_id, SessionId("7".into()));
                assert_eq!(
                    instruction.recipient,
                    format!("5585999990000{DIRECT_ADDRESS_SUFFIX}")
                );
                assert_eq!(instruction.content.as_deref(), Some("hello customer"));
                assert_eq!(instruction.helpdesk_message_id, HelpdeskMessageId(1001));
            }
            other => panic!("expected SendOutboundMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recipient_falls_back_to_contact_phone() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let mut payload = command_payload("fallback path", "Ana");
        payload.contact = Some(WebhookContact {
            identifier: None,
            phone_number: Some("+5585999990000".into()),
        });

        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        match outbox.try_recv().unwrap() {
            ControlMessage::SendOutboundMessage { instruction } => {
                assert_eq!(
                    instruction.recipient,
                    format!("5585999990000{DIRECT_ADDRESS_SUFFIX}")
                );
            }
            other => panic!("expected SendOutboundMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn message_without_recipient_is_rejected() {
        let (worker, mut outbox, _dir) = test_worker("").await;
        let payload = command_payload("no recipient anywhere", "Ana");
        let (status, _) = handle_webhook(State(worker), Json(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(outbox.try_recv().is_err());
    }

    #[test]
    fn attachment_media_kind_mapping() {
        assert_eq!(media_kind(Some("image")), MediaKind::Image);
        assert_eq!(media_kind(Some("audio")), MediaKind::Audio);
        assert_eq!(media_kind(Some("video")), MediaKind::Video);
        assert_eq!(media_kind(Some("file")), MediaKind::Document);
        assert_eq!(media_kind(None), MediaKind::Document);
    }
}
