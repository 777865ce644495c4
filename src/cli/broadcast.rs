//! Send and chat command handlers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use relaycast::channels::{register_configured_channels, BroadcastReport, DeliveryStatus, Router};
use relaycast::config::Config;
use relaycast::notification::{Notification, Role};
use relaycast::orchestrator::{EchoGenerator, InMemoryMessageStore, InboundChat, Orchestrator};

/// Arguments of `relaycast send`.
pub(crate) struct SendRequest {
    pub conversation: String,
    pub content: String,
    pub source: String,
    pub targets: Vec<String>,
    pub include_source: bool,
    pub role: Role,
    pub audio_url: Option<String>,
    pub message_id: Option<String>,
}

async fn configured_router(config: &Config) -> Router {
    let router = Router::new();
    register_configured_channels(&router, config).await;
    router
}

/// Broadcast one message and print the outcome.
pub(crate) async fn cmd_send(config: &Config, request: SendRequest) -> Result<()> {
    let router = configured_router(config).await;

    let message_id = request
        .message_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let notification = Notification::builder(
        &message_id,
        &request.conversation,
        request.role,
        &request.content,
    )
    .maybe_audio_url(request.audio_url)
    .source_channel(&request.source)
    .target_channels(request.targets)
    .build()?;

    let results = router
        .broadcast_to_all_channels(&notification, !request.include_source)
        .await;
    let status = router.get_delivery_status(&message_id).await;

    println!("Message {}", message_id);
    print_results(&results);
    print_status(&status);
    Ok(())
}

/// Run one orchestrated turn with the echo generator.
pub(crate) async fn cmd_chat(
    config: &Config,
    conversation: &str,
    content: &str,
    source: &str,
) -> Result<()> {
    let router = Arc::new(configured_router(config).await);
    let orchestrator = Orchestrator::new(
        router,
        Arc::new(InMemoryMessageStore::new()),
        Arc::new(EchoGenerator),
    );

    let outcome = orchestrator
        .handle_inbound(InboundChat::new(conversation, content).from_channel(source))
        .await?;

    println!("User message {}", outcome.user_message_id);
    print_results(outcome.user_delivery.results());
    println!("\nReply {}: {}", outcome.reply_message_id, outcome.reply);
    print_results(outcome.reply_delivery.results());
    print_status(&outcome.reply_status);
    Ok(())
}

fn print_results(results: &HashMap<String, bool>) {
    let report = BroadcastReport::new(results.clone());
    if report.is_empty() {
        println!("  (no channels targeted)");
        return;
    }
    let mut names: Vec<&String> = results.keys().collect();
    names.sort();
    for name in names {
        let mark = if results[name] { "OK" } else { "FAILED" };
        println!("  [{}] {}", mark, name);
    }
    println!("  {}", report);
}

fn print_status(status: &DeliveryStatus) {
    println!(
        "Delivered: {}",
        if status.delivered.is_empty() {
            "-".to_string()
        } else {
            status.delivered.join(", ")
        }
    );
    if !status.is_complete() {
        println!("Pending:   {}", status.pending.join(", "));
    }
}
