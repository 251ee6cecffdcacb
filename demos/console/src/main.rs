//! Console walkthrough of the support chat core.
//!
//! Run with: cargo run -p console-demo
//!
//! An agent logs in against in-memory collaborators, picks a
//! conversation and chats with a simulated customer. Every state change
//! is rendered as plain text.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Utc;
use support_chat_core::{ClientConfig, Conversation, ConversationId};
use support_chat_store::{MemoryAuthenticator, MemoryStore};
use support_chat_sync::{ChatClient, ChatSnapshot, SendOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const AGENT_EMAIL: &str = "agent@example.com";
const AGENT_SECRET: &str = "correct horse";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let mut billing = Conversation::new("billing-1042");
    billing.set_metadata("customer", "Ada".into());
    store.add_conversation(billing);
    store.add_conversation(Conversation::new("shipping-77"));

    let auth = Arc::new(MemoryAuthenticator::new().with_account(AGENT_EMAIL, AGENT_SECRET));
    let client = ChatClient::spawn(Arc::clone(&store), auth, ClientConfig::from_env());

    let mut changes = client.watch();
    let printer = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let view = render(&changes.borrow_and_update());
            println!("{view}");
        }
    });

    let mut notices = client.notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            eprintln!("! {notice}");
        }
    });

    if let Err(e) = client.login(AGENT_EMAIL, "wrong").await {
        tracing::info!("Expected rejection: {e}");
    }
    let identity = client
        .login(AGENT_EMAIL, AGENT_SECRET)
        .await
        .context("login failed")?;
    tracing::info!("Signed in as {}", identity.email.unwrap_or(identity.uid));

    let conversation = ConversationId::from("billing-1042");
    client.select_conversation(conversation.clone())?;

    let customer = tokio::spawn({
        let store = Arc::clone(&store);
        let conversation = conversation.clone();
        async move {
            for text in ["Hi, I was charged twice.", "Order #1042.", "Thanks!"] {
                tokio::time::sleep(Duration::from_millis(300)).await;
                if let Err(e) = store.post_message(&conversation, "customer-ada", text, Utc::now())
                {
                    tracing::warn!("Customer message lost: {e}");
                }
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(400)).await;
    client.edit_compose("  Sorry about that, checking now.  ")?;
    match client.send_compose().await? {
        SendOutcome::Sent { conversation_id } => tracing::info!("Sent to {conversation_id}"),
        SendOutcome::Skipped(reason) => tracing::info!("Nothing sent: {reason}"),
    }

    customer.await.context("customer task panicked")?;
    client.send("Refund issued. Anything else?").await?;

    client.select_conversation("shipping-77")?;
    client.flush().await?;
    client.logout().await?;
    client.flush().await?;

    client.shutdown()?;
    drop(client);
    printer.await.context("printer task panicked")?;
    Ok(())
}

/// Plain-text view of the client state.
fn render(snapshot: &ChatSnapshot) -> String {
    use std::fmt::Write as _;

    let mut out = String::from("----------------------------------------\n");
    if !snapshot.is_authenticated() {
        out.push_str("[logged out]\n");
        return out;
    }

    out.push_str("Conversations:\n");
    for conversation in &snapshot.conversations {
        let marker = if snapshot.selected_conversation.as_ref() == Some(&conversation.id) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(out, " {marker} {}", conversation.id);
    }

    match &snapshot.selected_conversation {
        Some(id) => {
            let _ = writeln!(out, "Chat with {id}:");
            for message in &snapshot.messages {
                let who = if snapshot.is_operator_message(message) {
                    "you"
                } else {
                    message.sender_id.as_str()
                };
                let _ = writeln!(out, "   {:>14}: {}", who, message.text);
            }
            let _ = writeln!(out, "Compose: {:?}", snapshot.compose);
        }
        None => out.push_str("Select a conversation to view messages\n"),
    }
    out
}
