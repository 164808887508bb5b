//! Interactive terminal chat
//!
//! Reads lines from stdin and sends them to the fallback chain built from
//! `GEMINI_API_KEY` / `OPENAI_API_KEY` (or a config file passed as the first
//! argument). Lines starting with `/` manage the conversation list:
//!
//! ```text
//! /new                  start a new chat
//! /list                 show chats, pinned first
//! /open <n>             switch to chat n from the list
//! /pin <n>              pin or unpin chat n
//! /rename <n> <title>   rename chat n
//! /delete <n>           delete chat n
//! /share                print the active chat as plain text
//! /search <text>        filter chats by title or content
//! /mute                 toggle narration
//! /quit                 exit
//! ```
//!
//! Run with: cargo run --example chat_demo
//! Set RUST_LOG=duochat_core=debug to watch retries and fallbacks.

use anyhow::{anyhow, Context, Result};
use duochat_core::config::{self, DuochatConfig};
use duochat_core::{ChatId, ChatSession, Narrator};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Stands in for a speech engine by echoing what would be spoken
struct ConsoleNarrator;

impl Narrator for ConsoleNarrator {
    fn speak(&self, text: &str) {
        println!("(speaking {} chars)", text.chars().count());
    }

    fn cancel(&self) {}
}

fn load_config() -> Result<DuochatConfig> {
    match std::env::args().nth(1) {
        Some(path) if path.ends_with(".json") => {
            config::load_from_json(&path).with_context(|| format!("loading {}", path))
        }
        Some(path) => config::load_from_yaml(&path).with_context(|| format!("loading {}", path)),
        None => config::from_env().context("building default configuration"),
    }
}

async fn nth_chat(session: &ChatSession, arg: Option<&str>) -> Result<ChatId> {
    let index: usize = arg
        .ok_or_else(|| anyhow!("missing chat number"))?
        .parse()
        .context("chat number")?;
    let store = session.store().await;
    let id = store.list().get(index.saturating_sub(1)).map(|c| c.id);
    id.ok_or_else(|| anyhow!("no chat #{}", index))
}

async fn print_list(session: &ChatSession, query: &str) {
    let store = session.store().await;
    let active = store.active_id();
    for (i, chat) in store.search(query).iter().enumerate() {
        println!(
            "{:>2}. {}{}{}",
            i + 1,
            if chat.pinned { "[pinned] " } else { "" },
            chat.title,
            if Some(chat.id) == active { "  <" } else { "" },
        );
    }
}

async fn handle_command(session: &ChatSession, line: &str) -> Result<bool> {
    let mut parts = line.splitn(3, ' ');
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    match command {
        "/quit" => return Ok(false),
        "/new" => {
            session.new_chat().await;
            println!("started a new chat");
        }
        "/list" => print_list(session, "").await,
        "/search" => print_list(session, arg.unwrap_or_default()).await,
        "/open" => {
            let id = nth_chat(session, arg).await?;
            session.store().await.select(id)?;
        }
        "/pin" => {
            let id = nth_chat(session, arg).await?;
            let pinned = session.store().await.toggle_pin(id)?;
            println!("{}", if pinned { "pinned" } else { "unpinned" });
        }
        "/rename" => {
            let id = nth_chat(session, arg).await?;
            session.store().await.rename(id, parts.next().unwrap_or_default())?;
        }
        "/delete" => {
            let id = nth_chat(session, arg).await?;
            let removed = session.store().await.delete(id)?;
            println!("deleted \"{}\"", removed.title);
        }
        "/share" => {
            let store = session.store().await;
            let id = store.active_id().ok_or_else(|| anyhow!("no active chat"))?;
            println!("{}", store.transcript(id)?);
        }
        "/mute" => {
            let enabled = session.toggle_speech();
            println!("narration {}", if enabled { "on" } else { "off" });
        }
        other => println!("unknown command {}", other),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let session = ChatSession::from_config(&config)?.with_narrator(Arc::new(ConsoleNarrator));
    println!(
        "providers: {}",
        session.orchestrator().providers().join(" -> ")
    );
    session.new_chat().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            match handle_command(&session, line).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    println!("error: {:#}", e);
                    continue;
                }
            }
        }

        let active = session.store().await.active_id();
        let id = match active {
            Some(id) => id,
            None => session.new_chat().await,
        };
        match session.submit(id, line).await {
            Ok(reply) => println!("\nBot: {}\n", reply.text),
            Err(e) => println!("error: {}", e),
        }
    }

    Ok(())
}
