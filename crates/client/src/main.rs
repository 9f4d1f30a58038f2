// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing::error;

use streamhub::api::{LoginRequest, RegisterRequest};
use streamhub::chat::OutgoingMessage;
use streamhub::config::ClientConfig;
use streamhub::Client;

#[derive(Parser)]
#[command(name = "streamhub", about = "Streamhub platform client")]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Create an account and store the issued credential.
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Log in and store the issued credential.
    Login { email: String, password: String },
    /// Invalidate and clear the stored credential.
    Logout,
    /// Show the logged-in identity.
    Whoami,
    /// List streams.
    Streams,
    /// Show a channel (defaults to your own).
    Channel { user_id: Option<String> },
    /// List a channel's VODs.
    Vods { channel_id: String },
    /// Upload a VOD.
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Join a stream's chat room; inbound messages print to stdout, stdin
    /// lines are sent.
    Chat { room_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = Client::new(cli.config);
    client.session.init();

    match cli.command {
        CliCommand::Register { username, email, password } => {
            let resp = client
                .api
                .register(&RegisterRequest { username, email, password })
                .await?;
            client.session.login(&resp.token, resp.refresh_token.as_deref())?;
            println!("registered as {}", resp.user.username);
        }
        CliCommand::Login { email, password } => {
            let resp = client.api.login(&LoginRequest { email, password }).await?;
            client.session.login(&resp.token, resp.refresh_token.as_deref())?;
            match client.session.current_user() {
                Some(user) => println!("logged in as {}", user.username),
                None => println!("logged in"),
            }
        }
        CliCommand::Logout => {
            client.session.logout().await;
            println!("logged out");
        }
        CliCommand::Whoami => match client.session.current_user() {
            Some(user) => println!("{} <{}> ({})", user.username, user.email, user.id),
            None => println!("not logged in"),
        },
        CliCommand::Streams => {
            for stream in client.api.streams().await? {
                let marker = if stream.is_live { "live" } else { "off " };
                println!("[{marker}] {}  {}", stream.id, stream.title);
            }
        }
        CliCommand::Channel { user_id } => {
            let channel = match user_id {
                Some(id) => client.api.channel(&id).await?,
                None => client.api.my_channel().await?,
            };
            println!(
                "{}: {} ({})",
                channel.user.username,
                channel.stream.title,
                if channel.stream.is_live { "live" } else { "offline" }
            );
        }
        CliCommand::Vods { channel_id } => {
            for vod in client.api.channel_vods(&channel_id).await? {
                println!("{}  {}  {}s", vod.id, vod.title, vod.duration);
            }
        }
        CliCommand::Upload { file, title, description } => {
            let vod = client.api.upload_vod(&title, &description, &file).await?;
            println!("uploaded {} -> {}", vod.id, vod.url);
        }
        CliCommand::Chat { room_id } => chat_repl(&client, room_id).await?,
    }

    Ok(())
}

async fn chat_repl(client: &Client, room_id: String) -> anyhow::Result<()> {
    let identity = client
        .session
        .current_user()
        .ok_or_else(|| anyhow::anyhow!("log in before joining chat"))?;
    let token = client
        .store
        .get()
        .ok_or_else(|| anyhow::anyhow!("no stored access token"))?;

    client.chat.connect(&token);
    client.chat.join_room(&room_id)?;

    let mut messages = client.chat.subscribe_messages();
    let mut notices = client.chat.subscribe_connection();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            msg = messages.recv() => match msg {
                Ok(m) if m.is_system => println!("-- {}", m.text),
                Ok(m) => println!("{}: {}", m.user.username, m.text),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(lagged = n, "dropped {n} chat messages");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },

            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    tracing::info!(?notice, "chat connection");
                }
            }

            line = lines.next_line() => match line? {
                Some(text) if !text.trim().is_empty() => {
                    client.chat.send_message(OutgoingMessage {
                        stream_id: room_id.clone(),
                        user_id: identity.id.clone(),
                        text,
                    })?;
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    client.chat.disconnect();
    Ok(())
}
