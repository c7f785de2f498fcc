use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tanjung_core::client::{HttpProxyClient, ProxyClient};
use tanjung_core::composer::{Attachment, PRESET_QUESTIONS};
use tanjung_core::controller::{ChatController, SendOutcome, TickOutcome};
use tanjung_core::session::{JsonFilePersistence, MemoryPersistence, Persistence, SessionStore};
use tanjung_core::typewriter::TokioScheduler;
use tokio::io::{AsyncBufReadExt, BufReader};

mod clipboard;
mod commands;
mod render;

use clipboard::ClipboardService;
use commands::{help_text, CommandError, Input, SlashCommand};

#[derive(Parser, Debug)]
#[clap(name = "Tanjung", author, version, about = "Tanjung AI terminal chat")]
struct Cli {
    #[clap(long, default_value = "http://127.0.0.1:3000", help = "Base URL of the Tanjung proxy")]
    server_url: String,

    #[clap(long, help = "Directory for chat history (defaults to the platform data directory)")]
    data_dir: Option<PathBuf>,

    #[clap(long, help = "Request timeout in seconds; no timeout when omitted")]
    timeout: Option<u64>,

    #[clap(long, help = "Keep chats in memory only")]
    ephemeral: bool,

    #[clap(long, short, default_value = "warn")]
    log_level: String,
}

type Controller<P> = ChatController<P, HttpProxyClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Warn);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .parse_default_env()
        .init();

    let mut client = HttpProxyClient::new(&cli.server_url);
    if let Some(secs) = cli.timeout {
        client = client.with_timeout(Duration::from_secs(secs));
    }

    if let Err(e) = client.health_check().await {
        log::warn!("Proxy at {} is not reachable yet: {}", client.base_url(), e);
        println!("(proxy {} belum merespons, pesan mungkin gagal)", client.base_url());
    }

    if cli.ephemeral {
        run(SessionStore::open(MemoryPersistence::new()), client).await
    } else {
        let persistence = match cli.data_dir {
            Some(dir) => JsonFilePersistence::new(dir),
            None => JsonFilePersistence::default_location()?,
        };
        log::info!("Chat history in {}", persistence.dir().display());
        run(SessionStore::open(persistence), client).await
    }
}

async fn run<P: Persistence>(store: SessionStore<P>, client: HttpProxyClient) -> Result<()> {
    let mut controller = ChatController::new(store, client, Arc::new(TokioScheduler));

    println!("Tanjung AI. Ketik pesan, atau /help untuk perintah.");
    if let Some(chat) = controller.store().active_chat() {
        println!("{}", render::transcript(chat, None));
        if chat.messages.is_empty() && controller.composer().presets_visible() {
            println!("{}", render::presets());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                finish_reveal(&mut controller);
                match Input::parse(&line) {
                    Ok(input) => {
                        if !handle_input(&mut controller, input).await? {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            Some(generation) = controller.next_tick() => {
                match controller.on_tick(generation) {
                    TickOutcome::Progress(ch) => print_flush(&ch.to_string()),
                    TickOutcome::Committed { last, .. } => {
                        if let Some(ch) = last {
                            print!("{}", ch);
                        }
                        println!();
                    }
                    TickOutcome::Stale => {}
                }
            }
        }
    }

    finish_reveal(&mut controller);
    Ok(())
}

fn print_flush(text: &str) {
    print!("{}", text);
    if let Err(e) = std::io::stdout().flush() {
        log::debug!("stdout flush failed: {}", e);
    }
}

/// Prints the unrevealed rest of a running reply and commits it.
fn finish_reveal<P: Persistence>(controller: &mut Controller<P>) {
    let shown = controller.reveal_buffer().len();
    if let Some(reveal) = controller.flush_reveal() {
        println!("{}", &reveal.text[shown..]);
    }
}

fn report_send<P: Persistence>(controller: &Controller<P>, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Revealing { .. } => print_flush(render::ASSISTANT_PREFIX),
        SendOutcome::Failed { chat_id } => {
            let last = controller
                .store()
                .chat(&chat_id)
                .and_then(|chat| chat.messages.last());
            if let Some(message) = last {
                println!("{}{}", render::ASSISTANT_PREFIX, message.text);
            }
        }
        SendOutcome::NothingToSend => println!("Tidak ada yang dikirim."),
        SendOutcome::Busy => println!("Masih menunggu jawaban sebelumnya."),
    }
}

/// Returns false when the loop should exit.
async fn handle_input<P: Persistence>(controller: &mut Controller<P>, input: Input) -> Result<bool> {
    let command = match input {
        Input::Empty => return Ok(true),
        Input::Prompt(text) => {
            controller.composer_mut().set_draft(&text);
            let outcome = controller.send(None).await;
            report_send(controller, outcome);
            return Ok(true);
        }
        Input::Command(command) => command,
    };

    match command {
        SlashCommand::New => {
            controller.new_chat();
            if let Some(chat) = controller.store().active_chat() {
                println!("{}", render::transcript(chat, None));
            }
            println!("{}", render::presets());
        }
        SlashCommand::List => {
            println!(
                "{}",
                render::chat_list(controller.store().chats(), controller.store().active_chat_id())
            );
        }
        SlashCommand::Show => {
            let copied = controller.composer().copied_index(Instant::now());
            if let Some(chat) = controller.store().active_chat() {
                println!("{}", render::transcript(chat, copied));
            }
        }
        SlashCommand::Switch(target) => match target.resolve(controller.store().chats()) {
            Some(id) => {
                controller.switch_chat(&id);
                if let Some(chat) = controller.store().active_chat() {
                    println!("{}", render::transcript(chat, None));
                }
            }
            None => println!("Obrolan tidak ditemukan."),
        },
        SlashCommand::Delete(target) => match target.resolve(controller.store().chats()) {
            Some(id) => {
                controller.delete_chat(&id);
                println!(
                    "{}",
                    render::chat_list(controller.store().chats(), controller.store().active_chat_id())
                );
            }
            None => println!("Obrolan tidak ditemukan."),
        },
        SlashCommand::Attach(path) => match Attachment::from_file(&path).await {
            Ok(attachment) => {
                controller.composer_mut().attach(attachment);
                println!("{}", render::attachments(controller.composer().attachments()));
            }
            Err(e) => println!("{}", e),
        },
        SlashCommand::Detach(n) => match controller.composer_mut().remove_attachment(n - 1) {
            Some(removed) => println!("Dilepas: {}", removed.preview),
            None => println!("{}", CommandError::BadIndex(n.to_string())),
        },
        SlashCommand::Copy(n) => match controller.copy_message(n - 1) {
            Some(text) => match ClipboardService::set(&text) {
                Ok(()) => println!("Disalin!"),
                Err(e) => println!("{}", e),
            },
            None => println!("{}", CommandError::BadIndex(n.to_string())),
        },
        SlashCommand::Presets => println!("{}", render::presets()),
        SlashCommand::Preset(n) => {
            if n > PRESET_QUESTIONS.len() {
                println!("{}", CommandError::BadIndex(n.to_string()));
            } else {
                println!("{}{}", render::USER_PREFIX, PRESET_QUESTIONS[n - 1]);
                let outcome = controller.send_preset(n - 1).await;
                report_send(controller, outcome);
            }
        }
        SlashCommand::Help => println!("{}", help_text()),
        SlashCommand::Quit => return Ok(false),
    }

    Ok(true)
}
