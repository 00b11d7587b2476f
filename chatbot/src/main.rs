use anyhow::{Context, Result};
use chatbot::document_processor::PDF_CONTENT_TYPE;
use chatbot::{Attachment, ChatError, ChatSession, Config, GeminiService, Message, Sender};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Chat with Gemini from the terminal, optionally about a PDF.
#[derive(Parser, Debug)]
#[command(name = "chatbot", version)]
struct Args {
    /// PDF whose text is sent along with every message
    #[arg(long)]
    pdf: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let session = ChatSession::new(Arc::new(GeminiService::new(&config)?));

    if let Some(path) = &args.pdf {
        attach(&session, path).await?;
    }

    println!("My Chatbot ({}). Commands: /pdf <path>, /history, /quit", config.model);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "/quit" | "/exit" => break,
            "/history" => {
                for message in session.messages() {
                    print_message(&message);
                }
            }
            _ if line.starts_with("/pdf ") => {
                let path = Path::new(line["/pdf ".len()..].trim());
                if let Err(e) = attach(&session, path).await {
                    eprintln!("{e:#}");
                }
            }
            _ => {
                println!("Typing...");
                match session.send(line).await {
                    Ok(exchange) => print_message(&exchange.reply),
                    Err(ChatError::EmptyMessage) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    Ok(())
}

async fn attach(session: &ChatSession, path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("not a file: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    match session.attach_pdf(&file_name, Some(PDF_CONTENT_TYPE), bytes).await? {
        Attachment::Ready { file_name, .. } => println!("1 file uploaded: {file_name}"),
        Attachment::Failed { file_name, reason } => {
            return Err(anyhow::anyhow!("could not read {file_name}: {reason}"))
        }
        Attachment::None | Attachment::Parsing { .. } => {}
    }
    Ok(())
}

fn print_message(message: &Message) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    };
    println!("[{who}] {}", message.text);
}
