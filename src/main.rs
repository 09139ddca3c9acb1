use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferry::config::{ClientConfig, ServerConfig};
use ferry::transfer::{
    DeleteFileRequest, GetFileRequest, ListFilenamesRequest, Message, PutFileRequest,
};
use ferry::{server, Client};

#[derive(Parser)]
#[command(name = "ferry", version, about = "Client/server file transfer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the file server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:4040")]
        addr: String,
        /// Directory holding the stored files
        #[arg(long, default_value = "./server-storage", env = "FERRY_SERVER_ROOT")]
        root: PathBuf,
    },
    /// Fetch a file from the server
    Get {
        filename: String,
        #[command(flatten)]
        target: Target,
    },
    /// Store a local file on the server
    Put {
        filename: String,
        #[command(flatten)]
        target: Target,
    },
    /// Delete a file from the server
    Delete {
        filename: String,
        #[command(flatten)]
        target: Target,
    },
    /// List stored filenames matching a regular expression
    List {
        pattern: String,
        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Server address to connect to
    #[arg(long, default_value = "127.0.0.1:4040")]
    addr: String,
    /// Local directory files are uploaded from and downloaded into
    #[arg(long, default_value = "./client-storage", env = "FERRY_CLIENT_ROOT")]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { addr, root } => {
            std::fs::create_dir_all(&root)?;
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal.cancel();
                }
            });
            server::run(ServerConfig::new(addr, root), shutdown).await
        }
        Command::Get { filename, target } => {
            let mut client = connect(target).await?;
            let response = client
                .run(Message::GetFileRequest(GetFileRequest { filename }))
                .await?;
            report(&response);
            Ok(())
        }
        Command::Put { filename, target } => {
            let mut client = connect(target).await?;
            let response = client
                .run(Message::PutFileRequest(PutFileRequest { filename, size: 0 }))
                .await?;
            report(&response);
            Ok(())
        }
        Command::Delete { filename, target } => {
            let mut client = connect(target).await?;
            let response = client
                .run(Message::DeleteFileRequest(DeleteFileRequest { filename }))
                .await?;
            report(&response);
            Ok(())
        }
        Command::List { pattern, target } => {
            let mut client = connect(target).await?;
            let response = client
                .run(Message::ListFilenamesRequest(ListFilenamesRequest {
                    match_pattern: pattern,
                }))
                .await?;
            report(&response);
            Ok(())
        }
    }
}

async fn connect(target: Target) -> Result<Client> {
    std::fs::create_dir_all(&target.root)?;
    Client::connect(ClientConfig::new(target.addr, target.root)).await
}

fn report(response: &Message) {
    match response {
        Message::GetFileResponse(res) => {
            info!(status = res.status, size = res.size, "get finished");
            println!("{} (size {})", res.status, res.size);
        }
        Message::PutFileResponse(res) => {
            info!(status = res.status, "put finished");
            println!("{}", res.status);
        }
        Message::DeleteFileResponse(res) => {
            info!(status = res.status, "delete finished");
            println!("{}", res.status);
        }
        Message::ListFilenamesResponse(res) => {
            info!(status = res.status, count = res.filenames.len(), "list finished");
            println!("{}", res.status);
            for name in &res.filenames {
                println!("{name}");
            }
        }
        Message::GetFileRequest(_)
        | Message::PutFileRequest(_)
        | Message::DeleteFileRequest(_)
        | Message::ListFilenamesRequest(_) => {
            println!("unexpected request echoed back");
        }
    }
}
