//! Client driver: one connection-bound session, one request per call.
//!
//! The protocol is request-then-immediately-streamed: a PUT sends the
//! framed request and follows it with the file bytes without waiting for
//! any go-ahead; a GET streams the declared size off the wire right after
//! a 200 response. Errors surface directly to the caller; nothing is
//! retried.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClientConfig;
use crate::transfer::{
    DeleteFileRequest, Error, GetFileRequest, ListFilenamesRequest, Message, PutFileRequest,
    Session,
};

pub struct Client {
    session: Session<TcpStream>,
    root: PathBuf,
    cancel: CancellationToken,
}

impl Client {
    /// Connects to the server and binds a session to the connection. Local
    /// files are read from and written to `config.root`.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let conn = TcpStream::connect(&config.addr)
            .await
            .with_context(|| format!("failed to connect to {}", config.addr))?;
        debug!(addr = %config.addr, "connected");
        Ok(Self {
            session: Session::new(conn),
            root: config.root,
            cancel: CancellationToken::new(),
        })
    }

    /// Performs one full request/response cycle, streaming file bytes as
    /// the operation requires, and returns the server's response.
    pub async fn run(&mut self, request: Message) -> Result<Message> {
        match request {
            Message::GetFileRequest(req) => self.get_file(req).await,
            Message::PutFileRequest(req) => self.put_file(req).await,
            Message::DeleteFileRequest(req) => self.delete_file(req).await,
            Message::ListFilenamesRequest(req) => self.list_filenames(req).await,
            Message::GetFileResponse(_)
            | Message::PutFileResponse(_)
            | Message::DeleteFileResponse(_)
            | Message::ListFilenamesResponse(_) => Err(Error::UnexpectedMessage.into()),
        }
    }

    async fn get_file(&mut self, req: GetFileRequest) -> Result<Message> {
        let filename = req.filename.clone();
        self.session
            .send_message(&Message::GetFileRequest(req))
            .await?;

        let response = self.session.receive_message().await?;
        let Message::GetFileResponse(res) = &response else {
            return Err(Error::UnexpectedMessage.into());
        };

        if res.status == 200 {
            let path = self.root.join(&filename);
            let mut file = File::create(&path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            self.session
                .stream_from_net(&self.cancel, &mut file, res.size)
                .await?;
            file.flush().await?;
        }
        Ok(response)
    }

    async fn put_file(&mut self, req: PutFileRequest) -> Result<Message> {
        let path = self.root.join(&req.filename);
        let mut file = File::open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let size = file.metadata().await?.len();

        self.session
            .send_message(&Message::PutFileRequest(PutFileRequest {
                filename: req.filename,
                size,
            }))
            .await?;
        self.session
            .stream_to_net(&self.cancel, &mut file, size)
            .await?;

        Ok(self.session.receive_message().await?)
    }

    async fn delete_file(&mut self, req: DeleteFileRequest) -> Result<Message> {
        self.session
            .send_message(&Message::DeleteFileRequest(req))
            .await?;
        Ok(self.session.receive_message().await?)
    }

    async fn list_filenames(&mut self, req: ListFilenamesRequest) -> Result<Message> {
        self.session
            .send_message(&Message::ListFilenamesRequest(req))
            .await?;
        Ok(self.session.receive_message().await?)
    }
}
