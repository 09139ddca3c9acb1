//! Request router: one request/response cycle per call.
//!
//! States per cycle: await request, dispatch by variant, respond (with a
//! trailing byte stream for a successful GET). Any error returned here is
//! connection-fatal; application-level misses travel as status codes in
//! normal responses.

use std::io;
use std::time::Duration;

use regex::Regex;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::registry::FileRegistry;
use crate::transfer::{
    DeleteFileRequest, DeleteFileResponse, Error, GetFileRequest, GetFileResponse,
    ListFilenamesRequest, ListFilenamesResponse, Message, PutFileRequest, PutFileResponse, Session,
};

/// Deadline for dispatching one request and delivering its response.
const TIME_FOR_REQUEST: Duration = Duration::from_secs(5);

/// Receives one request and runs it to completion. Waiting for the next
/// request is unbounded (idle connections are fine); the dispatch and
/// response are bounded by [`TIME_FOR_REQUEST`].
pub async fn route_request<S>(
    session: &mut Session<S>,
    registry: &FileRegistry,
    cancel: &CancellationToken,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = tokio::select! {
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        received = session.receive_message() => received?,
    };
    debug!(kind = ?request.kind(), "routing request");

    match timeout(TIME_FOR_REQUEST, dispatch(session, registry, cancel, request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Deadline),
    }
}

async fn dispatch<S>(
    session: &mut Session<S>,
    registry: &FileRegistry,
    cancel: &CancellationToken,
    request: Message,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match request {
        Message::GetFileRequest(req) => handle_get_file(session, registry, cancel, req).await,
        Message::PutFileRequest(req) => handle_put_file(session, registry, cancel, req).await,
        Message::DeleteFileRequest(req) => handle_delete_file(session, registry, req).await,
        Message::ListFilenamesRequest(req) => handle_list_filenames(session, registry, req).await,
        Message::GetFileResponse(_)
        | Message::PutFileResponse(_)
        | Message::DeleteFileResponse(_)
        | Message::ListFilenamesResponse(_) => Err(Error::UnexpectedMessage),
    }
}

async fn handle_get_file<S>(
    session: &mut Session<S>,
    registry: &FileRegistry,
    cancel: &CancellationToken,
    req: GetFileRequest,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let not_found = Message::GetFileResponse(GetFileResponse {
        status: 404,
        size: 0,
    });

    let Some(handle) = registry.get_file(&req.filename) else {
        return session.send_message(&not_found).await;
    };

    // The file may have been deleted between lookup and open.
    let mut locked = match handle.read_locked_file().await {
        Ok(locked) => locked,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return session.send_message(&not_found).await;
        }
        Err(err) => return Err(err.into()),
    };

    let size = locked.size().await?;
    session
        .send_message(&Message::GetFileResponse(GetFileResponse {
            status: 200,
            size,
        }))
        .await?;
    session.stream_to_net(cancel, &mut locked, size).await
}

async fn handle_put_file<S>(
    session: &mut Session<S>,
    registry: &FileRegistry,
    cancel: &CancellationToken,
    req: PutFileRequest,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !valid_filename(&req.filename) {
        // The declared bytes are already on the wire; drain them so the
        // connection stays framed, then refuse.
        let mut void = tokio::io::sink();
        session.stream_from_net(cancel, &mut void, req.size).await?;
        return session
            .send_message(&Message::PutFileResponse(PutFileResponse { status: 400 }))
            .await;
    }

    let handle = registry.add_file(&req.filename);
    let size = req.size;
    let sess = &mut *session;
    handle
        .with_write_lock(move |path| async move {
            let mut file = File::create(&path).await?;
            sess.stream_from_net(cancel, &mut file, size).await?;
            file.flush().await?;
            Ok::<(), Error>(())
        })
        .await?;

    session
        .send_message(&Message::PutFileResponse(PutFileResponse { status: 201 }))
        .await
}

async fn handle_delete_file<S>(
    session: &mut Session<S>,
    registry: &FileRegistry,
    req: DeleteFileRequest,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match registry.remove_file(&req.filename).await {
        Ok(()) => DeleteFileResponse { status: 200 },
        Err(err) if err.kind() == io::ErrorKind::NotFound => DeleteFileResponse { status: 404 },
        Err(err) => return Err(err.into()),
    };
    session
        .send_message(&Message::DeleteFileResponse(response))
        .await
}

async fn handle_list_filenames<S>(
    session: &mut Session<S>,
    registry: &FileRegistry,
    req: ListFilenamesRequest,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match Regex::new(&req.match_pattern) {
        Ok(pattern) => {
            let filenames = registry
                .list_filenames()
                .into_iter()
                .filter(|name| pattern.is_match(name))
                .collect();
            ListFilenamesResponse {
                status: 200,
                filenames,
            }
        }
        Err(_) => ListFilenamesResponse {
            status: 400,
            filenames: Vec::new(),
        },
    };
    session
        .send_message(&Message::ListFilenamesResponse(response))
        .await
}

/// The store is a flat namespace; anything that could walk the filesystem
/// is refused outright.
fn valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\'])
}
