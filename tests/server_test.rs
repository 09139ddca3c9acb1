//! End-to-end client/server tests over real TCP connections.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ferry::config::{ClientConfig, ServerConfig};
use ferry::transfer::{
    DeleteFileRequest, GetFileRequest, ListFilenamesRequest, Message, PutFileRequest,
};
use ferry::{Client, Server};

async fn start_server(root: &Path) -> (SocketAddr, CancellationToken, JoinHandle<Result<()>>) {
    let config = ServerConfig::new("127.0.0.1:0", root);
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(server.serve(shutdown.clone()));
    (addr, shutdown, task)
}

async fn connect_client(addr: SocketAddr, root: &Path) -> Client {
    Client::connect(ClientConfig::new(addr.to_string(), root))
        .await
        .unwrap()
}

fn get(filename: &str) -> Message {
    Message::GetFileRequest(GetFileRequest {
        filename: filename.to_string(),
    })
}

fn put(filename: &str) -> Message {
    // The client stats the local file and fills in the real size.
    Message::PutFileRequest(PutFileRequest {
        filename: filename.to_string(),
        size: 0,
    })
}

fn delete(filename: &str) -> Message {
    Message::DeleteFileRequest(DeleteFileRequest {
        filename: filename.to_string(),
    })
}

fn list(pattern: &str) -> Message {
    Message::ListFilenamesRequest(ListFilenamesRequest {
        match_pattern: pattern.to_string(),
    })
}

fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_put_then_get_round_trips_a_megabyte() {
    let server_root = TempDir::new().unwrap();
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let upload_root = TempDir::new().unwrap();
    let content = patterned_bytes(1024 * 1024);
    std::fs::write(upload_root.path().join("big.bin"), &content).unwrap();

    let mut uploader = connect_client(addr, upload_root.path()).await;
    match uploader.run(put("big.bin")).await.unwrap() {
        Message::PutFileResponse(res) => assert_eq!(res.status, 201),
        other => panic!("unexpected response: {other:?}"),
    }

    let download_root = TempDir::new().unwrap();
    let mut downloader = connect_client(addr, download_root.path()).await;
    match downloader.run(get("big.bin")).await.unwrap() {
        Message::GetFileResponse(res) => {
            assert_eq!(res.status, 200);
            assert_eq!(res.size, content.len() as u64);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    let downloaded = std::fs::read(download_root.path().join("big.bin")).unwrap();
    assert_eq!(downloaded, content);

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_get_unknown_file_is_not_found() {
    let server_root = TempDir::new().unwrap();
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let client_root = TempDir::new().unwrap();
    let mut client = connect_client(addr, client_root.path()).await;

    match client.run(get("never-stored.txt")).await.unwrap() {
        Message::GetFileResponse(res) => {
            assert_eq!(res.status, 404);
            assert_eq!(res.size, 0);
        }
        other => panic!("unexpected response: {other:?}"),
    }
    assert!(!client_root.path().join("never-stored.txt").exists());

    // No stream followed the response, so the connection is still framed.
    match client.run(list(".*")).await.unwrap() {
        Message::ListFilenamesResponse(res) => {
            assert_eq!(res.status, 200);
            assert!(res.filenames.is_empty());
        }
        other => panic!("unexpected response: {other:?}"),
    }

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_put_delete_put_cycle_keeps_latest_content() {
    let server_root = TempDir::new().unwrap();
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let upload_root = TempDir::new().unwrap();
    let local_path = upload_root.path().join("cycle.bin");
    let first = patterned_bytes(64 * 1024);
    std::fs::write(&local_path, &first).unwrap();

    let mut client = connect_client(addr, upload_root.path()).await;
    match client.run(put("cycle.bin")).await.unwrap() {
        Message::PutFileResponse(res) => assert_eq!(res.status, 201),
        other => panic!("unexpected response: {other:?}"),
    }

    match client.run(delete("cycle.bin")).await.unwrap() {
        Message::DeleteFileResponse(res) => assert_eq!(res.status, 200),
        other => panic!("unexpected response: {other:?}"),
    }

    let second: Vec<u8> = first.iter().rev().copied().collect();
    std::fs::write(&local_path, &second).unwrap();
    match client.run(put("cycle.bin")).await.unwrap() {
        Message::PutFileResponse(res) => assert_eq!(res.status, 201),
        other => panic!("unexpected response: {other:?}"),
    }

    let download_root = TempDir::new().unwrap();
    let mut downloader = connect_client(addr, download_root.path()).await;
    match downloader.run(get("cycle.bin")).await.unwrap() {
        Message::GetFileResponse(res) => assert_eq!(res.status, 200),
        other => panic!("unexpected response: {other:?}"),
    }
    let downloaded = std::fs::read(download_root.path().join("cycle.bin")).unwrap();
    assert_eq!(downloaded, second);

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_list_filenames_filters_by_pattern() {
    let server_root = TempDir::new().unwrap();
    for name in [
        "serverFilenameA",
        "serverFilenameAA",
        "serverFilenameBB",
        "serverFilenameAC",
    ] {
        std::fs::write(server_root.path().join(name), b"stored").unwrap();
    }
    // Pre-existing files are picked up by the startup scan.
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let client_root = TempDir::new().unwrap();
    let mut client = connect_client(addr, client_root.path()).await;

    match client.run(list(".*A.*")).await.unwrap() {
        Message::ListFilenamesResponse(res) => {
            assert_eq!(res.status, 200);
            let mut filenames = res.filenames;
            filenames.sort();
            assert_eq!(
                filenames,
                ["serverFilenameA", "serverFilenameAA", "serverFilenameAC"]
            );
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match client.run(list(".*X.*")).await.unwrap() {
        Message::ListFilenamesResponse(res) => {
            assert_eq!(res.status, 200);
            assert!(res.filenames.is_empty());
        }
        other => panic!("unexpected response: {other:?}"),
    }

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_list_filenames_rejects_bad_pattern() {
    let server_root = TempDir::new().unwrap();
    std::fs::write(server_root.path().join("present.txt"), b"stored").unwrap();
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let client_root = TempDir::new().unwrap();
    let mut client = connect_client(addr, client_root.path()).await;

    match client.run(list("[a-z")).await.unwrap() {
        Message::ListFilenamesResponse(res) => {
            assert_eq!(res.status, 400);
            assert!(res.filenames.is_empty());
        }
        other => panic!("unexpected response: {other:?}"),
    }

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_concurrent_get_and_delete_never_tear() {
    let server_root = TempDir::new().unwrap();
    let content = patterned_bytes(256 * 1024);
    std::fs::write(server_root.path().join("shared.bin"), &content).unwrap();
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let expected = content.clone();
    let getter = tokio::spawn(async move {
        let root = TempDir::new().unwrap();
        let mut client = connect_client(addr, root.path()).await;
        let mut completed = 0u32;
        for _ in 0..20 {
            match client.run(get("shared.bin")).await.unwrap() {
                Message::GetFileResponse(res) if res.status == 200 => {
                    let downloaded = std::fs::read(root.path().join("shared.bin")).unwrap();
                    assert_eq!(downloaded, expected, "torn read of shared.bin");
                    completed += 1;
                }
                Message::GetFileResponse(res) => {
                    assert_eq!(res.status, 404);
                    break;
                }
                other => panic!("unexpected response: {other:?}"),
            }
        }
        completed
    });

    let deleter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let root = TempDir::new().unwrap();
        let mut client = connect_client(addr, root.path()).await;
        match client.run(delete("shared.bin")).await.unwrap() {
            Message::DeleteFileResponse(res) => res.status,
            other => panic!("unexpected response: {other:?}"),
        }
    });

    getter.await.unwrap();
    assert_eq!(deleter.await.unwrap(), 200);

    // The handle is gone for good: a fresh lookup cleanly misses.
    let root = TempDir::new().unwrap();
    let mut client = connect_client(addr, root.path()).await;
    match client.run(get("shared.bin")).await.unwrap() {
        Message::GetFileResponse(res) => {
            assert_eq!(res.status, 404);
            assert_eq!(res.size, 0);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_put_refuses_filenames_that_walk_the_tree() {
    use ferry::transfer::Session;

    let server_root = TempDir::new().unwrap();
    let (addr, shutdown, task) = start_server(server_root.path()).await;

    let conn = tokio::net::TcpStream::connect(addr).await.unwrap();
    let mut session = Session::new(conn);
    let cancel = CancellationToken::new();

    let payload = b"these bytes must be drained, not stored";
    session
        .send_message(&Message::PutFileRequest(PutFileRequest {
            filename: "../escape.bin".to_string(),
            size: payload.len() as u64,
        }))
        .await
        .unwrap();
    let mut source: &[u8] = payload;
    session
        .stream_to_net(&cancel, &mut source, payload.len() as u64)
        .await
        .unwrap();

    match session.receive_message().await.unwrap() {
        Message::PutFileResponse(res) => assert_eq!(res.status, 400),
        other => panic!("unexpected response: {other:?}"),
    }

    // The declared bytes were drained, so the connection is still framed.
    session
        .send_message(&Message::ListFilenamesRequest(ListFilenamesRequest {
            match_pattern: ".*".to_string(),
        }))
        .await
        .unwrap();
    match session.receive_message().await.unwrap() {
        Message::ListFilenamesResponse(res) => {
            assert_eq!(res.status, 200);
            assert!(res.filenames.is_empty());
        }
        other => panic!("unexpected response: {other:?}"),
    }

    shutdown.cancel();
    task.await.unwrap().unwrap();
}
