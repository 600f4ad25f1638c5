//! Streaming HTTP download.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Errors from a failed download.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure while writing the download.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Download `url` to `dest`, streaming chunks to disk.
///
/// # Errors
///
/// Fails on transport errors, non-success status codes, and filesystem
/// errors; a partially written file is removed.
pub async fn download_file(client: &Client, url: &str, dest: &Path) -> Result<(), DownloadError> {
    tracing::debug!(url, dest = %dest.display(), "downloading");

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                drop(file);
                tokio::fs::remove_file(dest).await.ok();
                return Err(err.into());
            }
        };
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/file.bin")
            .with_status(200)
            .with_body(b"payload".to_vec())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        let client = Client::new();
        download_file(&client, &format!("{}/file.bin", server.url()), &dest)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_download_propagates_http_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing");
        let client = Client::new();
        let err = download_file(&client, &format!("{}/missing", server.url()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Http(_)));
        assert!(!dest.exists());
    }
}
