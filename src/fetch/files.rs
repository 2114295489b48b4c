use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Download `url_str` into `dest_dir` under the URL's own file name.
/// Returns the full path of the saved file.
///
/// The body is streamed chunk by chunk into a `.part` file next to the
/// destination, then renamed into place, so archives never sit fully in
/// memory and an interrupted download never leaves a truncated workbook
/// behind under the real name.
pub async fn download_file(
    client: &Client,
    url_str: &str,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    let url = Url::parse(url_str)?;
    let filename = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("download.bin");
    let dest_path = dest_dir.join(filename);
    let tmp_path = dest_dir.join(format!("{}.part", filename));

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let resp = client.get(url.as_str()).send().await?.error_for_status()?;

    let mut file = fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("creating {:?}", tmp_path))?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("streaming body of {}", url_str))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("writing to {:?}", tmp_path))?;
    }
    file.flush().await?;
    drop(file);

    fs::rename(&tmp_path, &dest_path)
        .await
        .with_context(|| format!("renaming {:?} into place", tmp_path))?;

    Ok(dest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve one fixed HTTP response on a loopback port, then exit.
    async fn serve_once(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 1024];
            let _ = socket.read(&mut req).await.unwrap();
            let header = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn downloads_stream_to_the_original_filename() {
        let body = b"PK\x03\x04 not a real archive but bytes all the same";
        let base = serve_once(body).await;
        let dir = tempfile::tempdir().unwrap();

        let client = Client::new();
        let url = format!("{}/gangwon_2023.zip", base);
        let path = download_file(&client, &url, dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("gangwon_2023.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
        // the partial file was renamed away, not left behind
        assert!(!dir.path().join("gangwon_2023.zip.part").exists());
    }

    #[tokio::test]
    async fn http_errors_do_not_leave_a_file() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 1024];
            let _ = socket.read(&mut req).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                )
                .await
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let client = Client::new();
        let url = format!("http://{}/missing.zip", addr);
        assert!(download_file(&client, &url, dir.path()).await.is_err());
        assert!(!dir.path().join("missing.zip").exists());
        assert!(!dir.path().join("missing.zip.part").exists());
    }
}
