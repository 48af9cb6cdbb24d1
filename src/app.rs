// src/app.rs
// =============================================================================
// The end-to-end flow of one run:
//
//   fetch page → parse items → download pool (creates the output dir) → report
//
// Everything before the pool is fatal when it fails: a page that cannot be
// fetched or parsed leaves nothing to download.
// =============================================================================

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Settings;
use crate::fetch::{Fetcher, OnError};
use crate::page;
use crate::pool::{BatchReport, DownloadPool};

pub async fn download_page(settings: &Settings, fetcher: Fetcher) -> Result<BatchReport> {
    info!("start downloading from {}", settings.url);

    // A transport failure here ends the process with exit code 1
    let html = fetcher
        .fetch_text(&settings.url, OnError::Exit)
        .await
        .context("fetching page")?;

    let items = page::parse_items(&html, &settings.url).context("parsing page")?;
    info!("found {} item(s) on {}", items.len(), settings.url);

    let report = DownloadPool::new(fetcher, settings.workers, settings.failure_policy)
        .with_debug(settings.debug)
        .run(items, &settings.output_dir)
        .await
        .context("preparing output directory")?;

    info!("stop downloading from {}", settings.url);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailurePolicy, FetchOptions};
    use crate::test_support::capture_logs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(url: String, output_dir: &Path, workers: usize) -> Settings {
        Settings {
            url,
            output_dir: output_dir.to_path_buf(),
            workers,
            environment: None,
            packages: PathBuf::from(".env"),
            failure_policy: FailurePolicy::Continue,
            fetch: FetchOptions::default(),
            log_file: PathBuf::from("unused.log"),
            debug: false,
            json: false,
        }
    }

    #[tokio::test]
    async fn test_page_with_three_items_and_two_workers() {
        let (logs, _guard) = capture_logs();
        let server = MockServer::start().await;

        let page = r#"
            <html><body>
              <audio source-type = ""  in_favorite = ""  title="One" src="/media/1.mp3" preload="none"></audio>
              <audio source-type = ""  in_favorite = ""  title="Two" src="/media/2.mp3" preload="none"></audio>
              <audio source-type = ""  in_favorite = ""  title="Three" src="/media/3.mp3" preload="none"></audio>
            </body></html>
        "#;
        Mock::given(method("GET"))
            .and(path("/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        for n in 1..=3 {
            Mock::given(method("GET"))
                .and(path(format!("/media/{}.mp3", n)))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![n as u8; 100]))
                .mount(&server)
                .await;
        }

        let out = TempDir::new().unwrap();
        let output_dir = out.path().join("mp3");
        let settings = settings(format!("{}/list", server.uri()), &output_dir, 2);
        let fetcher = Fetcher::new(&settings.fetch).unwrap();

        let report = download_page(&settings, fetcher).await.unwrap();

        assert_eq!(report.completed(), 3);
        assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 3);
        for title in ["One", "Two", "Three"] {
            assert!(output_dir.join(format!("{}.mp3", title)).is_file());
        }

        let text = logs.contents();
        assert_eq!(logs.count("start downloading from"), 1);
        assert_eq!(logs.count("stop downloading from"), 1);
        assert_eq!(logs.count("stored file"), 3);

        let start = text.find("start downloading from").unwrap();
        let stop = text.find("stop downloading from").unwrap();
        let first_store = text.find("stored file").unwrap();
        let last_store = text.rfind("stored file").unwrap();
        assert!(start < first_store);
        assert!(last_store < stop);
    }

    #[tokio::test]
    async fn test_page_without_items_creates_only_the_directory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let out = TempDir::new().unwrap();
        let output_dir = out.path().join("mp3");
        let settings = settings(format!("{}/empty", server.uri()), &output_dir, 4);
        let fetcher = Fetcher::new(&settings.fetch).unwrap();

        let report = download_page(&settings, fetcher).await.unwrap();

        assert!(report.tasks.is_empty());
        assert!(output_dir.is_dir());
        assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_page_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<audio source-type="" src="/x.mp3"></audio>"#),
            )
            .mount(&server)
            .await;

        let out = TempDir::new().unwrap();
        let settings = settings(format!("{}/bad", server.uri()), out.path(), 1);
        let fetcher = Fetcher::new(&settings.fetch).unwrap();

        let err = download_page(&settings, fetcher).await.unwrap_err();

        assert!(format!("{:#}", err).starts_with("parsing page"));
    }

    #[tokio::test]
    async fn test_output_path_that_is_a_file_fails_once_in_the_pool() {
        let server = MockServer::start().await;
        let page = r#"<audio source-type="" title="One" src="/media/1.mp3"></audio>"#;
        Mock::given(method("GET"))
            .and(path("/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let out = TempDir::new().unwrap();
        let blocker = out.path().join("mp3");
        std::fs::write(&blocker, b"x").unwrap();
        let settings = settings(format!("{}/list", server.uri()), &blocker, 1);
        let fetcher = Fetcher::new(&settings.fetch).unwrap();

        let err = download_page(&settings, fetcher).await.unwrap_err();
        let rendered = format!("{:#}", err);

        assert!(rendered.starts_with("preparing output directory"));
        assert_eq!(rendered.matches("is not a directory").count(), 1);
        assert_eq!(std::fs::read(&blocker).unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_unparseable_page_leaves_output_dir_uncreated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<audio source-type="" title="x"></audio>"#),
            )
            .mount(&server)
            .await;

        let out = TempDir::new().unwrap();
        let output_dir = out.path().join("mp3");
        let settings = settings(format!("{}/bad", server.uri()), &output_dir, 1);
        let fetcher = Fetcher::new(&settings.fetch).unwrap();

        assert!(download_page(&settings, fetcher).await.is_err());
        assert!(!output_dir.exists());
    }
}
