//! Integration tests for read-only url boards.
//!
//! A url board maps pin names to paths under a base url. Paths ending in `/`
//! are pin directories with a `data.txt`; anything else is a single raw file.

use std::collections::BTreeMap;

use pinboard_store::{board_url, Board, PinMeta, PinsError, WriteOptions};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTENT: &str = "[1,2,3]";

fn data_txt(file: &str) -> String {
    let pin_hash = hex::encode(Sha256::digest(CONTENT.as_bytes()));
    format!(
        "api_version: 1\ncreated: 20220209T220116Z\nfile: {file}\nfile_size: {}\n\
         pin_hash: {pin_hash}\ntitle: 'numbers: a pinned list of 3 items'\ntype: json\nuser: {{}}\n",
        CONTENT.len()
    )
}

async fn serve(server: &MockServer, route: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

fn url_board(server: &MockServer, cache: &TempDir, paths: &[(&str, String)]) -> Board {
    let paths: BTreeMap<String, String> = paths
        .iter()
        .map(|(name, p)| (name.to_string(), p.clone()))
        .collect();
    board_url(&format!("{}/pins", server.uri()), paths, Some(cache.path())).unwrap()
}

#[tokio::test]
async fn test_directory_pin_reads_metadata_and_data() {
    let server = MockServer::start().await;
    serve(&server, "/pins/numbers/v1/data.txt", &data_txt("numbers.json"), 1).await;
    serve(&server, "/pins/numbers/v1/numbers.json", CONTENT, 1).await;

    let cache = TempDir::new().unwrap();
    let board = url_board(&server, &cache, &[("numbers", "numbers/v1/".to_string())]);

    assert_eq!(board.pin_list().await.unwrap(), vec!["numbers"]);
    assert!(board.pin_exists("numbers").await.unwrap());
    assert!(!board.pin_exists("other").await.unwrap());

    let meta = board.pin_meta("numbers", None).await.unwrap();
    let PinMeta::Current(current) = &meta else {
        panic!("expected current metadata, got {meta:?}");
    };
    assert_eq!(current.local.get("path").map(String::as_str), Some("numbers/v1/"));
    assert_eq!(meta.title(), Some("numbers: a pinned list of 3 items"));
    assert_eq!(meta.files(), vec!["numbers.json"]);

    let value: Vec<i32> = board.pin_read("numbers", None, None).await.unwrap();
    assert_eq!(value, vec![1, 2, 3]);

    // both files are now served from the cache
    let again: Vec<i32> = board.pin_read("numbers", None, None).await.unwrap();
    assert_eq!(again, value);
}

#[tokio::test]
async fn test_unknown_pin_is_not_found() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let board = url_board(&server, &cache, &[("numbers", "numbers/v1/".to_string())]);

    let err = board.pin_meta("missing", None).await.unwrap_err();
    assert!(matches!(err, PinsError::PinNotFound { .. }));
}

#[tokio::test]
async fn test_path_without_trailing_slash_is_a_raw_file() {
    let server = MockServer::start().await;
    serve(&server, "/pins/files/report.csv", "a,b\n1,2\n", 1).await;

    let cache = TempDir::new().unwrap();
    let board = url_board(&server, &cache, &[("report", "files/report.csv".to_string())]);

    let meta = board.pin_meta("report", None).await.unwrap();
    let PinMeta::Raw(raw) = &meta else {
        panic!("expected raw metadata, got {meta:?}");
    };
    assert_eq!(raw.file, "files/report.csv");
    assert_eq!(raw.name, "report");

    let err = board
        .pin_read::<serde_json::Value>("report", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PinsError::UnsupportedType { .. }));
    assert!(err.to_string().contains("use pin_download() instead"));

    // fetched once, then served from the cache
    for _ in 0..2 {
        let paths = board.pin_download("report", None, None).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with(cache.path()));
        assert!(paths[0].ends_with("report.csv"));
        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "a,b\n1,2\n");
    }
}

#[tokio::test]
async fn test_absolute_url_pins_are_downloaded_through_the_cache() {
    let server = MockServer::start().await;
    serve(&server, "/elsewhere/model.bin", "weights", 1).await;
    serve(&server, "/elsewhere/numbers/data.txt", &data_txt("numbers.json"), 1).await;
    serve(&server, "/elsewhere/numbers/numbers.json", CONTENT, 1).await;

    let cache = TempDir::new().unwrap();
    let board = url_board(
        &server,
        &cache,
        &[
            ("model", format!("{}/elsewhere/model.bin", server.uri())),
            ("numbers", format!("{}/elsewhere/numbers/", server.uri())),
        ],
    );

    for _ in 0..2 {
        let paths = board.pin_download("model", None, None).await.unwrap();
        assert!(paths[0].starts_with(cache.path()));
        assert!(paths[0].ends_with("model.bin"));
        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "weights");
    }

    let paths = board.pin_download("numbers", None, None).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), CONTENT);
}

#[tokio::test]
async fn test_versions_are_unsupported() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let board = url_board(&server, &cache, &[("numbers", "numbers/v1/".to_string())]);

    let err = board.pin_meta("numbers", Some("v1")).await.unwrap_err();
    assert!(matches!(err, PinsError::Unsupported { .. }));

    let err = board.pin_versions("numbers").await.unwrap_err();
    assert!(matches!(err, PinsError::Unsupported { .. }));

    // nothing was requested
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_writes_are_refused() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let board = url_board(&server, &cache, &[("numbers", "numbers/v1/".to_string())]);

    let err = board
        .pin_write(&vec![1], WriteOptions::new("numbers"))
        .await
        .unwrap_err();
    assert!(matches!(err, PinsError::ReadOnly { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
