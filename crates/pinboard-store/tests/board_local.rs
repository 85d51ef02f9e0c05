//! Integration tests for folder boards.
//!
//! Covers the on-disk layout, uploads and downloads, legacy metadata and
//! version bookkeeping against a real directory.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use pinboard_store::{
    board, board_folder, BoardOptions, CacheSetting, PinMeta, PinType, PinsError, Protocol, Prune,
    WriteOptions,
};
use tempfile::TempDir;

fn created(day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 3, day, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_write_lays_out_version_directory() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);

    let meta = board
        .pin_write(
            &vec!["a", "b"],
            WriteOptions::new("letters")
                .with_type("yaml")
                .with_created(created(1)),
        )
        .await
        .unwrap();

    let version = meta.version().unwrap().to_string();
    assert!(version.starts_with("20220301T120000Z-"));

    let version_dir = temp.path().join("letters").join(&version);
    assert!(version_dir.join("data.txt").is_file());
    assert!(version_dir.join("letters.yaml").is_file());

    let stored = std::fs::read_to_string(version_dir.join("data.txt")).unwrap();
    assert!(stored.contains("api_version: 1"));
    assert!(stored.contains("type: yaml"));
    assert!(!stored.contains("name:"));

    let back: Vec<String> = board.pin_read("letters", None, None).await.unwrap();
    assert_eq!(back, vec!["a", "b"]);
}

#[tokio::test]
async fn test_versions_are_listed_oldest_first() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);

    for day in [3, 1, 2] {
        board
            .pin_write(&day, WriteOptions::new("n").with_created(created(day)))
            .await
            .unwrap();
    }

    let versions = board.pin_versions("n").await.unwrap();
    let days: Vec<_> = versions.iter().map(|v| v.created().unwrap()).collect();
    assert_eq!(days, vec![created(1), created(2), created(3)]);

    let newest: u32 = board.pin_read("n", None, None).await.unwrap();
    assert_eq!(newest, 3);

    let oldest: u32 = board
        .pin_read("n", Some(&versions[0].to_string()), None)
        .await
        .unwrap();
    assert_eq!(oldest, 1);
}

#[tokio::test]
async fn test_upload_and_download_files() {
    let temp = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let report = sources.path().join("report.txt");
    let data = sources.path().join("data.csv");
    std::fs::write(&report, "hello").unwrap();
    std::fs::write(&data, "x,y\n1,2\n").unwrap();

    let board = board_folder(temp.path(), true);
    let meta = board
        .pin_upload(&[&report, &data], WriteOptions::new("bundle"))
        .await
        .unwrap();

    assert_eq!(meta.pin_type(), &PinType::File);
    assert_eq!(meta.title(), Some("bundle: a pinned set of 2 files"));

    let paths = board.pin_download("bundle", None, None).await.unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "hello");
    assert!(paths[1].ends_with("data.csv"));

    let err = board
        .pin_read::<serde_json::Value>("bundle", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PinsError::UnsupportedType { .. }));
}

#[tokio::test]
async fn test_upload_rejects_missing_files() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);

    let err = board
        .pin_upload(&[temp.path().join("nope.txt")], WriteOptions::new("x"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Path is not a valid file"));
}

#[tokio::test]
async fn test_legacy_metadata_is_readable() {
    let temp = TempDir::new().unwrap();
    let version_dir = temp.path().join("old").join("20200101T000000Z-abcde");
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(
        version_dir.join("data.txt"),
        "path: old.json\ntype: json\ndescription: from long ago\n",
    )
    .unwrap();
    std::fs::write(version_dir.join("old.json"), "{\"a\": 1}").unwrap();

    let board = board_folder(temp.path(), true);
    let meta = board.pin_meta("old", None).await.unwrap();
    assert!(matches!(meta, PinMeta::Legacy(_)));
    assert_eq!(meta.description(), Some("from long ago"));

    let value: BTreeMap<String, i32> = board.pin_read("old", None, None).await.unwrap();
    assert_eq!(value["a"], 1);
}

#[tokio::test]
async fn test_future_api_version_is_rejected() {
    let temp = TempDir::new().unwrap();
    let version_dir = temp.path().join("new").join("20300101T000000Z-abcde");
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(version_dir.join("data.txt"), "api_version: 2\n").unwrap();

    let board = board_folder(temp.path(), true);
    let err = board.pin_meta("new", None).await.unwrap_err();
    assert!(matches!(
        err,
        PinsError::UnsupportedApiVersion { api_version: 2 }
    ));
}

#[tokio::test]
async fn test_pin_list_skips_reserved_names() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("_pins.yaml"), "").unwrap();

    let board = board_folder(temp.path(), true);
    board.pin_write(&1, WriteOptions::new("a")).await.unwrap();

    assert_eq!(board.pin_list().await.unwrap(), vec!["a"]);
}

#[tokio::test]
async fn test_pin_list_on_missing_folder_is_empty() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path().join("not-yet"), true);
    assert!(board.pin_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unversioned_board_keeps_one_version() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), false);

    for day in 1..=3 {
        board
            .pin_write(&day, WriteOptions::new("x").with_created(created(day)))
            .await
            .unwrap();
    }

    let entries: Vec<_> = std::fs::read_dir(temp.path().join("x")).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_existing_version_directory_is_not_overwritten() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);

    board
        .pin_write(&1, WriteOptions::new("x").with_created(created(1)))
        .await
        .unwrap();
    let err = board
        .pin_write(
            &1,
            WriteOptions::new("x")
                .with_created(created(1))
                .force_identical_write(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PinsError::VersionExists { .. }));
}

#[tokio::test]
async fn test_prune_and_delete() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);

    for day in 1..=3 {
        board
            .pin_write(&day, WriteOptions::new("x").with_created(created(day)))
            .await
            .unwrap();
    }

    let deleted = board.pin_versions_prune("x", Prune::Keep(2)).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].created(), Some(created(1)));
    assert_eq!(board.pin_versions("x").await.unwrap().len(), 2);

    let last = board.pin_versions("x").await.unwrap().pop().unwrap();
    board.pin_version_delete("x", &last.to_string()).await.unwrap();
    assert_eq!(board.pin_versions("x").await.unwrap().len(), 1);

    board.pin_delete(&["x"]).await.unwrap();
    assert!(!temp.path().join("x").exists());
}

#[tokio::test]
async fn test_user_metadata_round_trips() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);

    let mut user = serde_yaml::Mapping::new();
    user.insert("owner".into(), "data-team".into());

    board
        .pin_write(
            &1,
            WriteOptions::new("x")
                .with_description("a number")
                .with_metadata(user),
        )
        .await
        .unwrap();

    let meta = board.pin_meta("x", None).await.unwrap();
    let current = meta.as_current().unwrap();
    assert_eq!(current.description.as_deref(), Some("a number"));
    assert_eq!(
        current.user.get("owner").and_then(|v| v.as_str()),
        Some("data-team")
    );
}

#[tokio::test]
async fn test_version_delete_rejects_non_version_names() {
    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);
    board.pin_write(&1, WriteOptions::new("x")).await.unwrap();

    for version in [".", "..", "", "a/b", "./"] {
        let err = board.pin_version_delete("x", version).await.unwrap_err();
        assert!(
            matches!(err, PinsError::InvalidVersion { .. }),
            "{version:?}: {err:?}"
        );
    }

    assert_eq!(board.pin_versions("x").await.unwrap().len(), 1);
    let value: i32 = board.pin_read("x", None, None).await.unwrap();
    assert_eq!(value, 1);
}

#[tokio::test]
async fn test_cached_download_keeps_files_with_a_shared_stem_apart() {
    let temp = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let scratch = sources.path().join("a.tmp");
    let table = sources.path().join("a.csv");
    std::fs::write(&scratch, "scratch").unwrap();
    std::fs::write(&table, "x\n1\n").unwrap();

    let board = board(
        Protocol::File,
        temp.path().to_str().unwrap(),
        BoardOptions {
            cache: Some(CacheSetting::Dir(cache.path().to_path_buf())),
            ..BoardOptions::default()
        },
    )
    .unwrap();
    board
        .pin_upload(&[&scratch, &table], WriteOptions::new("stems"))
        .await
        .unwrap();

    let paths = board.pin_download("stems", None, None).await.unwrap();
    assert_eq!(paths.len(), 2);
    for path in &paths {
        assert!(path.starts_with(cache.path()), "{}", path.display());
    }
    assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "scratch");
    assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "x\n1\n");
}

#[tokio::test]
async fn test_csv_pin_round_trips_records() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Score {
        team: String,
        points: u32,
    }

    let temp = TempDir::new().unwrap();
    let board = board_folder(temp.path(), true);
    let scores = vec![
        Score {
            team: "red".to_string(),
            points: 3,
        },
        Score {
            team: "blue".to_string(),
            points: 5,
        },
    ];

    let meta = board
        .pin_write(&scores, WriteOptions::new("scores").with_type("csv"))
        .await
        .unwrap();
    assert_eq!(meta.pin_type(), &PinType::Csv);
    assert_eq!(meta.files(), vec!["scores.csv"]);

    let version_dir = temp
        .path()
        .join("scores")
        .join(meta.version().unwrap().to_string());
    assert_eq!(
        std::fs::read_to_string(version_dir.join("scores.csv")).unwrap(),
        "points,team\n3,red\n5,blue\n"
    );

    let back: Vec<Score> = board.pin_read("scores", None, None).await.unwrap();
    assert_eq!(back, scores);
}
