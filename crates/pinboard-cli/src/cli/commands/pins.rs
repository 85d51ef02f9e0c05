//! Read and delete commands against the current board.

use anyhow::Context;
use regex::Regex;

use pinboard_store::{PinMeta, Prune, SearchRow};

use super::board_state::load_board;
use crate::cli::args::{
    DeleteArgs, DownloadArgs, ListArgs, MetaArgs, MetaFormat, PinArgs, PruneArgs, SearchArgs,
};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn cmd_list(args: ListArgs) -> anyhow::Result<i32> {
    let pattern = Regex::new(&args.pattern)
        .with_context(|| format!("invalid pattern {:?}", args.pattern))?;
    let board = load_board()?;

    for pin in board.pin_list().await? {
        if pattern.is_match(&pin) {
            println!("{pin}");
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn render_meta(meta: &PinMeta, format: MetaFormat) -> anyhow::Result<String> {
    let value = meta.to_pin_value()?;
    let text = match format {
        MetaFormat::Json => {
            // serde_json maps are sorted
            let json: serde_json::Value = serde_json::to_value(&value)?;
            serde_json::to_string_pretty(&json)?
        }
        MetaFormat::Yaml => serde_yaml::to_string(&value)?.trim_end().to_string(),
    };
    Ok(text)
}

pub async fn cmd_meta(args: MetaArgs) -> anyhow::Result<i32> {
    let board = load_board()?;
    let meta = board.pin_meta(&args.pin, args.version.as_deref()).await?;
    println!("{}", render_meta(&meta, args.format)?);
    Ok(EXIT_SUCCESS)
}

pub async fn cmd_versions(args: PinArgs) -> anyhow::Result<i32> {
    let board = load_board()?;
    for version in board.pin_versions(&args.pin).await? {
        let info = version.info();
        let created = info
            .created
            .map(|c| c.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let hash = info.hash.unwrap_or_else(|| "-".to_string());
        println!("{}\t{}\t{}", info.version, created, hash);
    }
    Ok(EXIT_SUCCESS)
}

pub async fn cmd_download(args: DownloadArgs) -> anyhow::Result<i32> {
    let board = load_board()?;
    let paths = board
        .pin_download(&args.pin, args.version.as_deref(), args.hash.as_deref())
        .await?;
    for path in paths {
        println!("{}", path.display());
    }
    Ok(EXIT_SUCCESS)
}

pub async fn cmd_search(args: SearchArgs) -> anyhow::Result<i32> {
    let board = load_board()?;
    for meta in board.pin_search(args.query.as_deref()).await? {
        let row = SearchRow::from(&meta);
        println!(
            "{}\t{}\t{}",
            row.name,
            row.pin_type,
            row.title.unwrap_or_default()
        );
    }
    Ok(EXIT_SUCCESS)
}

pub async fn cmd_delete(args: DeleteArgs) -> anyhow::Result<i32> {
    let board = load_board()?;
    let names: Vec<&str> = args.pins.iter().map(String::as_str).collect();
    board.pin_delete(&names).await?;
    Ok(EXIT_SUCCESS)
}

pub async fn cmd_prune(args: PruneArgs) -> anyhow::Result<i32> {
    let prune = match (args.keep, args.days) {
        (Some(n), None) => Prune::Keep(n),
        (None, Some(days)) => Prune::Days(days),
        // clap enforces exactly one of the two
        _ => anyhow::bail!("specify exactly one of --keep or --days"),
    };

    let board = load_board()?;
    for version in board.pin_versions_prune(&args.pin, prune).await? {
        println!("{version}");
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinboard_store::{board_memory, WriteOptions};

    #[tokio::test]
    async fn meta_renders_as_sorted_json_and_yaml() {
        let board = board_memory(true);
        board
            .pin_write(&vec![1, 2], WriteOptions::new("nums").with_title("numbers"))
            .await
            .unwrap();
        let meta = board.pin_meta("nums", None).await.unwrap();

        let json = render_meta(&meta, MetaFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["title"], "numbers");
        assert_eq!(parsed["type"], "json");

        let yaml = render_meta(&meta, MetaFormat::Yaml).unwrap();
        assert!(yaml.contains("title: numbers"));
        assert!(!yaml.ends_with('\n'));
    }
}
