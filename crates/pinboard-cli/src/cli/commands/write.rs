use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use pinboard_store::drivers::load_data;
use pinboard_store::{PinFile, PinType, WriteOptions};

use super::board_state::load_board;
use crate::cli::args::{WriteArgs, WriteType};
use crate::exit_codes::EXIT_SUCCESS;

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub async fn cmd_write(args: WriteArgs) -> anyhow::Result<i32> {
    let board = load_board()?;

    let mut options = WriteOptions::new(args.pin.as_str());
    if let Some(title) = args.title {
        options = options.with_title(title);
    }
    if let Some(description) = args.description {
        options = options.with_description(description);
    }
    if args.force_identical_write {
        options = options.force_identical_write();
    }

    let meta = match args.pin_type {
        WriteType::File => board.pin_upload(&[&args.data], options).await?,
        WriteType::Json => {
            let value: serde_json::Value = serde_json::from_str(&read_text(&args.data)?)
                .with_context(|| format!("{} is not valid JSON", args.data.display()))?;
            board.pin_write(&value, options.with_type("json")).await?
        }
        WriteType::Yaml => {
            let value: serde_yaml::Value = serde_yaml::from_str(&read_text(&args.data)?)
                .with_context(|| format!("{} is not valid YAML", args.data.display()))?;
            board.pin_write(&value, options.with_type("yaml")).await?
        }
        WriteType::Csv => {
            let bytes = std::fs::read(&args.data)
                .with_context(|| format!("failed to read {}", args.data.display()))?;
            let rows: Vec<BTreeMap<String, String>> =
                load_data(&PinType::Csv, &[PinFile::new("data.csv", bytes)])
                    .with_context(|| format!("{} is not a valid CSV table", args.data.display()))?;
            board.pin_write(&rows, options.with_type("csv")).await?
        }
    };

    if let Some(version) = meta.version() {
        println!("{version}");
    }
    Ok(EXIT_SUCCESS)
}
