//! The board selected with `set-board`, persisted between invocations.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pinboard_store::config::config_dir;
use pinboard_store::{board, Board, BoardOptions, Protocol};

use crate::cli::args::SetBoardArgs;
use crate::exit_codes::EXIT_SUCCESS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub path: String,
    pub protocol: String,
}

pub fn state_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("cli").join("current_board.json"))
}

pub fn cmd_set_board(args: SetBoardArgs) -> anyhow::Result<i32> {
    // Reject unknown protocols now rather than on the next command.
    let protocol: Protocol = args.protocol.parse()?;

    let state = BoardState {
        path: args.board,
        protocol: protocol.as_str().to_string(),
    };
    let path = state_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, serde_json::to_string(&state)?)
        .with_context(|| format!("failed to write {}", path.display()))?;

    debug!(path = %path.display(), "saved current board");
    Ok(EXIT_SUCCESS)
}

pub fn load_board() -> anyhow::Result<Board> {
    let path = state_path()?;
    let text = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "no board selected (could not read {}); run `pinboard set-board` first",
            path.display()
        )
    })?;
    let state: BoardState = serde_json::from_str(&text)
        .with_context(|| format!("invalid board state in {}", path.display()))?;

    let protocol: Protocol = state.protocol.parse()?;
    Ok(board(protocol, &state.path, BoardOptions::default())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_file_format() {
        let state = BoardState {
            path: "/data/pins".to_string(),
            protocol: "file".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"path":"/data/pins","protocol":"file"}"#
        );
    }
}
