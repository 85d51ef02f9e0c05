use dialoguer::{theme::ColorfulTheme, Confirm};

use pinboard_store::config::cache_dir;
use pinboard_store::{cache_info, cache_prune, format_size};

use crate::cli::args::CachePruneArgs;
use crate::exit_codes::EXIT_SUCCESS;

pub fn cmd_cache_info() -> anyhow::Result<i32> {
    let root = cache_dir()?;
    println!("Cache root: {}", root.display());

    let boards = cache_info(&root);
    let total: u64 = boards.iter().map(|b| b.size).sum();
    for board in &boards {
        println!("  {}: {}", board.name, format_size(board.size));
    }
    println!("Total: {}", format_size(total));
    Ok(EXIT_SUCCESS)
}

pub fn cmd_cache_prune(args: CachePruneArgs) -> anyhow::Result<i32> {
    let root = cache_dir()?;
    let deleted = cache_prune(args.days, &root, |stale, size| {
        if args.yes {
            return true;
        }
        let prompt = format!(
            "Delete {} cached version(s), freeing {}?",
            stale.len(),
            format_size(size)
        );
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    })?;

    for path in deleted {
        println!("{}", path.display());
    }
    Ok(EXIT_SUCCESS)
}
