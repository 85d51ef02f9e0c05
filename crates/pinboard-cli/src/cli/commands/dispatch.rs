use super::super::args::*;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::SetBoard(args) => super::board_state::cmd_set_board(args),
        Command::List(args) => super::pins::cmd_list(args).await,
        Command::Meta(args) => super::pins::cmd_meta(args).await,
        Command::Versions(args) => super::pins::cmd_versions(args).await,
        Command::Write(args) => super::write::cmd_write(args).await,
        Command::Download(args) => super::pins::cmd_download(args).await,
        Command::Search(args) => super::pins::cmd_search(args).await,
        Command::Delete(args) => super::pins::cmd_delete(args).await,
        Command::Prune(args) => super::pins::cmd_prune(args).await,
        Command::Cache(args) => match args.cmd {
            CacheSub::Info => super::cache::cmd_cache_info(),
            CacheSub::Prune(prune_args) => super::cache::cmd_cache_prune(prune_args),
        },
    }
}
