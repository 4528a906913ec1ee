use anyhow::Context;
use stash_domain::config::AppConfig;
use stash_kernel::config::load_config;
use stash_server::{Server, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional path to a config file; `stash.*` in the working directory otherwise.
    let path = std::env::args_os().nth(1);
    let cfg: AppConfig = load_config(path).context("Critical: Configuration is malformed")?;

    let _log = init_logging(&cfg.log)?;

    Server::builder().config(cfg).build().await?.run().await
}
