use profego_core::Config;

// mimalloc holds fragmentation down under many concurrent multipart uploads.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = profego_api::setup::initialize_app(config.clone()).await?;

    profego_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
