use kural_core::Config;

// Use mimalloc as the global allocator; image decoding churns through large buffers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (telemetry, storage, processor, routes)
    let (_state, router) = kural_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    kural_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
