use feed_consumer::{settings::Settings, startup::App};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new().unwrap();

    let app = App::build(settings, None).await;

    app.run().await;
}
