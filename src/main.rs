use minefield_server::{Settings, StartupError, build};
use tracing::info;

#[rocket::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env();
    info!("Starting {}", settings.app_title);
    info!(
        "Sessions expire after {}s idle, {}s once finished; {} new games per client per minute",
        settings.retention.idle_timeout.as_secs(),
        settings.retention.finished_timeout.as_secs(),
        settings.games_per_minute
    );
    info!("Endpoints: GET /, POST /new, POST /turn, GET /game/<id>, DELETE /game/<id>");

    build(settings)?.launch().await?;
    Ok(())
}
