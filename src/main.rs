use std::process;
use std::sync::Arc;

use class_deck::api::deck_routes;
use class_deck::config::{Config, LogFormat};
use class_deck::peer::{HostSession, RoomCode};
use class_deck::storage::{ClassStore, FileStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    init_tracing(config.logging.format);
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    let store = match FileStore::open(&config.deck.data_dir) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, data_dir = %config.deck.data_dir, "Failed to open data directory");
            process::exit(1);
        }
    };
    let class_store = ClassStore::open(Arc::new(store), config.deck.question_count);

    let room_code = config.deck.room_code.clone().unwrap_or_else(RoomCode::generate);
    let join_link = config.join_link(&room_code);
    let session = HostSession::new(room_code, config.deck.answer_key.clone(), class_store);

    tracing::info!(
        room_code = %session.room_code(),
        host_peer_id = %session.host_peer_id(),
        join_link = %join_link,
        "Class deck ready"
    );

    let routes = deck_routes::deck_routes(session, join_link);

    warp::serve(routes)
        .run(config.bind_address())
        .await;
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
