use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use mediatheque::config::Config;
use mediatheque::mailer::{MailTransport, NullMailTransport, SmtpMailTransport};
use mediatheque::storage::LocalStorage;
use mediatheque::{build_app, cli, db};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:data/mediatheque.db".to_string());

    let pool = db::init_pool(&database_url).await;
    let config = Config::from_env();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("create-user") => {
            let name = args.get(2).expect("usage: create-user <name> [email]");
            if let Err(e) = cli::create_user(&pool, name, args.get(3).map(String::as_str)).await {
                eprintln!("create-user failed: {e}");
                std::process::exit(1);
            }
        }
        Some("import-media") => {
            let dir = args.get(2).expect("usage: import-media <dir> <owner-id>");
            let owner_id = args.get(3).expect("usage: import-media <dir> <owner-id>");
            let storage = LocalStorage::new(&config);
            if let Err(e) = cli::import_media(&pool, &storage, dir, owner_id).await {
                eprintln!("import-media failed: {e}");
                std::process::exit(1);
            }
        }
        _ => serve(pool, config).await,
    }
}

async fn serve(pool: sqlx::SqlitePool, config: Config) {
    let mail: Arc<dyn MailTransport> = match &config.smtp_relay {
        Some(relay) => match SmtpMailTransport::new(relay) {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                tracing::error!("SMTP transport setup failed: {e}");
                Arc::new(NullMailTransport)
            }
        },
        None => Arc::new(NullMailTransport),
    };

    let secure_cookies = std::env::var("SECURE_COOKIES")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .expect("Invalid BIND_ADDR");

    let app = build_app(pool, config, mail, secure_cookies).await;

    let listener = TcpListener::bind(bind_addr).await.unwrap();

    tracing::info!("listening on {}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}
