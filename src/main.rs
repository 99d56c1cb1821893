use std::net::SocketAddr;

use clap::Parser;
use sparrow::cli::{
    Args, build_config, init_logging, load_csrf_secret, load_secret, load_users, validate_origin,
};
use sparrow::create_app;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_secret("ACCESS_TOKEN_SECRET", args.access_secret_file.as_deref())
    else {
        std::process::exit(1);
    };

    let Some(refresh_secret) =
        load_secret("REFRESH_TOKEN_SECRET", args.refresh_secret_file.as_deref())
    else {
        std::process::exit(1);
    };

    if access_secret == refresh_secret {
        error!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        std::process::exit(1);
    }

    let csrf_secret = load_csrf_secret();

    let Some(origin) = validate_origin(&args.origin) else {
        std::process::exit(1);
    };

    let Some(credentials) = load_users(args.users_file.as_deref()) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let config = build_config(
        &args,
        &origin,
        access_secret,
        refresh_secret,
        csrf_secret,
        credentials,
    );
    let app = create_app(&config);

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(_) => info!(address = %addr, "Listening"),
    }

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
