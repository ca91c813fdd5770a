use anyhow::{anyhow, Context};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use cart_rs::{
    create_app, init_observability,
    observability::{BusinessTracingMiddleware, DatabaseTracingMiddleware, Metrics},
    repositories::{Repositories, TableManager},
    services::CartService,
    shutdown_observability, Config, StorageBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment()
        .await
        .context("Failed to load configuration")?;

    init_observability(&config.observability).context("Failed to initialize observability")?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new().context("Failed to initialize metrics")?);

    let repositories = match config.database.backend()? {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Repositories::in_memory()
        }
        StorageBackend::DynamoDb => {
            let aws = config
                .aws
                .as_ref()
                .ok_or_else(|| anyhow!("AWS configuration missing for DynamoDB backend"))?;
            let client = Arc::new(aws.dynamodb_client.clone());

            info!(
                "DynamoDB tables: carts={}, users={}, products={}",
                config.database.carts_table_name,
                config.database.users_table_name,
                config.database.products_table_name
            );

            if config.database.create_tables {
                TableManager::new(client.clone())
                    .create_all_tables(
                        &config.database.carts_table_name,
                        &config.database.users_table_name,
                        &config.database.products_table_name,
                    )
                    .await
                    .context("Failed to create tables")?;
            }

            Repositories::dynamodb(
                client,
                &config.database,
                &aws.region,
                DatabaseTracingMiddleware::new(metrics.clone()),
            )
        }
    };

    let cart_service = Arc::new(
        CartService::from_repositories(repositories)
            .with_tracing(BusinessTracingMiddleware::new(metrics.clone())),
    );

    let app = create_app(metrics, cart_service, &config.server);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .context("Invalid bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}
