//! BLE WiFi Provisioner - Main Entry Point

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ble_wifi_provisioner::{
    backend::NmcliBridge,
    config::{CliArgs, Settings},
    core::{
        credentials::ScratchStore,
        service::ProvisioningService,
        types::{AdvertisementType, ScratchKey},
    },
    transport::ble::{Advertisement, BleAdapter, provisioning_server},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ble_wifi_provisioner=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from(CliArgs::parse());
    info!(?settings, "Starting BLE WiFi provisioner");

    let store = ScratchStore::new(settings.ssid_file.clone(), settings.password_file.clone());
    warn!(
        "WiFi password is stored in plaintext at {}",
        store.path(ScratchKey::Password).display()
    );

    let bridge = Arc::new(NmcliBridge::new(settings.interface.clone()));
    let provisioning = Arc::new(ProvisioningService::new(
        bridge,
        store,
        settings.settle_delay,
    ));

    let advertisement = Advertisement::new(0, AdvertisementType::Peripheral, &settings.device_name);
    let gatt_server = Arc::new(provisioning_server(provisioning, advertisement)?);

    if settings.dump_tree {
        let objects = gatt_server.tree().lock().await.managed_objects();
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }

    let mut adapter = BleAdapter::new(
        settings.adapter.as_deref(),
        settings.device_name.clone(),
        gatt_server,
    )
    .await?;
    adapter.start().await?;

    #[cfg(feature = "systemd")]
    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("Failed to notify systemd: {}", e);
    }

    info!("Service started successfully");

    // Run until a shutdown signal arrives
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), shutting down");
        }
        _ = shutdown_signal() => {
            info!("Received SIGTERM, shutting down");
        }
        result = adapter.run_event_loop() => {
            if let Err(e) = result {
                warn!("BLE adapter error: {}", e);
            }
        }
    }

    adapter.stop().await;
    info!("Shutting down...");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");

    sigterm.recv().await;
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    std::future::pending::<()>().await
}
