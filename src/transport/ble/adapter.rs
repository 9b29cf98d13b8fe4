//! BLE adapter management

use bluer::{Adapter, AdapterEvent, adv::AdvertisementHandle, gatt::local::ApplicationHandle};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    backend::NetworkBridge,
    core::error::TransportResult,
    transport::ble::{advertisement::Advertisement, gatt::GattServer},
};

/// BLE peripheral lifecycle
///
/// `new` opens the BlueZ session, `start` powers and names the adapter and
/// registers the GATT application and advertisement, `run_event_loop` runs
/// until the process is told to stop.
pub struct BleAdapter<B: NetworkBridge> {
    _session: bluer::Session,
    adapter: Adapter,
    gatt_server: Arc<GattServer<B>>,
    device_name: String,
    app_handle: Option<ApplicationHandle>,
    adv_handle: Option<AdvertisementHandle>,
}

impl<B: NetworkBridge> BleAdapter<B> {
    /// Open a BlueZ session on `adapter_name`, or the default adapter
    pub async fn new(
        adapter_name: Option<&str>,
        device_name: String,
        gatt_server: Arc<GattServer<B>>,
    ) -> TransportResult<Self> {
        let session = bluer::Session::new().await?;
        let adapter = match adapter_name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };

        info!("Using BLE adapter: {}", adapter.name());

        Ok(Self {
            _session: session,
            adapter,
            gatt_server,
            device_name,
            app_handle: None,
            adv_handle: None,
        })
    }

    /// Power the adapter on, set its alias and register GATT objects
    ///
    /// Adapter setup errors are returned. Registration errors are only
    /// logged and leave the peripheral running without GATT or advertising.
    pub async fn start(&mut self) -> TransportResult<()> {
        info!("Starting BLE adapter");

        self.adapter.set_powered(true).await?;
        self.adapter.set_alias(self.device_name.clone()).await?;

        match self.gatt_server.register(&self.adapter).await {
            Ok(handle) => self.app_handle = Some(handle),
            Err(e) => error!("Failed to register application: {}", e),
        }

        let advertisement = self.advertisement().await;
        match self.adapter.advertise(advertisement.to_bluer()).await {
            Ok(handle) => {
                info!("Advertisement registered");
                self.adv_handle = Some(handle);
            }
            Err(e) => error!("Failed to register advertisement: {}", e),
        }

        info!("BLE advertising name \"{}\"", self.device_name);
        Ok(())
    }

    /// Process adapter events until the event stream ends
    pub async fn run_event_loop(&self) -> TransportResult<()> {
        let mut events = self.adapter.events().await?;

        info!("BLE event loop started");

        while let Some(event) = events.next().await {
            match event {
                AdapterEvent::DeviceAdded(addr) => {
                    debug!("Device added: {}", addr);
                }
                AdapterEvent::DeviceRemoved(addr) => {
                    debug!("Device removed: {}", addr);
                }
                AdapterEvent::PropertyChanged(prop) => {
                    debug!("Adapter property changed: {:?}", prop);
                }
            }
        }

        warn!("BLE event loop ended");
        Ok(())
    }

    /// Withdraw the advertisement and GATT application
    pub async fn stop(&mut self) {
        info!("Stopping BLE adapter");

        if self.adv_handle.take().is_some() {
            self.gatt_server.release_advertisement().await;
        }
        if self.app_handle.take().is_some() {
            info!("GATT application unregistered");
        }
    }

    async fn advertisement(&self) -> Advertisement {
        self.gatt_server
            .tree()
            .lock()
            .await
            .advertisement()
            .clone()
    }
}
