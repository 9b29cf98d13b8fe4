//! GATT server implementation
//!
//! Builds the provisioning object tree and mirrors it into a bluer
//! application whose callbacks dispatch back through the tree.

use bluer::{
    Adapter,
    gatt::local::{
        self, ApplicationHandle, CharacteristicRead, CharacteristicReadRequest,
        CharacteristicWrite, CharacteristicWriteMethod, CharacteristicWriteRequest, ReqError,
    },
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    backend::NetworkBridge,
    core::{
        error::{DispatchError, DispatchResult},
        service::ProvisioningService,
        types::CharacteristicFlag,
    },
    transport::ble::{
        advertisement::Advertisement,
        object_tree::{
            AccessOptions, Application, Characteristic, CharacteristicRole, HasProperties,
            MethodCall, Service,
        },
        uuids::*,
    },
};

/// Build the WiFi configuration object tree
///
/// One primary service holding the SSID (read, write) and password (write)
/// characteristics.
pub fn build_object_tree<B: NetworkBridge>(
    provisioning: Arc<ProvisioningService<B>>,
    advertisement: Advertisement,
) -> DispatchResult<Application<B>> {
    let mut service = Service::new(0, WIFICONFIG_SERVICE_UUID, true);
    service.add_characteristic(
        SSID_CHAR_UUID,
        &[CharacteristicFlag::Read, CharacteristicFlag::Write],
        CharacteristicRole::Ssid,
    )?;
    service.add_characteristic(
        PASSWORD_CHAR_UUID,
        &[CharacteristicFlag::Write],
        CharacteristicRole::Password,
    )?;

    let mut app = Application::new(provisioning, advertisement);
    app.add_service(service)?;
    Ok(app)
}

/// Map a dispatch failure onto the ATT error reported to the central
fn req_error(e: DispatchError) -> ReqError {
    match e {
        DispatchError::InvalidOffset { .. } => ReqError::InvalidOffset,
        DispatchError::UnknownObject(_)
        | DispatchError::UnknownMethod { .. }
        | DispatchError::UnknownInterface(_) => ReqError::NotSupported,
        DispatchError::WriteFailed(_)
        | DispatchError::DuplicateUuid(_)
        | DispatchError::PathInUse(_) => ReqError::Failed,
    }
}

impl From<&CharacteristicReadRequest> for AccessOptions {
    fn from(req: &CharacteristicReadRequest) -> Self {
        Self {
            offset: usize::from(req.offset),
            mtu: Some(req.mtu),
            device: Some(req.device_address.to_string()),
        }
    }
}

impl From<&CharacteristicWriteRequest> for AccessOptions {
    fn from(req: &CharacteristicWriteRequest) -> Self {
        Self {
            offset: usize::from(req.offset),
            mtu: Some(req.mtu),
            device: Some(req.device_address.to_string()),
        }
    }
}

/// GATT server for WiFi provisioning
///
/// Every BlueZ request locks the whole tree for its duration, so a password
/// write holds off all other GATT operations until its workflow run ends.
pub struct GattServer<B: NetworkBridge> {
    tree: Arc<Mutex<Application<B>>>,
}

impl<B: NetworkBridge> GattServer<B> {
    pub fn new(tree: Application<B>) -> Self {
        Self {
            tree: Arc::new(Mutex::new(tree)),
        }
    }

    /// Shared handle to the object tree
    pub fn tree(&self) -> Arc<Mutex<Application<B>>> {
        self.tree.clone()
    }

    /// Build the bluer application mirroring the object tree
    pub async fn build_application(&self) -> local::Application {
        let tree = self.tree.lock().await;

        let services = tree
            .services()
            .iter()
            .map(|service| local::Service {
                uuid: service.uuid(),
                primary: service.is_primary(),
                characteristics: service
                    .characteristics()
                    .iter()
                    .map(|c| self.build_characteristic(c))
                    .collect(),
                ..Default::default()
            })
            .collect();

        local::Application {
            services,
            ..Default::default()
        }
    }

    fn build_characteristic(&self, characteristic: &Characteristic) -> local::Characteristic {
        let path = characteristic.path().to_string();

        // Only readable characteristics get a read handler, so BlueZ rejects
        // reads of write-only ones before they reach the tree.
        let read = characteristic
            .has_flag(CharacteristicFlag::Read)
            .then(|| {
                let tree = self.tree.clone();
                let path = path.clone();
                CharacteristicRead {
                    read: true,
                    fun: Box::new(move |req| {
                        let tree = tree.clone();
                        let path = path.clone();
                        Box::pin(async move {
                            let options = AccessOptions::from(&req);
                            tree.lock()
                                .await
                                .read_value(&path, options)
                                .await
                                .map_err(|e| {
                                    error!("ReadValue on {} failed: {}", path, e);
                                    req_error(e)
                                })
                        })
                    }),
                    ..Default::default()
                }
            });

        let write = characteristic
            .has_flag(CharacteristicFlag::Write)
            .then(|| {
                let tree = self.tree.clone();
                CharacteristicWrite {
                    write: true,
                    write_without_response: false,
                    method: CharacteristicWriteMethod::Fun(Box::new(move |new_value, req| {
                        let tree = tree.clone();
                        let path = path.clone();
                        Box::pin(async move {
                            let options = AccessOptions::from(&req);
                            tree.lock()
                                .await
                                .write_value(&path, new_value, options)
                                .await
                                .map_err(|e| {
                                    error!("WriteValue on {} failed: {}", path, e);
                                    req_error(e)
                                })
                        })
                    })),
                    ..Default::default()
                }
            });

        let notify = characteristic
            .has_flag(CharacteristicFlag::Notify)
            .then(Default::default);

        local::Characteristic {
            uuid: characteristic.uuid(),
            read,
            write,
            notify,
            ..Default::default()
        }
    }

    /// Register GATT application with adapter
    ///
    /// The application stays registered while the returned handle is alive.
    pub async fn register(&self, adapter: &Adapter) -> Result<ApplicationHandle, bluer::Error> {
        info!("Registering GATT application");
        let app = self.build_application().await;
        let handle = adapter.serve_gatt_application(app).await?;
        info!("GATT application registered");
        Ok(handle)
    }

    /// Notify the advertisement that BlueZ no longer broadcasts it
    pub async fn release_advertisement(&self) {
        let mut tree = self.tree.lock().await;
        let path = tree.advertisement().path().to_string();
        if let Err(e) = tree
            .call(&path, LE_ADVERTISEMENT_IFACE, MethodCall::Release)
            .await
        {
            debug!("Advertisement release failed: {}", e);
        }
    }
}

/// Build the full provisioning GATT server
pub fn provisioning_server<B: NetworkBridge>(
    provisioning: Arc<ProvisioningService<B>>,
    advertisement: Advertisement,
) -> DispatchResult<GattServer<B>> {
    build_object_tree(provisioning, advertisement).map(GattServer::new)
}
