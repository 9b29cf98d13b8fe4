//! GATT object tree exported to BlueZ
//!
//! The [`Application`] owns every exported object and a method table built as
//! objects are added. Calls coming from BlueZ are resolved by
//! (object path, interface, method) in that table and then executed against
//! the owning object.

use serde::Serialize;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    backend::NetworkBridge,
    core::{
        error::{DispatchError, DispatchResult},
        service::ProvisioningService,
        types::{CharacteristicFlag, ConnectionOutcome},
    },
    transport::ble::{
        advertisement::Advertisement,
        uuids::{
            APPLICATION_PATH, GATT_CHARACTERISTIC_IFACE, GATT_SERVICE_IFACE,
            LE_ADVERTISEMENT_IFACE, OBJECT_MANAGER_IFACE, PROPERTIES_IFACE, SERVICE_PATH_BASE,
        },
    },
};

/// A single D-Bus property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    ObjectPath(String),
    Strings(Vec<String>),
    ObjectPaths(Vec<String>),
}

/// Properties of one interface, keyed by property name
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Property maps of one object, keyed by interface name
pub type InterfaceMap = BTreeMap<String, PropertyMap>;

/// Result of `ObjectManager.GetManagedObjects`, keyed by object path
pub type ManagedObjects = BTreeMap<String, InterfaceMap>;

/// An exported object carrying properties on one interface
pub trait HasProperties {
    fn path(&self) -> &str;

    fn interface(&self) -> &'static str;

    fn properties(&self) -> PropertyMap;

    fn interfaces(&self) -> InterfaceMap {
        InterfaceMap::from([(self.interface().to_string(), self.properties())])
    }
}

/// Provisioning behavior attached to a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicRole {
    /// Reads report the live active network, writes stage the SSID
    Ssid,
    /// Writes stage the password and run the provisioning workflow
    Password,
    /// Plain value holder
    Value,
}

/// Options accompanying a ReadValue or WriteValue call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessOptions {
    pub offset: usize,
    pub mtu: Option<u16>,
    pub device: Option<String>,
}

/// A GATT characteristic
#[derive(Debug, Clone)]
pub struct Characteristic {
    path: String,
    uuid: Uuid,
    flags: Vec<CharacteristicFlag>,
    service_path: String,
    role: CharacteristicRole,
    value: Vec<u8>,
}

impl Characteristic {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn role(&self) -> CharacteristicRole {
        self.role
    }

    pub fn has_flag(&self, flag: CharacteristicFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Path of the owning service
    pub fn service_path(&self) -> &str {
        &self.service_path
    }

    /// Last value stored by a write, empty if never written
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl HasProperties for Characteristic {
    fn path(&self) -> &str {
        &self.path
    }

    fn interface(&self) -> &'static str {
        GATT_CHARACTERISTIC_IFACE
    }

    fn properties(&self) -> PropertyMap {
        PropertyMap::from([
            ("UUID".to_string(), PropertyValue::String(self.uuid.to_string())),
            (
                "Service".to_string(),
                PropertyValue::ObjectPath(self.service_path.clone()),
            ),
            (
                "Flags".to_string(),
                PropertyValue::Strings(
                    self.flags.iter().map(|f| f.as_str().to_string()).collect(),
                ),
            ),
        ])
    }
}

/// A GATT service and its characteristics, in registration order
#[derive(Debug, Clone)]
pub struct Service {
    path: String,
    uuid: Uuid,
    primary: bool,
    characteristics: Vec<Characteristic>,
}

impl Service {
    pub fn new(index: usize, uuid: Uuid, primary: bool) -> Self {
        Self {
            path: format!("{}{}", SERVICE_PATH_BASE, index),
            uuid,
            primary,
            characteristics: Vec::new(),
        }
    }

    /// Add a characteristic; its path is derived from its position
    pub fn add_characteristic(
        &mut self,
        uuid: Uuid,
        flags: &[CharacteristicFlag],
        role: CharacteristicRole,
    ) -> DispatchResult<&Characteristic> {
        if self.characteristics.iter().any(|c| c.uuid == uuid) {
            return Err(DispatchError::DuplicateUuid(uuid));
        }

        let path = format!("{}/char{}", self.path, self.characteristics.len());
        self.characteristics.push(Characteristic {
            path,
            uuid,
            flags: flags.to_vec(),
            service_path: self.path.clone(),
            role,
            value: Vec::new(),
        });

        Ok(&self.characteristics[self.characteristics.len() - 1])
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }
}

impl HasProperties for Service {
    fn path(&self) -> &str {
        &self.path
    }

    fn interface(&self) -> &'static str {
        GATT_SERVICE_IFACE
    }

    fn properties(&self) -> PropertyMap {
        PropertyMap::from([
            ("UUID".to_string(), PropertyValue::String(self.uuid.to_string())),
            ("Primary".to_string(), PropertyValue::Bool(self.primary)),
            (
                "Characteristics".to_string(),
                PropertyValue::ObjectPaths(
                    self.characteristics.iter().map(|c| c.path.clone()).collect(),
                ),
            ),
        ])
    }
}

/// A method call addressed to an exported object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCall {
    GetManagedObjects,
    ReadValue(AccessOptions),
    WriteValue(Vec<u8>, AccessOptions),
    GetAll(String),
    Release,
}

impl MethodCall {
    pub fn name(&self) -> &'static str {
        match self {
            MethodCall::GetManagedObjects => "GetManagedObjects",
            MethodCall::ReadValue(_) => "ReadValue",
            MethodCall::WriteValue(..) => "WriteValue",
            MethodCall::GetAll(_) => "GetAll",
            MethodCall::Release => "Release",
        }
    }
}

/// Reply to a [`MethodCall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodReply {
    ManagedObjects(ManagedObjects),
    Value(Vec<u8>),
    Properties(PropertyMap),
    Empty,
}

/// What a method table entry points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Root,
    Characteristic { service: usize, characteristic: usize },
    Advertisement,
}

type MethodKey = (String, String, String);

fn method_key(path: &str, interface: &str, method: &str) -> MethodKey {
    (path.to_string(), interface.to_string(), method.to_string())
}

/// Root of the exported object tree
pub struct Application<B: NetworkBridge> {
    provisioning: Arc<ProvisioningService<B>>,
    services: Vec<Service>,
    advertisement: Advertisement,
    methods: BTreeMap<MethodKey, Target>,
}

impl<B: NetworkBridge> Application<B> {
    pub fn new(provisioning: Arc<ProvisioningService<B>>, advertisement: Advertisement) -> Self {
        let mut methods = BTreeMap::new();
        methods.insert(
            method_key(APPLICATION_PATH, OBJECT_MANAGER_IFACE, "GetManagedObjects"),
            Target::Root,
        );
        methods.insert(
            method_key(advertisement.path(), PROPERTIES_IFACE, "GetAll"),
            Target::Advertisement,
        );
        methods.insert(
            method_key(advertisement.path(), LE_ADVERTISEMENT_IFACE, "Release"),
            Target::Advertisement,
        );

        Self {
            provisioning,
            services: Vec::new(),
            advertisement,
            methods,
        }
    }

    /// Add a service and register its characteristics' methods
    pub fn add_service(&mut self, service: Service) -> DispatchResult<()> {
        if self.services.iter().any(|s| s.uuid == service.uuid) {
            return Err(DispatchError::DuplicateUuid(service.uuid));
        }
        if self.services.iter().any(|s| s.path == service.path) {
            return Err(DispatchError::PathInUse(service.path.clone()));
        }

        let taken: HashSet<&str> = self.methods.keys().map(|(p, _, _)| p.as_str()).collect();
        if let Some(c) = service
            .characteristics
            .iter()
            .find(|c| taken.contains(c.path.as_str()))
        {
            return Err(DispatchError::PathInUse(c.path.clone()));
        }

        let index = self.services.len();
        for (i, c) in service.characteristics.iter().enumerate() {
            let target = Target::Characteristic {
                service: index,
                characteristic: i,
            };
            for method in ["ReadValue", "WriteValue"] {
                self.methods
                    .insert(method_key(&c.path, GATT_CHARACTERISTIC_IFACE, method), target);
            }
        }

        debug!(
            "Added service {} at {} with {} characteristics",
            service.uuid,
            service.path,
            service.characteristics.len()
        );
        self.services.push(service);
        Ok(())
    }

    pub fn path(&self) -> &str {
        APPLICATION_PATH
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn advertisement(&self) -> &Advertisement {
        &self.advertisement
    }

    /// Every service and characteristic with its properties
    pub fn managed_objects(&self) -> ManagedObjects {
        let mut objects = ManagedObjects::new();
        for service in &self.services {
            objects.insert(service.path.clone(), service.interfaces());
            for c in &service.characteristics {
                objects.insert(c.path.clone(), c.interfaces());
            }
        }
        objects
    }

    /// Dispatch a call through the method table
    pub async fn call(
        &mut self,
        path: &str,
        interface: &str,
        call: MethodCall,
    ) -> DispatchResult<MethodReply> {
        let target = self.resolve(path, interface, call.name())?;

        match (target, call) {
            (Target::Root, MethodCall::GetManagedObjects) => {
                Ok(MethodReply::ManagedObjects(self.managed_objects()))
            }
            (Target::Characteristic { service, characteristic }, MethodCall::ReadValue(options)) => {
                self.read_characteristic(service, characteristic, &options)
                    .await
                    .map(MethodReply::Value)
            }
            (
                Target::Characteristic { service, characteristic },
                MethodCall::WriteValue(value, options),
            ) => {
                self.write_characteristic(service, characteristic, value, &options)
                    .await?;
                Ok(MethodReply::Empty)
            }
            (Target::Advertisement, MethodCall::GetAll(requested)) => {
                self.advertisement.get_all(&requested).map(MethodReply::Properties)
            }
            (Target::Advertisement, MethodCall::Release) => {
                self.advertisement.release();
                Ok(MethodReply::Empty)
            }
            (_, call) => Err(self.unknown_method(path, interface, call.name())),
        }
    }

    /// `GattCharacteristic1.ReadValue` on the characteristic at `path`
    pub async fn read_value(&mut self, path: &str, options: AccessOptions) -> DispatchResult<Vec<u8>> {
        match self.call(path, GATT_CHARACTERISTIC_IFACE, MethodCall::ReadValue(options)).await? {
            MethodReply::Value(value) => Ok(value),
            _ => Err(self.unknown_method(path, GATT_CHARACTERISTIC_IFACE, "ReadValue")),
        }
    }

    /// `GattCharacteristic1.WriteValue` on the characteristic at `path`
    pub async fn write_value(
        &mut self,
        path: &str,
        value: Vec<u8>,
        options: AccessOptions,
    ) -> DispatchResult<()> {
        self.call(path, GATT_CHARACTERISTIC_IFACE, MethodCall::WriteValue(value, options))
            .await
            .map(|_| ())
    }

    fn resolve(&self, path: &str, interface: &str, method: &str) -> DispatchResult<Target> {
        match self.methods.get(&method_key(path, interface, method)).copied() {
            Some(target) => Ok(target),
            None if self.has_object(path) => Err(self.unknown_method(path, interface, method)),
            None => Err(DispatchError::UnknownObject(path.to_string())),
        }
    }

    fn has_object(&self, path: &str) -> bool {
        self.services.iter().any(|s| s.path == path)
            || self.methods.keys().any(|(p, _, _)| p == path)
    }

    fn unknown_method(&self, path: &str, interface: &str, method: &str) -> DispatchError {
        DispatchError::UnknownMethod {
            path: path.to_string(),
            interface: interface.to_string(),
            method: method.to_string(),
        }
    }

    async fn read_characteristic(
        &self,
        service: usize,
        characteristic: usize,
        options: &AccessOptions,
    ) -> DispatchResult<Vec<u8>> {
        let c = &self.services[service].characteristics[characteristic];

        let value = match c.role {
            CharacteristicRole::Ssid => {
                let ssid = self.provisioning.current_ssid().await;
                info!("Read current SSID: {}", ssid);
                ssid.into_bytes()
            }
            CharacteristicRole::Password | CharacteristicRole::Value => c.value.clone(),
        };

        if options.offset > value.len() {
            return Err(DispatchError::InvalidOffset {
                offset: options.offset,
                len: value.len(),
            });
        }
        Ok(value[options.offset..].to_vec())
    }

    async fn write_characteristic(
        &mut self,
        service: usize,
        characteristic: usize,
        value: Vec<u8>,
        options: &AccessOptions,
    ) -> DispatchResult<()> {
        let c = &mut self.services[service].characteristics[characteristic];
        let role = c.role;

        match role {
            CharacteristicRole::Password => {
                info!("WriteValue on {}: {} bytes", c.uuid, value.len())
            }
            _ => info!(
                "WriteValue on {}: {}",
                c.uuid,
                String::from_utf8_lossy(&value)
            ),
        }
        if let Some(device) = &options.device {
            debug!("Write from {} (mtu {:?})", device, options.mtu);
        }

        c.value = value.clone();

        match role {
            CharacteristicRole::Ssid => self.provisioning.stage_ssid(&value).await?,
            CharacteristicRole::Password => {
                match self.provisioning.stage_password(&value).await? {
                    ConnectionOutcome::Connected => info!("Provisioning finished: connected"),
                    ConnectionOutcome::Failed => info!("Provisioning finished: failed"),
                }
            }
            CharacteristicRole::Value => {}
        }
        Ok(())
    }
}
