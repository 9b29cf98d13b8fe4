//! BLE GATT UUIDs and object paths

use uuid::Uuid;

/// WiFi configuration service UUID
pub const WIFICONFIG_SERVICE_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef0);

/// SSID characteristic (read: active network, write: stage SSID)
pub const SSID_CHAR_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef1);

/// Password characteristic (write: stage password and provision)
pub const PASSWORD_CHAR_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef2);

/// Root of the exported object tree
pub const APPLICATION_PATH: &str = "/";

/// Prefix for service object paths, suffixed with the service index
pub const SERVICE_PATH_BASE: &str = "/org/bluez/arresto/service";

/// Prefix for advertisement object paths, suffixed with the advertisement index
pub const ADVERTISEMENT_PATH_BASE: &str = "/org/bluez/arresto/advertisement";

// D-Bus interface names
pub const OBJECT_MANAGER_IFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
pub const GATT_SERVICE_IFACE: &str = "org.bluez.GattService1";
pub const GATT_CHARACTERISTIC_IFACE: &str = "org.bluez.GattCharacteristic1";
pub const LE_ADVERTISEMENT_IFACE: &str = "org.bluez.LEAdvertisement1";
