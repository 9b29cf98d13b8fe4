//! Bluetooth Low Energy transport layer

pub mod adapter;
pub mod advertisement;
pub mod gatt;
pub mod object_tree;
pub mod uuids;

pub use {
    adapter::BleAdapter,
    advertisement::Advertisement,
    gatt::{GattServer, build_object_tree, provisioning_server},
    object_tree::{AccessOptions, Application, CharacteristicRole, HasProperties, MethodCall},
    uuids::*,
};
