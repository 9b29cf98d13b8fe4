//! Transport layers exposing the provisioning service

pub mod ble;
