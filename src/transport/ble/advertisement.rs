//! LE advertisement descriptor

use bluer::adv::{self, Feature};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::{
    core::{
        error::{DispatchError, DispatchResult},
        types::AdvertisementType,
    },
    transport::ble::{
        object_tree::{HasProperties, PropertyMap, PropertyValue},
        uuids::{ADVERTISEMENT_PATH_BASE, LE_ADVERTISEMENT_IFACE},
    },
};

/// Static advertisement making the peripheral discoverable by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    path: String,
    ad_type: AdvertisementType,
    local_name: String,
    includes: Vec<String>,
}

impl Advertisement {
    pub fn new(index: usize, ad_type: AdvertisementType, local_name: impl Into<String>) -> Self {
        Self {
            path: format!("{}{}", ADVERTISEMENT_PATH_BASE, index),
            ad_type,
            local_name: local_name.into(),
            includes: vec!["tx-power".to_string()],
        }
    }

    /// Property bag for `interface`, as answered to `Properties.GetAll`
    pub fn get_all(&self, interface: &str) -> DispatchResult<PropertyMap> {
        if interface != LE_ADVERTISEMENT_IFACE {
            return Err(DispatchError::UnknownInterface(interface.to_string()));
        }
        Ok(self.properties())
    }

    /// Called when BlueZ stops or replaces this advertisement
    pub fn release(&self) {
        info!("Advertisement released");
    }

    /// Advertisement as registered through bluer
    pub fn to_bluer(&self) -> adv::Advertisement {
        let advertisement_type = match self.ad_type {
            AdvertisementType::Peripheral => adv::Type::Peripheral,
            AdvertisementType::Broadcast => adv::Type::Broadcast,
        };

        let system_includes: BTreeSet<Feature> = self
            .includes
            .iter()
            .filter_map(|name| match name.as_str() {
                "tx-power" => Some(Feature::TxPower),
                "appearance" => Some(Feature::Appearance),
                "local-name" => Some(Feature::LocalName),
                other => {
                    warn!("Ignoring unsupported advertisement include: {}", other);
                    None
                }
            })
            .collect();

        adv::Advertisement {
            advertisement_type,
            local_name: Some(self.local_name.clone()),
            system_includes,
            discoverable: Some(true),
            ..Default::default()
        }
    }
}

impl HasProperties for Advertisement {
    fn path(&self) -> &str {
        &self.path
    }

    fn interface(&self) -> &'static str {
        LE_ADVERTISEMENT_IFACE
    }

    fn properties(&self) -> PropertyMap {
        PropertyMap::from([
            (
                "Type".to_string(),
                PropertyValue::String(self.ad_type.as_str().to_string()),
            ),
            (
                "LocalName".to_string(),
                PropertyValue::String(self.local_name.clone()),
            ),
            (
                "Includes".to_string(),
                PropertyValue::Strings(self.includes.clone()),
            ),
        ])
    }
}
