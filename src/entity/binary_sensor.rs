//! Alarm and presence flags exposed as binary sensors.

use std::sync::Arc;

use crate::device::{Capability, Device, InelsType, Platform};
use crate::entity::{channels, Entity, EntityBase, ICON_ALERT, ICON_PROXIMITY};

pub struct BinarySensorDescription {
    pub capability: Capability,
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    /// Array channels get the channel number appended to their name.
    pub indexed: bool,
}

pub static DESCRIPTIONS: [BinarySensorDescription; 3] = [
    BinarySensorDescription {
        capability: Capability::ThermalOverloadAlarm,
        key: "toa",
        name: "Thermal overload alarm",
        icon: ICON_ALERT,
        indexed: true,
    },
    BinarySensorDescription {
        capability: Capability::CurrentOverloadAlarm,
        key: "coa",
        name: "Current overload alarm",
        icon: ICON_ALERT,
        indexed: true,
    },
    BinarySensorDescription {
        capability: Capability::Proximity,
        key: "prox",
        name: "Proximity sensor",
        icon: ICON_PROXIMITY,
        indexed: false,
    },
];

const SUPPORTED: [InelsType; 2] = [InelsType::Gsb3_90sx, InelsType::Da3_22m];

pub fn discover(device: &Arc<Device>) -> Vec<BinarySensor> {
    if !SUPPORTED.contains(&device.inels_type()) {
        return Vec::new();
    }
    DESCRIPTIONS
        .iter()
        .flat_map(|description| {
            channels(device, description.capability)
                .map(move |index| BinarySensor::new(device, description, index))
        })
        .collect()
}

pub struct BinarySensor {
    base: EntityBase,
    description: &'static BinarySensorDescription,
    index: usize,
}

impl BinarySensor {
    pub fn new(
        device: &Arc<Device>,
        description: &'static BinarySensorDescription,
        index: usize,
    ) -> Self {
        let base = if description.indexed {
            EntityBase::new(
                device,
                &format!("{}-{index}", description.key),
                &format!("{} {}", description.name, index + 1),
            )
        } else {
            EntityBase::new(device, description.key, description.name)
        };
        Self {
            base,
            description,
            index,
        }
    }

    pub fn is_on(&self) -> Option<bool> {
        self.base
            .read(|state| state.flag(self.description.capability, self.index))
    }
}

impl Entity for BinarySensor {
    fn device(&self) -> &Arc<Device> {
        &self.base.device
    }
    fn unique_id(&self) -> &str {
        &self.base.unique_id
    }
    fn name(&self) -> &str {
        &self.base.name
    }
    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }
    fn icon(&self) -> Option<&'static str> {
        Some(self.description.icon)
    }
    fn state(&self) -> Option<String> {
        self.is_on().map(|on| if on { "on" } else { "off" }.to_string())
    }
}
