//! Dimmer, DALI and analog outputs exposed as lights.
//!
//! Devices report levels in percent while brightness is on the 0-255 scale.

use std::sync::Arc;

use crate::device::{Capability, Device, Platform};
use crate::entity::{channels, Entity, EntityBase, EntityCommand, Error, ICON_FLASH, ICON_LIGHT};

pub struct LightDescription {
    pub capability: Capability,
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

pub static DESCRIPTIONS: [LightDescription; 3] = [
    LightDescription {
        capability: Capability::Output,
        key: "out",
        name: "Light",
        icon: ICON_LIGHT,
    },
    LightDescription {
        capability: Capability::Dali,
        key: "dali",
        name: "DALI",
        icon: ICON_LIGHT,
    },
    LightDescription {
        capability: Capability::AnalogOutput,
        key: "aout",
        name: "Analog output",
        icon: ICON_FLASH,
    },
];

pub fn level_to_brightness(level: u8) -> u8 {
    (u16::from(level.min(100)) * 255 / 100) as u8
}

pub fn brightness_to_level(brightness: u8) -> u8 {
    (u16::from(brightness) * 100 / 255) as u8
}

pub fn discover(device: &Arc<Device>) -> Vec<Light> {
    DESCRIPTIONS
        .iter()
        .flat_map(|description| {
            channels(device, description.capability)
                .map(move |index| Light::new(device, description, index))
        })
        .collect()
}

pub struct Light {
    base: EntityBase,
    description: &'static LightDescription,
    index: usize,
}

impl Light {
    pub fn new(device: &Arc<Device>, description: &'static LightDescription, index: usize) -> Self {
        Self {
            base: EntityBase::new(
                device,
                &format!("{}-{index}", description.key),
                &format!("{} {}", description.name, index + 1),
            ),
            description,
            index,
        }
    }

    fn level(&self) -> Option<u8> {
        self.base
            .read(|state| state.level(self.description.capability, self.index))
    }

    pub fn is_on(&self) -> Option<bool> {
        self.level().map(|level| level > 0)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.level().map(level_to_brightness)
    }

    fn set_level(&self, level: u8) -> Result<(), Error> {
        let capability = self.description.capability;
        self.base
            .device
            .modify(|state| state.set_level(capability, self.index, level))?;
        Ok(())
    }

    /// Without a brightness the light returns to the level it had before it was turned off.
    pub fn turn_on(&self, brightness: Option<u8>) -> Result<(), Error> {
        let level = match brightness {
            Some(brightness) => brightness_to_level(brightness).min(100),
            None => self
                .base
                .device
                .last_state()
                .and_then(|last| last.level(self.description.capability, self.index).ok())
                .filter(|&level| level != 0)
                .unwrap_or(100),
        };
        self.set_level(level)
    }

    pub fn turn_off(&self) -> Result<(), Error> {
        self.set_level(0)
    }

    fn alert(&self) -> Option<&'static str> {
        let flag = |capability: Capability, index: usize| {
            self.base
                .device
                .with_state(|state| state.flag(capability, index))
                .unwrap_or(false)
        };
        match self.description.capability {
            Capability::Output if flag(Capability::ThermalOverloadAlarm, self.index) => {
                Some("thermal overload")
            }
            Capability::Output if flag(Capability::CurrentOverloadAlarm, self.index) => {
                Some("current overload")
            }
            Capability::Dali if flag(Capability::DaliPowerAlert, 0) => Some("DALI power alert"),
            Capability::Dali if flag(Capability::DaliCommunicationAlert, 0) => {
                Some("DALI communication alert")
            }
            _ => None,
        }
    }
}

impl Entity for Light {
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
        Platform::Light
    }
    fn icon(&self) -> Option<&'static str> {
        Some(self.description.icon)
    }

    fn available(&self) -> bool {
        if let Some(alert) = self.alert() {
            tracing::warn!(entity = %self.base.unique_id, alert, "light is unavailable");
            return false;
        }
        self.base.device.is_available()
    }

    fn state(&self) -> Option<String> {
        self.is_on().map(|on| if on { "on" } else { "off" }.to_string())
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = vec![("supported_color_modes", "brightness".to_string())];
        if let Some(brightness) = self.brightness() {
            attributes.push(("brightness", brightness.to_string()));
        }
        attributes
    }

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        match command {
            EntityCommand::TurnOn { brightness } => self.turn_on(*brightness),
            EntityCommand::TurnOff => self.turn_off(),
            _ => Err(self.base.unsupported(Platform::Light, command)),
        }
    }
}
