//! Option selectors: fan coil speed.

use std::sync::Arc;

use strum::VariantNames as _;

use crate::device::{Capability, Device, FanSpeed, InelsType, Platform};
use crate::entity::{channels, Entity, EntityBase, EntityCommand, Error, ICON_FAN};

pub struct SelectDescription {
    pub capability: Capability,
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub options: &'static [&'static str],
}

pub static DESCRIPTIONS: [SelectDescription; 1] = [SelectDescription {
    capability: Capability::FanSpeed,
    key: "fan_speed",
    name: "Fan speed",
    icon: ICON_FAN,
    options: FanSpeed::VARIANTS,
}];

const SUPPORTED: [InelsType; 1] = [InelsType::Fa3_612m];

pub fn discover(device: &Arc<Device>) -> Vec<Select> {
    if !SUPPORTED.contains(&device.inels_type()) {
        return Vec::new();
    }
    DESCRIPTIONS
        .iter()
        .filter(|description| !channels(device, description.capability).is_empty())
        .map(|description| Select::new(device, description))
        .collect()
}

pub struct Select {
    base: EntityBase,
    description: &'static SelectDescription,
}

impl Select {
    pub fn new(device: &Arc<Device>, description: &'static SelectDescription) -> Self {
        Self {
            base: EntityBase::new(device, description.key, description.name),
            description,
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        self.description.options
    }

    pub fn current_option(&self) -> Option<&'static str> {
        match self.description.capability {
            Capability::FanSpeed => self.base.read(|state| state.fan_speed()).map(Into::into),
            _ => None,
        }
    }

    pub fn select_option(&self, option: &str) -> Result<(), Error> {
        let invalid = || Error::InvalidOption {
            option: option.to_string(),
            options: self.options(),
        };
        match self.description.capability {
            Capability::FanSpeed => {
                let speed = option.parse::<FanSpeed>().map_err(|_| invalid())?;
                self.base.device.modify(|state| state.set_fan_speed(speed))?;
                Ok(())
            }
            _ => Err(invalid()),
        }
    }
}

impl Entity for Select {
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
        Platform::Select
    }
    fn icon(&self) -> Option<&'static str> {
        Some(self.description.icon)
    }
    fn state(&self) -> Option<String> {
        self.current_option().map(str::to_string)
    }
    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![("options", self.options().join(", "))]
    }

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        match command {
            EntityCommand::Select(option) => self.select_option(option),
            _ => Err(self.base.unsupported(Platform::Select, command)),
        }
    }
}
