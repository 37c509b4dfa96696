//! Thermovalves exposed as climate entities.

use std::sync::Arc;

use crate::device::{Capability, ClimateState, Device, Platform};
use crate::entity::{channels, Entity, EntityBase, EntityCommand, Error, ICON_THERMOSTAT};

/// Lowest settable temperature in °C.
pub const DEFAULT_MIN_TEMP: f64 = 10.0;
/// Highest settable temperature in °C.
pub const DEFAULT_MAX_TEMP: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
}

impl HvacMode {
    /// The valve heats while the room is colder than requested.
    pub fn from_climate(climate: &ClimateState) -> Self {
        if climate.current < climate.required {
            Self::Heat
        } else {
            Self::Off
        }
    }
}

pub fn discover(device: &Arc<Device>) -> Vec<Climate> {
    channels(device, Capability::Climate)
        .map(|_| Climate::new(device))
        .collect()
}

pub struct Climate {
    base: EntityBase,
}

impl Climate {
    pub fn new(device: &Arc<Device>) -> Self {
        Self {
            base: EntityBase::new(device, "climate", "Thermovalve"),
        }
    }

    pub fn min_temp(&self) -> f64 {
        DEFAULT_MIN_TEMP
    }

    pub fn max_temp(&self) -> f64 {
        DEFAULT_MAX_TEMP
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.base.read(|state| state.climate()).map(|c| c.current)
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.base.read(|state| state.climate()).map(|c| c.required)
    }

    pub fn hvac_mode(&self) -> Option<HvacMode> {
        self.base
            .read(|state| state.climate())
            .map(|c| HvacMode::from_climate(&c))
    }

    pub fn set_temperature(&self, temperature: f64) -> Result<(), Error> {
        let (min, max) = (self.min_temp(), self.max_temp());
        if !(min..=max).contains(&temperature) {
            return Err(Error::TemperatureOutOfRange {
                value: temperature,
                min,
                max,
            });
        }
        self.base
            .device
            .modify(|state| state.set_required_temperature(temperature))?;
        Ok(())
    }
}

impl Entity for Climate {
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
        Platform::Climate
    }
    fn icon(&self) -> Option<&'static str> {
        Some(ICON_THERMOSTAT)
    }
    fn state(&self) -> Option<String> {
        self.hvac_mode().map(|mode| mode.to_string())
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = vec![
            ("min_temp", self.min_temp().to_string()),
            ("max_temp", self.max_temp().to_string()),
        ];
        if let Some(current) = self.current_temperature() {
            attributes.push(("current_temperature", current.to_string()));
        }
        if let Some(target) = self.target_temperature() {
            attributes.push(("temperature", target.to_string()));
        }
        attributes
    }

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        match command {
            EntityCommand::SetTemperature(temperature) => self.set_temperature(*temperature),
            _ => Err(self.base.unsupported(Platform::Climate, command)),
        }
    }
}
