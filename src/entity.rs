//! Home-automation entities built on top of iNELS devices.
//!
//! Each platform module carries a static table of descriptions keyed by [`Capability`], a
//! `discover` function creating entities for the channels a device declares, and the entity
//! type itself. Entities share the [`Device`] they were created for; reads go straight to its
//! current state, actions modify a copy of the state and write it to the device.

pub mod binary_sensor;
pub mod button;
pub mod climate;
pub mod cover;
pub mod light;
pub mod select;
pub mod sensor;
pub mod switch;

use std::ops::Range;
use std::sync::Arc;

use crate::device::{self, Capability, Device, Platform, StateError};

pub const ICON_TEMPERATURE: &str = "mdi:thermometer";
pub const ICON_BATTERY: &str = "mdi:battery";
pub const ICON_SWITCH: &str = "mdi:power-socket-eu";
pub const ICON_LIGHT: &str = "mdi:lightbulb";
pub const ICON_SHUTTER_CLOSED: &str = "mdi:window-shutter";
pub const ICON_SHUTTER_OPEN: &str = "mdi:window-shutter-open";
pub const ICON_BUTTON: &str = "mdi:button-pointer";
pub const ICON_LIGHT_IN: &str = "mdi:brightness-4";
pub const ICON_HUMIDITY: &str = "mdi:water-percent";
pub const ICON_DEW_POINT: &str = "mdi:tailwind";
pub const ICON_ALERT: &str = "mdi:alert";
pub const ICON_PROXIMITY: &str = "mdi:contactless-payment";
pub const ICON_FLASH: &str = "mdi:flash";
pub const ICON_FAN: &str = "mdi:fan";
pub const ICON_THERMOSTAT: &str = "mdi:home-thermometer-outline";

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, serde::Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Changes how the device is configured.
    Config,
}

/// Actions that can be requested of an entity.
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntityCommand {
    /// `brightness` is on the 0-255 scale.
    TurnOn { brightness: Option<u8> },
    TurnOff,
    Open,
    Close,
    Stop,
    /// Temperature in °C.
    SetTemperature(f64),
    Select(String),
    Press,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{platform} entity {unique_id} does not support {command}")]
    Unsupported {
        unique_id: String,
        platform: Platform,
        command: &'static str,
    },
    #[error("{option:?} is not one of the options {options:?}")]
    InvalidOption {
        option: String,
        options: &'static [&'static str],
    },
    #[error("temperature {value} °C is outside of the range {min}..={max} °C")]
    TemperatureOutOfRange { value: f64, min: f64, max: f64 },
    #[error(transparent)]
    Device(#[from] device::Error),
}

impl From<StateError> for Error {
    fn from(value: StateError) -> Self {
        Self::Device(device::Error::State(value))
    }
}

pub trait Entity: Send + Sync {
    fn device(&self) -> &Arc<Device>;
    fn unique_id(&self) -> &str;
    fn name(&self) -> &str;
    fn platform(&self) -> Platform;

    fn icon(&self) -> Option<&'static str> {
        None
    }

    fn entity_category(&self) -> Option<EntityCategory> {
        None
    }

    fn available(&self) -> bool {
        self.device().is_available()
    }

    /// The state as displayed, `None` when it is unknown.
    fn state(&self) -> Option<String>;

    fn attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Called after the device reported a new state.
    fn on_state_change(&mut self) {}

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        Err(Error::Unsupported {
            unique_id: self.unique_id().to_string(),
            platform: self.platform(),
            command: command.into(),
        })
    }
}

/// Identity shared by all entities.
pub(crate) struct EntityBase {
    pub device: Arc<Device>,
    pub unique_id: String,
    pub name: String,
}

impl EntityBase {
    pub fn new(device: &Arc<Device>, key: &str, label: &str) -> Self {
        Self {
            unique_id: format!("{}-{key}", device.unique_id()),
            name: format!("{} {label}", device.title()),
            device: Arc::clone(device),
        }
    }

    /// Read the device state, logging when the channel is missing.
    pub fn read<T>(
        &self,
        read: impl FnOnce(&device::DeviceState) -> Result<T, StateError>,
    ) -> Option<T> {
        match self.device.with_state(read) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(entity = %self.unique_id, %error, "could not read entity state");
                None
            }
        }
    }

    pub fn unsupported(&self, platform: Platform, command: &EntityCommand) -> Error {
        Error::Unsupported {
            unique_id: self.unique_id.clone(),
            platform,
            command: command.into(),
        }
    }
}

/// Channel indexes of `capability` the device currently declares.
pub(crate) fn channels(device: &Device, capability: Capability) -> Range<usize> {
    0..device.with_state(|state| state.channels(capability))
}

/// Create every entity the device supports, on all platforms.
pub fn discover(device: &Arc<Device>) -> Vec<Box<dyn Entity>> {
    fn boxed<E: Entity + 'static>(entities: Vec<E>) -> impl Iterator<Item = Box<dyn Entity>> {
        entities.into_iter().map(|e| Box::new(e) as Box<dyn Entity>)
    }
    let entities = boxed(binary_sensor::discover(device))
        .chain(boxed(button::discover(device)))
        .chain(boxed(climate::discover(device)))
        .chain(boxed(cover::discover(device)))
        .chain(boxed(light::discover(device)))
        .chain(boxed(select::discover(device)))
        .chain(boxed(sensor::discover(device)))
        .chain(boxed(switch::discover(device)))
        .collect::<Vec<_>>();
    tracing::debug!(
        device = device.unique_id(),
        inels_type = %device.inels_type(),
        count = entities.len(),
        "discovered entities"
    );
    entities
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::device::{DeviceState, InelsType, RecordingWriter};

    pub(crate) fn device(
        inels_type: InelsType,
        state: DeviceState,
    ) -> (Arc<Device>, Arc<RecordingWriter>) {
        let writer = Arc::new(RecordingWriter::default());
        let device = Device::new("dev", "Device", inels_type, state, writer.clone()).unwrap();
        (Arc::new(device), writer)
    }

    fn summary(device: &Arc<Device>) -> Vec<(Platform, String)> {
        discover(device)
            .iter()
            .map(|e| (e.platform(), e.unique_id().to_string()))
            .collect()
    }

    #[test]
    fn discovers_across_platforms() {
        let (dimmer, _) = device(
            InelsType::Da3_22m,
            DeviceState::BusDimmer {
                out: vec![0, 50],
                toa: vec![false, false],
                coa: vec![false, false],
                temperature: "0898".into(),
            },
        );
        assert_eq!(
            summary(&dimmer),
            vec![
                (Platform::BinarySensor, "dev-toa-0".to_string()),
                (Platform::BinarySensor, "dev-toa-1".to_string()),
                (Platform::BinarySensor, "dev-coa-0".to_string()),
                (Platform::BinarySensor, "dev-coa-1".to_string()),
                (Platform::Light, "dev-out-0".to_string()),
                (Platform::Light, "dev-out-1".to_string()),
                (Platform::Sensor, "dev-temp_in".to_string()),
            ]
        );

        let (switch, _) = device(InelsType::Rfsc61, DeviceState::RfSwitch { on: true });
        assert_eq!(summary(&switch), vec![(Platform::Switch, "dev".to_string())]);
    }

    #[test]
    fn unsupported_commands() {
        let (switch, _) = device(InelsType::Rfsc61, DeviceState::RfSwitch { on: true });
        let entities = discover(&switch);
        let error = entities[0].execute(&EntityCommand::Open).unwrap_err();
        assert_eq!(error.to_string(), "switch entity dev does not support open");
    }
}
