//! Measurements exposed as sensors.
//!
//! Every raw channel goes through [`raw_value::decode`]. A sensor keeps the last decoded reading
//! and reports itself unavailable while that reading is a fault sentinel.

use std::sync::Arc;

use crate::device::{Capability, Device, Platform, StateError};
use crate::entity::{
    channels, Entity, EntityBase, ICON_BATTERY, ICON_DEW_POINT, ICON_HUMIDITY, ICON_LIGHT_IN,
    ICON_TEMPERATURE,
};
use crate::raw_value::{self, Decoded, DecodeError, SensorFault};

pub const PERCENTAGE: &str = "%";
pub const TEMP_CELSIUS: &str = "°C";
pub const LUX: &str = "lux";

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SensorDeviceClass {
    Battery,
    Temperature,
}

/// How the raw channel turns into the displayed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// Fixed point reading with two decimals, possibly a fault sentinel.
    Measurement,
    /// RF battery flag: zero means the battery is fine.
    BatteryLevel,
}

pub struct SensorDescription {
    pub capability: Capability,
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub unit: &'static str,
    pub device_class: Option<SensorDeviceClass>,
    pub kind: ValueKind,
}

macro_rules! sensor_descriptions {
    ($(($cap: ident is $key: literal: $name: literal, $icon: ident, $unit: ident, $class: expr, $kind: ident),)*) => {
        [$(SensorDescription {
            capability: Capability::$cap,
            key: $key,
            name: $name,
            icon: $icon,
            unit: $unit,
            device_class: $class,
            kind: ValueKind::$kind,
        },)*]
    }
}

use SensorDeviceClass as DC;

pub static DESCRIPTIONS: [SensorDescription; 8] = sensor_descriptions![
    // RF temperature sensors
    (Battery is "battery_level": "Battery", ICON_BATTERY, PERCENTAGE, Some(DC::Battery), BatteryLevel),
    (TemperatureIn is "temp_in": "Temperature In", ICON_TEMPERATURE, TEMP_CELSIUS, Some(DC::Temperature), Measurement),
    (TemperatureOut is "temp_out": "Temperature Out", ICON_TEMPERATURE, TEMP_CELSIUS, Some(DC::Temperature), Measurement),
    // Bus sensors
    (Temperature is "temp_in": "Temperature", ICON_TEMPERATURE, TEMP_CELSIUS, None, Measurement),
    (LightIntensity is "light_in": "Light intensity", ICON_LIGHT_IN, LUX, None, Measurement),
    (AnalogTemperature is "ain": "Analog temperature", ICON_TEMPERATURE, TEMP_CELSIUS, None, Measurement),
    (Humidity is "humidity": "Humidity", ICON_HUMIDITY, PERCENTAGE, None, Measurement),
    (DewPoint is "dew_point": "Dew point", ICON_DEW_POINT, TEMP_CELSIUS, None, Measurement),
];

pub fn discover(device: &Arc<Device>) -> Vec<Sensor> {
    DESCRIPTIONS
        .iter()
        .filter(|description| !channels(device, description.capability).is_empty())
        .map(|description| Sensor::new(device, description))
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub struct Sensor {
    base: EntityBase,
    description: &'static SensorDescription,
    reading: Option<Decoded>,
    /// Fault of the last reading that could be decoded.
    fault: Option<SensorFault>,
}

impl Sensor {
    pub fn new(device: &Arc<Device>, description: &'static SensorDescription) -> Self {
        let mut sensor = Self {
            base: EntityBase::new(device, description.key, description.name),
            description,
            reading: None,
            fault: None,
        };
        sensor.refresh();
        sensor
    }

    /// Decode the channel as currently reported by the device.
    pub fn read(&self) -> Result<Decoded, ReadError> {
        let raw = self
            .base
            .device
            .with_state(|state| state.raw(self.description.capability))?;
        Ok(match self.description.kind {
            ValueKind::Measurement => raw_value::decode(&raw)?,
            ValueKind::BatteryLevel => Decoded {
                value: if raw_value::parse_hex(&raw)? == 0 { 100.0 } else { 0.0 },
                fault: None,
            },
        })
    }

    /// Re-read the channel. Entering a fault is logged once; a reading that cannot be decoded
    /// keeps the fault of the last good one.
    fn refresh(&mut self) {
        match self.read() {
            Ok(reading) => {
                match (self.fault, reading.fault) {
                    (None, Some(fault)) => {
                        tracing::warn!(
                            entity = %self.base.unique_id,
                            fault = fault.meaning(),
                            "sensor fault"
                        );
                    }
                    (Some(_), None) => {
                        tracing::info!(entity = %self.base.unique_id, "sensor recovered");
                    }
                    _ => {}
                }
                self.fault = reading.fault;
                self.reading = Some(reading);
            }
            Err(error) => {
                tracing::warn!(entity = %self.base.unique_id, %error, "could not read sensor");
                self.reading = None;
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.reading.map(|reading| reading.value)
    }

    pub fn fault(&self) -> Option<SensorFault> {
        self.fault
    }

    pub fn faulted(&self) -> bool {
        self.fault.is_some()
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }
}

impl Entity for Sensor {
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
        Platform::Sensor
    }
    fn icon(&self) -> Option<&'static str> {
        Some(self.description.icon)
    }

    fn available(&self) -> bool {
        self.base.device.is_available() && !self.faulted()
    }

    fn state(&self) -> Option<String> {
        self.value().map(|value| value.to_string())
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attributes = vec![("unit_of_measurement", self.description.unit.to_string())];
        if let Some(class) = self.description.device_class {
            attributes.push(("device_class", class.to_string()));
        }
        if let Some(fault) = self.fault() {
            attributes.push(("fault", fault.meaning().to_string()));
        }
        attributes
    }

    fn on_state_change(&mut self) {
        self.refresh();
    }
}
