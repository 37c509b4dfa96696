//! Typed model of iNELS device state.
//!
//! Every device type reports one family of state. A family declares a set of [`Capability`]
//! channels; entity discovery looks at the number of channels a state declares for each
//! capability rather than at the shape of the state itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::raw_value::{self, DecodeError};

/// Byte layout of the RFTI-10B frame: battery flag, internal and external temperature.
pub const RFTI_10B_BATTERY: &[usize] = &[0];
pub const RFTI_10B_TEMP_IN: &[usize] = &[2, 1];
pub const RFTI_10B_TEMP_OUT: &[usize] = &[4, 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum InelsType {
    #[strum(serialize = "RFSC-61")]
    Rfsc61,
    #[strum(serialize = "SA3-01B")]
    Sa3_01b,
    #[strum(serialize = "DA3-22M")]
    Da3_22m,
    #[strum(serialize = "DCDA-33M")]
    Dcda33m,
    #[strum(serialize = "RFTI-10B")]
    Rfti10b,
    #[strum(serialize = "GTR3-50")]
    Gtr3_50,
    #[strum(serialize = "GSB3-90SX")]
    Gsb3_90sx,
    #[strum(serialize = "FA3-612M")]
    Fa3_612m,
    #[strum(serialize = "RFATV-2")]
    Rfatv2,
    #[strum(serialize = "JA3-018M")]
    Ja3_018m,
    #[strum(serialize = "RFJA-12")]
    Rfja12,
    #[strum(serialize = "RFGB-40")]
    Rfgb40,
}

impl InelsType {
    /// The platform the device itself is registered under.
    pub fn platform(self) -> Platform {
        match self {
            Self::Rfsc61 | Self::Sa3_01b => Platform::Switch,
            Self::Da3_22m | Self::Dcda33m => Platform::Light,
            Self::Rfti10b | Self::Gtr3_50 | Self::Gsb3_90sx => Platform::Sensor,
            Self::Fa3_612m => Platform::Select,
            Self::Rfatv2 => Platform::Climate,
            Self::Ja3_018m | Self::Rfja12 => Platform::Cover,
            Self::Rfgb40 => Platform::Button,
        }
    }

    /// Whether devices of this type report the family of `state`.
    pub fn accepts(self, state: &DeviceState) -> bool {
        use DeviceState as S;
        match self {
            Self::Rfsc61 => matches!(state, S::RfSwitch { .. }),
            Self::Sa3_01b => matches!(state, S::BusSwitch { .. }),
            Self::Da3_22m => matches!(state, S::BusDimmer { .. }),
            Self::Dcda33m => matches!(state, S::DaliDimmer { .. }),
            Self::Rfti10b => matches!(state, S::RfTemperature { .. }),
            Self::Gtr3_50 => matches!(state, S::Multisensor { .. }),
            Self::Gsb3_90sx => matches!(state, S::GlassController { .. }),
            Self::Fa3_612m => matches!(state, S::FanCoil { .. }),
            Self::Rfatv2 => matches!(state, S::Thermovalve { .. }),
            Self::Ja3_018m => matches!(state, S::Shutters { .. }),
            Self::Rfja12 => matches!(state, S::Shutters { shutters } if shutters.len() == 1),
            Self::Rfgb40 => matches!(state, S::RfButton { .. }),
        }
    }
}

impl serde::Serialize for InelsType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for InelsType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| serde::de::Error::custom(format_args!("unknown iNELS type {name:?}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, serde::Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    BinarySensor,
    Button,
    Climate,
    Cover,
    Light,
    Select,
    Sensor,
    Switch,
}

/// Kinds of channels a device state can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Relay,
    RelayOverflow,
    /// Bus temperature sensor, 2-byte reading.
    Temperature,
    /// Dimmer output level.
    Output,
    ThermalOverloadAlarm,
    CurrentOverloadAlarm,
    Dali,
    AnalogOutput,
    DaliPowerAlert,
    DaliCommunicationAlert,
    /// RF battery flag.
    Battery,
    /// RF internal temperature.
    TemperatureIn,
    /// RF external temperature.
    TemperatureOut,
    /// 4-byte reading.
    LightIntensity,
    AnalogTemperature,
    Humidity,
    DewPoint,
    Proximity,
    Button,
    FanSpeed,
    Climate,
    Shutter,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::VariantNames,
    strum::IntoStaticStr,
    strum::EnumString,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum FanSpeed {
    #[strum(serialize = "Off")]
    Off = 0,
    #[strum(serialize = "Speed 1")]
    Speed1 = 1,
    #[strum(serialize = "Speed 2")]
    Speed2 = 2,
    #[strum(serialize = "Speed 3")]
    Speed3 = 3,
}

impl TryFrom<u8> for FanSpeed {
    type Error = String;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        <Self as num_traits::FromPrimitive>::from_u8(value)
            .ok_or_else(|| format!("fan speed {value} is out of range 0..=3"))
    }
}

impl From<FanSpeed> for u8 {
    fn from(value: FanSpeed) -> Self {
        num_traits::ToPrimitive::to_u8(&value).unwrap_or_default()
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShutterState {
    Open,
    Closed,
    StopUp,
    StopDown,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClimateState {
    /// Measured temperature in °C.
    pub current: f64,
    /// Requested temperature in °C.
    pub required: f64,
}

/// State reported by a device, one variant per device family.
///
/// Raw sensor channels keep the hexadecimal reading as received; they are decoded by the
/// entities that display them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, strum::IntoStaticStr)]
#[serde(tag = "family", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceState {
    RfSwitch {
        on: bool,
    },
    BusSwitch {
        on: bool,
        #[serde(default)]
        relay_overflow: bool,
        temperature: String,
    },
    BusDimmer {
        out: Vec<u8>,
        #[serde(default)]
        toa: Vec<bool>,
        #[serde(default)]
        coa: Vec<bool>,
        temperature: String,
    },
    DaliDimmer {
        dali: Vec<u8>,
        #[serde(default)]
        aout: Vec<u8>,
        #[serde(default)]
        alert_dali_power: bool,
        #[serde(default)]
        alert_dali_communication: bool,
    },
    RfTemperature {
        frame: String,
    },
    Multisensor {
        temp_in: String,
        light_in: String,
        ain: String,
        humidity: String,
        dew_point: String,
    },
    GlassController {
        buttons: Vec<bool>,
        prox: bool,
        temp_in: String,
        light_in: String,
        ain: String,
        humidity: String,
        dew_point: String,
    },
    FanCoil {
        fan_speed: FanSpeed,
    },
    Thermovalve {
        climate: ClimateState,
    },
    Shutters {
        shutters: Vec<ShutterState>,
    },
    RfButton {
        amount: u8,
        number: u8,
        pressing: bool,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("{family} state has no {capability} channel {index}")]
    MissingChannel {
        family: &'static str,
        capability: Capability,
        index: usize,
    },
    #[error("could not extract {capability} out of the RF frame")]
    Frame {
        capability: Capability,
        #[source]
        source: DecodeError,
    },
}

impl DeviceState {
    pub fn family(&self) -> &'static str {
        self.into()
    }

    fn missing(&self, capability: Capability, index: usize) -> StateError {
        StateError::MissingChannel {
            family: self.family(),
            capability,
            index,
        }
    }

    /// Number of channels of `capability` this state declares.
    pub fn channels(&self, capability: Capability) -> usize {
        use Capability as C;
        use DeviceState as S;
        match (self, capability) {
            (S::RfSwitch { .. }, C::Relay) => 1,
            // SA3-01B reports its temperature but exposes no sensor for it.
            (S::BusSwitch { .. }, C::Relay | C::RelayOverflow) => 1,
            (S::BusDimmer { out, .. }, C::Output) => out.len(),
            (S::BusDimmer { toa, .. }, C::ThermalOverloadAlarm) => toa.len(),
            (S::BusDimmer { coa, .. }, C::CurrentOverloadAlarm) => coa.len(),
            (S::BusDimmer { .. }, C::Temperature) => 1,
            (S::DaliDimmer { dali, .. }, C::Dali) => dali.len(),
            (S::DaliDimmer { aout, .. }, C::AnalogOutput) => aout.len(),
            (S::DaliDimmer { .. }, C::DaliPowerAlert | C::DaliCommunicationAlert) => 1,
            (S::RfTemperature { .. }, C::Battery | C::TemperatureIn | C::TemperatureOut) => 1,
            (
                S::Multisensor { .. } | S::GlassController { .. },
                C::Temperature
                | C::LightIntensity
                | C::AnalogTemperature
                | C::Humidity
                | C::DewPoint,
            ) => 1,
            (S::GlassController { .. }, C::Proximity) => 1,
            (S::GlassController { buttons, .. }, C::Button) => buttons.len(),
            (S::FanCoil { .. }, C::FanSpeed) => 1,
            (S::Thermovalve { .. }, C::Climate) => 1,
            (S::Shutters { shutters }, C::Shutter) => shutters.len(),
            (S::RfButton { amount, .. }, C::Button) => usize::from(*amount),
            _ => 0,
        }
    }

    fn flag_slot(&self, capability: Capability, index: usize) -> Option<&bool> {
        use Capability as C;
        use DeviceState as S;
        let first = index == 0;
        match (self, capability) {
            (S::RfSwitch { on } | S::BusSwitch { on, .. }, C::Relay) => first.then_some(on),
            (S::BusSwitch { relay_overflow, .. }, C::RelayOverflow) => {
                first.then_some(relay_overflow)
            }
            (S::BusDimmer { toa, .. }, C::ThermalOverloadAlarm) => toa.get(index),
            (S::BusDimmer { coa, .. }, C::CurrentOverloadAlarm) => coa.get(index),
            (S::DaliDimmer { alert_dali_power, .. }, C::DaliPowerAlert) => {
                first.then_some(alert_dali_power)
            }
            (S::DaliDimmer { alert_dali_communication, .. }, C::DaliCommunicationAlert) => {
                first.then_some(alert_dali_communication)
            }
            (S::GlassController { prox, .. }, C::Proximity) => first.then_some(prox),
            (S::GlassController { buttons, .. }, C::Button) => buttons.get(index),
            _ => None,
        }
    }

    fn flag_slot_mut(&mut self, capability: Capability, index: usize) -> Option<&mut bool> {
        use Capability as C;
        use DeviceState as S;
        let first = index == 0;
        match (self, capability) {
            (S::RfSwitch { on } | S::BusSwitch { on, .. }, C::Relay) => first.then_some(on),
            (S::BusSwitch { relay_overflow, .. }, C::RelayOverflow) => {
                first.then_some(relay_overflow)
            }
            (S::BusDimmer { toa, .. }, C::ThermalOverloadAlarm) => toa.get_mut(index),
            (S::BusDimmer { coa, .. }, C::CurrentOverloadAlarm) => coa.get_mut(index),
            (S::DaliDimmer { alert_dali_power, .. }, C::DaliPowerAlert) => {
                first.then_some(alert_dali_power)
            }
            (S::DaliDimmer { alert_dali_communication, .. }, C::DaliCommunicationAlert) => {
                first.then_some(alert_dali_communication)
            }
            (S::GlassController { prox, .. }, C::Proximity) => first.then_some(prox),
            (S::GlassController { buttons, .. }, C::Button) => buttons.get_mut(index),
            _ => None,
        }
    }

    /// Read a boolean channel.
    ///
    /// RF buttons report which button is being pressed rather than a flag per button; button
    /// `index` reads as set while button number `index + 1` is pressed.
    pub fn flag(&self, capability: Capability, index: usize) -> Result<bool, StateError> {
        if let (Self::RfButton { amount, number, pressing }, Capability::Button) =
            (self, capability)
        {
            if index >= usize::from(*amount) {
                return Err(self.missing(capability, index));
            }
            return Ok(*pressing && usize::from(*number) == index + 1);
        }
        self.flag_slot(capability, index)
            .copied()
            .ok_or_else(|| self.missing(capability, index))
    }

    pub fn set_flag(
        &mut self,
        capability: Capability,
        index: usize,
        value: bool,
    ) -> Result<(), StateError> {
        match self.flag_slot_mut(capability, index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.missing(capability, index)),
        }
    }

    fn levels(&self, capability: Capability) -> Option<&[u8]> {
        match (self, capability) {
            (Self::BusDimmer { out, .. }, Capability::Output) => Some(out),
            (Self::DaliDimmer { dali, .. }, Capability::Dali) => Some(dali),
            (Self::DaliDimmer { aout, .. }, Capability::AnalogOutput) => Some(aout),
            _ => None,
        }
    }

    fn levels_mut(&mut self, capability: Capability) -> Option<&mut Vec<u8>> {
        match (self, capability) {
            (Self::BusDimmer { out, .. }, Capability::Output) => Some(out),
            (Self::DaliDimmer { dali, .. }, Capability::Dali) => Some(dali),
            (Self::DaliDimmer { aout, .. }, Capability::AnalogOutput) => Some(aout),
            _ => None,
        }
    }

    /// Output level in percent.
    pub fn level(&self, capability: Capability, index: usize) -> Result<u8, StateError> {
        self.levels(capability)
            .and_then(|levels| levels.get(index))
            .copied()
            .ok_or_else(|| self.missing(capability, index))
    }

    pub fn set_level(
        &mut self,
        capability: Capability,
        index: usize,
        level: u8,
    ) -> Result<(), StateError> {
        match self.levels_mut(capability).and_then(|levels| levels.get_mut(index)) {
            Some(slot) => {
                *slot = level.min(100);
                Ok(())
            }
            None => Err(self.missing(capability, index)),
        }
    }

    /// The hexadecimal reading of a raw sensor channel.
    pub fn raw(&self, capability: Capability) -> Result<String, StateError> {
        use Capability as C;
        use DeviceState as S;
        let from_frame = |frame: &str, indexes: &[usize]| {
            raw_value::select_bytes(frame, indexes)
                .map_err(|source| StateError::Frame { capability, source })
        };
        match (self, capability) {
            (
                S::BusSwitch { temperature, .. } | S::BusDimmer { temperature, .. },
                C::Temperature,
            ) => Ok(temperature.clone()),
            (S::RfTemperature { frame }, C::Battery) => from_frame(frame, RFTI_10B_BATTERY),
            (S::RfTemperature { frame }, C::TemperatureIn) => from_frame(frame, RFTI_10B_TEMP_IN),
            (S::RfTemperature { frame }, C::TemperatureOut) => from_frame(frame, RFTI_10B_TEMP_OUT),
            (
                S::Multisensor { temp_in, light_in, ain, humidity, dew_point }
                | S::GlassController { temp_in, light_in, ain, humidity, dew_point, .. },
                _,
            ) => match capability {
                C::Temperature => Ok(temp_in.clone()),
                C::LightIntensity => Ok(light_in.clone()),
                C::AnalogTemperature => Ok(ain.clone()),
                C::Humidity => Ok(humidity.clone()),
                C::DewPoint => Ok(dew_point.clone()),
                _ => Err(self.missing(capability, 0)),
            },
            _ => Err(self.missing(capability, 0)),
        }
    }

    pub fn shutter(&self, index: usize) -> Result<ShutterState, StateError> {
        let shutter = match self {
            Self::Shutters { shutters } => shutters.get(index).copied(),
            _ => None,
        };
        shutter.ok_or_else(|| self.missing(Capability::Shutter, index))
    }

    pub fn set_shutter(&mut self, index: usize, value: ShutterState) -> Result<(), StateError> {
        if let Self::Shutters { shutters } = self {
            if let Some(slot) = shutters.get_mut(index) {
                *slot = value;
                return Ok(());
            }
        }
        Err(self.missing(Capability::Shutter, index))
    }

    pub fn climate(&self) -> Result<ClimateState, StateError> {
        match self {
            Self::Thermovalve { climate } => Ok(*climate),
            _ => Err(self.missing(Capability::Climate, 0)),
        }
    }

    pub fn set_required_temperature(&mut self, required: f64) -> Result<(), StateError> {
        match self {
            Self::Thermovalve { climate } => {
                climate.required = required;
                Ok(())
            }
            _ => Err(self.missing(Capability::Climate, 0)),
        }
    }

    pub fn fan_speed(&self) -> Result<FanSpeed, StateError> {
        match self {
            Self::FanCoil { fan_speed } => Ok(*fan_speed),
            _ => Err(self.missing(Capability::FanSpeed, 0)),
        }
    }

    pub fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<(), StateError> {
        match self {
            Self::FanCoil { fan_speed } => {
                *fan_speed = speed;
                Ok(())
            }
            _ => Err(self.missing(Capability::FanSpeed, 0)),
        }
    }
}

pub type WriteError = Box<dyn std::error::Error + Send + Sync>;

/// Applies state to a physical device.
///
/// Implementations deliver the state to the device; the device reports the state it ended up
/// in through [`Device::update`] later on.
pub trait StateWriter: Send + Sync {
    fn write(&self, unique_id: &str, state: &DeviceState) -> Result<(), WriteError>;
}

impl<F> StateWriter for F
where
    F: Fn(&str, &DeviceState) -> Result<(), WriteError> + Send + Sync,
{
    fn write(&self, unique_id: &str, state: &DeviceState) -> Result<(), WriteError> {
        self(unique_id, state)
    }
}

/// A [`StateWriter`] that keeps everything written to it.
#[derive(Default)]
pub struct RecordingWriter {
    written: Mutex<Vec<(String, DeviceState)>>,
}

impl RecordingWriter {
    pub fn take(&self) -> Vec<(String, DeviceState)> {
        std::mem::take(&mut *self.written.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl StateWriter for RecordingWriter {
    fn write(&self, unique_id: &str, state: &DeviceState) -> Result<(), WriteError> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((unique_id.to_string(), state.clone()));
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("device {0} is not available")]
    Unavailable(String),
    #[error("{inels_type} devices do not report {family} state")]
    StateMismatch {
        inels_type: InelsType,
        family: &'static str,
    },
    #[error("could not write state to device {unique_id}")]
    Write {
        unique_id: String,
        #[source]
        source: WriteError,
    },
    #[error(transparent)]
    State(#[from] StateError),
}

struct States {
    current: DeviceState,
    last: Option<DeviceState>,
}

/// A device shared between the entities created for it.
pub struct Device {
    unique_id: String,
    title: String,
    inels_type: InelsType,
    available: AtomicBool,
    states: RwLock<States>,
    writer: Arc<dyn StateWriter>,
}

impl Device {
    pub fn new(
        unique_id: impl Into<String>,
        title: impl Into<String>,
        inels_type: InelsType,
        state: DeviceState,
        writer: Arc<dyn StateWriter>,
    ) -> Result<Self, Error> {
        if !inels_type.accepts(&state) {
            return Err(Error::StateMismatch {
                inels_type,
                family: state.family(),
            });
        }
        Ok(Self {
            unique_id: unique_id.into(),
            title: title.into(),
            inels_type,
            available: AtomicBool::new(true),
            states: RwLock::new(States {
                current: state,
                last: None,
            }),
            writer,
        })
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn inels_type(&self) -> InelsType {
        self.inels_type
    }

    pub fn platform(&self) -> Platform {
        self.inels_type.platform()
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.states.read().unwrap_or_else(PoisonError::into_inner).current)
    }

    pub fn state(&self) -> DeviceState {
        self.with_state(DeviceState::clone)
    }

    /// The state the device was in before the most recent update.
    pub fn last_state(&self) -> Option<DeviceState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last
            .clone()
    }

    /// Record a state reported by the device.
    pub fn update(&self, state: DeviceState) -> Result<(), Error> {
        if !self.inels_type.accepts(&state) {
            return Err(Error::StateMismatch {
                inels_type: self.inels_type,
                family: state.family(),
            });
        }
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut states.current, state);
        states.last = Some(previous);
        Ok(())
    }

    /// Push `state` to the device.
    ///
    /// The local state is left as is until the device reports back.
    pub fn write(&self, state: &DeviceState) -> Result<(), Error> {
        if !self.is_available() {
            return Err(Error::Unavailable(self.unique_id.clone()));
        }
        tracing::debug!(device = %self.unique_id, family = state.family(), "writing device state");
        self.writer
            .write(&self.unique_id, state)
            .map_err(|source| Error::Write {
                unique_id: self.unique_id.clone(),
                source,
            })
    }

    /// Apply `change` to a copy of the current state and write the result to the device.
    pub fn modify(
        &self,
        change: impl FnOnce(&mut DeviceState) -> Result<(), StateError>,
    ) -> Result<DeviceState, Error> {
        let mut state = self.state();
        change(&mut state)?;
        self.write(&state)?;
        Ok(state)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("unique_id", &self.unique_id)
            .field("title", &self.title)
            .field("inels_type", &self.inels_type)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

fn available_by_default() -> bool {
    true
}

/// Serialized description of a device, as found in device files.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DeviceRecord {
    pub unique_id: String,
    pub title: String,
    pub inels_type: InelsType,
    #[serde(default = "available_by_default")]
    pub available: bool,
    pub state: DeviceState,
}

impl DeviceRecord {
    pub fn into_device(self, writer: Arc<dyn StateWriter>) -> Result<Device, Error> {
        let device = Device::new(self.unique_id, self.title, self.inels_type, self.state, writer)?;
        device.set_available(self.available);
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimmer() -> DeviceState {
        DeviceState::BusDimmer {
            out: vec![0, 40],
            toa: vec![false, true],
            coa: vec![false, false],
            temperature: "0898".into(),
        }
    }

    #[test]
    fn channel_counts() {
        let state = dimmer();
        assert_eq!(state.channels(Capability::Output), 2);
        assert_eq!(state.channels(Capability::ThermalOverloadAlarm), 2);
        assert_eq!(state.channels(Capability::Temperature), 1);
        assert_eq!(state.channels(Capability::Relay), 0);
        assert_eq!(state.channels(Capability::Dali), 0);
        let button = DeviceState::RfButton { amount: 4, number: 2, pressing: true };
        assert_eq!(button.channels(Capability::Button), 4);
    }

    #[test]
    fn levels() {
        let mut state = dimmer();
        assert_eq!(state.level(Capability::Output, 1).unwrap(), 40);
        state.set_level(Capability::Output, 0, 120).unwrap();
        assert_eq!(state.level(Capability::Output, 0).unwrap(), 100);
        assert!(matches!(
            state.level(Capability::Output, 2),
            Err(StateError::MissingChannel { family: "bus_dimmer", index: 2, .. })
        ));
        assert!(state.set_level(Capability::Dali, 0, 1).is_err());
    }

    #[test]
    fn flags() {
        let mut state = dimmer();
        assert!(state.flag(Capability::ThermalOverloadAlarm, 1).unwrap());
        assert!(!state.flag(Capability::CurrentOverloadAlarm, 0).unwrap());
        assert!(state.flag(Capability::Relay, 0).is_err());
        let mut switch = DeviceState::RfSwitch { on: false };
        switch.set_flag(Capability::Relay, 0, true).unwrap();
        assert_eq!(switch, DeviceState::RfSwitch { on: true });
        assert!(switch.set_flag(Capability::Relay, 1, true).is_err());
        state.set_flag(Capability::ThermalOverloadAlarm, 1, false).unwrap();
        assert!(!state.flag(Capability::ThermalOverloadAlarm, 1).unwrap());
    }

    #[test]
    fn single_flags() {
        let mut switch =
            DeviceState::BusSwitch { on: true, relay_overflow: false, temperature: "0898".into() };
        switch.set_flag(Capability::RelayOverflow, 0, true).unwrap();
        assert!(switch.flag(Capability::RelayOverflow, 0).unwrap());
        assert!(switch.flag(Capability::RelayOverflow, 1).is_err());
        assert!(switch.set_flag(Capability::Relay, 1, false).is_err());
        assert!(switch.flag(Capability::Relay, 0).unwrap());

        let mut dali = DeviceState::DaliDimmer {
            dali: vec![0],
            aout: vec![],
            alert_dali_power: false,
            alert_dali_communication: false,
        };
        dali.set_flag(Capability::DaliPowerAlert, 0, true).unwrap();
        dali.set_flag(Capability::DaliCommunicationAlert, 0, true).unwrap();
        assert!(dali.flag(Capability::DaliPowerAlert, 0).unwrap());
        assert!(dali.flag(Capability::DaliCommunicationAlert, 0).unwrap());
        assert!(dali.set_flag(Capability::DaliPowerAlert, 1, true).is_err());

        let mut glass = DeviceState::GlassController {
            buttons: vec![false; 2],
            prox: false,
            temp_in: "0898".into(),
            light_in: "00000000".into(),
            ain: "7FFF".into(),
            humidity: "1388".into(),
            dew_point: "03E8".into(),
        };
        glass.set_flag(Capability::Proximity, 0, true).unwrap();
        assert!(glass.flag(Capability::Proximity, 0).unwrap());
        assert!(glass.set_flag(Capability::Proximity, 1, true).is_err());
        glass.set_flag(Capability::Button, 1, true).unwrap();
        assert!(glass.flag(Capability::Button, 1).unwrap());
    }

    #[test]
    fn rf_buttons() {
        let state = DeviceState::RfButton { amount: 4, number: 2, pressing: true };
        assert!(!state.flag(Capability::Button, 0).unwrap());
        assert!(state.flag(Capability::Button, 1).unwrap());
        assert!(state.flag(Capability::Button, 4).is_err());
        let released = DeviceState::RfButton { amount: 4, number: 2, pressing: false };
        assert!(!released.flag(Capability::Button, 1).unwrap());
    }

    #[test]
    fn raw_channels() {
        let rf = DeviceState::RfTemperature { frame: "00\n0A\n08\n6B\n07\n".into() };
        assert_eq!(rf.raw(Capability::Battery).unwrap(), "00");
        assert_eq!(rf.raw(Capability::TemperatureIn).unwrap(), "080A");
        assert_eq!(rf.raw(Capability::TemperatureOut).unwrap(), "076B");
        let short = DeviceState::RfTemperature { frame: "00\n0A\n".into() };
        assert!(matches!(
            short.raw(Capability::TemperatureOut),
            Err(StateError::Frame { capability: Capability::TemperatureOut, .. })
        ));
        assert_eq!(dimmer().raw(Capability::Temperature).unwrap(), "0898");
        assert!(dimmer().raw(Capability::Humidity).is_err());
    }

    #[test]
    fn type_accepts_family() {
        assert!(InelsType::Da3_22m.accepts(&dimmer()));
        assert!(!InelsType::Rfsc61.accepts(&dimmer()));
        let two = DeviceState::Shutters { shutters: vec![ShutterState::Open; 2] };
        assert!(InelsType::Ja3_018m.accepts(&two));
        assert!(!InelsType::Rfja12.accepts(&two));
    }

    #[test]
    fn update_keeps_previous_state() {
        let device = Device::new(
            "dimmer-1",
            "Hall",
            InelsType::Da3_22m,
            dimmer(),
            Arc::new(RecordingWriter::default()),
        )
        .unwrap();
        assert_eq!(device.last_state(), None);
        let mut next = dimmer();
        next.set_level(Capability::Output, 0, 75).unwrap();
        device.update(next.clone()).unwrap();
        assert_eq!(device.state(), next);
        assert_eq!(device.last_state(), Some(dimmer()));
        assert!(matches!(
            device.update(DeviceState::RfSwitch { on: true }),
            Err(Error::StateMismatch { family: "rf_switch", .. })
        ));
    }

    #[test]
    fn write_goes_through_writer() {
        let writer = Arc::new(RecordingWriter::default());
        let device = Device::new(
            "switch-1",
            "Socket",
            InelsType::Rfsc61,
            DeviceState::RfSwitch { on: false },
            writer.clone(),
        )
        .unwrap();
        let written = device.modify(|s| s.set_flag(Capability::Relay, 0, true)).unwrap();
        assert_eq!(written, DeviceState::RfSwitch { on: true });
        // Local state only changes once the device reports back.
        assert_eq!(device.state(), DeviceState::RfSwitch { on: false });
        assert_eq!(writer.take(), vec![("switch-1".to_string(), written)]);

        device.set_available(false);
        assert!(matches!(device.write(&device.state()), Err(Error::Unavailable(_))));
        assert!(writer.take().is_empty());
    }

    #[test]
    fn write_errors_are_reported() {
        let failing =
            |_: &str, _: &DeviceState| -> Result<(), WriteError> { Err("broker gone".into()) };
        let device = Device::new(
            "switch-1",
            "Socket",
            InelsType::Rfsc61,
            DeviceState::RfSwitch { on: false },
            Arc::new(failing),
        )
        .unwrap();
        let error = device.write(&device.state()).unwrap_err();
        assert!(matches!(error, Error::Write { .. }));
        assert_eq!(
            std::error::Error::source(&error).map(ToString::to_string),
            Some("broker gone".to_string())
        );
    }

    #[test]
    fn records_from_json() {
        let records: Vec<DeviceRecord> = serde_json::from_str(
            r#"[
                {"unique_id": "fan", "title": "Fan coil", "inels_type": "FA3-612M",
                 "state": {"family": "fan_coil", "fan_speed": 2}},
                {"unique_id": "valve", "title": "Valve", "inels_type": "RFATV-2",
                 "available": false, "state": {"family": "thermovalve",
                           "climate": {"current": 19.5, "required": 22.0}}}
            ]"#,
        )
        .unwrap();
        assert_eq!(records[0].inels_type, InelsType::Fa3_612m);
        assert_eq!(records[0].state, DeviceState::FanCoil { fan_speed: FanSpeed::Speed2 });
        assert!(records[0].available);
        let valve = records[1].clone().into_device(Arc::new(RecordingWriter::default())).unwrap();
        assert!(!valve.is_available());
        assert_eq!(valve.state().climate().unwrap().required, 22.0);

        assert!(serde_json::from_str::<DeviceRecord>(
            r#"{"unique_id": "x", "title": "x", "inels_type": "XYZ-1",
                "state": {"family": "rf_switch", "on": true}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<DeviceState>(r#"{"family": "fan_coil", "fan_speed": 7}"#)
            .is_err());
    }

    #[test]
    fn fan_speed_names() {
        use strum::VariantNames as _;
        assert_eq!(FanSpeed::VARIANTS, &["Off", "Speed 1", "Speed 2", "Speed 3"]);
        assert_eq!("Speed 3".parse::<FanSpeed>().unwrap(), FanSpeed::Speed3);
        assert_eq!(u8::from(FanSpeed::Speed2), 2);
        assert_eq!(serde_json::to_string(&FanSpeed::Speed1).unwrap(), "1");
    }
}
