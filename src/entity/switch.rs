//! Relays exposed as switches.
//!
//! A switch stands for the whole device, so it carries the device's own id and title.

use std::sync::Arc;

use crate::device::{Capability, Device, Platform};
use crate::entity::{channels, Entity, EntityBase, EntityCommand, Error, ICON_SWITCH};

pub fn discover(device: &Arc<Device>) -> Vec<Switch> {
    channels(device, Capability::Relay)
        .map(|_| Switch::new(device))
        .collect()
}

pub struct Switch {
    base: EntityBase,
}

impl Switch {
    pub fn new(device: &Arc<Device>) -> Self {
        Self {
            base: EntityBase {
                device: Arc::clone(device),
                unique_id: device.unique_id().to_string(),
                name: device.title().to_string(),
            },
        }
    }

    pub fn is_on(&self) -> Option<bool> {
        self.base.read(|state| state.flag(Capability::Relay, 0))
    }

    /// Whether the relay reported an overflow. Relays without overflow detection never do.
    pub fn overflowed(&self) -> bool {
        let device = &self.base.device;
        !channels(device, Capability::RelayOverflow).is_empty()
            && device
                .with_state(|state| state.flag(Capability::RelayOverflow, 0))
                .unwrap_or(false)
    }

    fn set(&self, on: bool) -> Result<(), Error> {
        self.base
            .device
            .modify(|state| state.set_flag(Capability::Relay, 0, on))?;
        Ok(())
    }

    pub fn turn_on(&self) -> Result<(), Error> {
        self.set(true)
    }

    pub fn turn_off(&self) -> Result<(), Error> {
        self.set(false)
    }
}

impl Entity for Switch {
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
        Platform::Switch
    }
    fn icon(&self) -> Option<&'static str> {
        Some(ICON_SWITCH)
    }

    fn available(&self) -> bool {
        if self.overflowed() {
            tracing::warn!(entity = %self.base.unique_id, "relay overflow");
            return false;
        }
        self.base.device.is_available()
    }

    fn state(&self) -> Option<String> {
        self.is_on().map(|on| if on { "on" } else { "off" }.to_string())
    }

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        match command {
            // Relays have no brightness to set.
            EntityCommand::TurnOn { .. } => self.turn_on(),
            EntityCommand::TurnOff => self.turn_off(),
            _ => Err(self.base.unsupported(Platform::Switch, command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceState, InelsType};
    use crate::entity::tests::device;

    fn bus_switch(on: bool, relay_overflow: bool) -> DeviceState {
        DeviceState::BusSwitch {
            on,
            relay_overflow,
            temperature: "0898".into(),
        }
    }

    #[test]
    fn rf_switch() {
        let (unit, writer) = device(InelsType::Rfsc61, DeviceState::RfSwitch { on: false });
        let switches = discover(&unit);
        assert_eq!(switches.len(), 1);
        let switch = &switches[0];
        assert_eq!(switch.unique_id(), "dev");
        assert_eq!(switch.name(), "Device");
        assert_eq!(switch.state().as_deref(), Some("off"));
        assert!(switch.available());

        switch.execute(&EntityCommand::TurnOn { brightness: None }).unwrap();
        switch.turn_off().unwrap();
        let written = writer.take();
        assert_eq!(written[0], ("dev".to_string(), DeviceState::RfSwitch { on: true }));
        assert_eq!(written[1].1, DeviceState::RfSwitch { on: false });
        // Writes do not change the local state.
        assert_eq!(switch.is_on(), Some(false));
    }

    #[test]
    fn relay_overflow() {
        let (unit, writer) = device(InelsType::Sa3_01b, bus_switch(true, false));
        let switch = Switch::new(&unit);
        assert!(switch.available());
        switch.turn_off().unwrap();
        assert_eq!(writer.take()[0].1, bus_switch(false, false));

        unit.update(bus_switch(true, true)).unwrap();
        assert!(switch.overflowed());
        assert!(!switch.available());
        assert_eq!(switch.state().as_deref(), Some("on"));
    }

    #[test]
    fn bus_switch_has_no_temperature_sensor() {
        let (unit, _) = device(InelsType::Sa3_01b, bus_switch(false, false));
        let entities = crate::entity::discover(&unit);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].platform(), Platform::Switch);
        // The reading is still there for anyone asking for it.
        assert_eq!(unit.state().raw(Capability::Temperature).unwrap(), "0898");
    }

    #[test]
    fn unavailable_device() {
        let (unit, writer) = device(InelsType::Rfsc61, DeviceState::RfSwitch { on: true });
        unit.set_available(false);
        let switch = Switch::new(&unit);
        assert!(!switch.available());
        assert!(switch.turn_off().is_err());
        assert!(writer.take().is_empty());
    }
}
