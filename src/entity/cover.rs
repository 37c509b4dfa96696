//! Shutter units.

use std::sync::Arc;

use crate::device::{Capability, Device, Platform, ShutterState};
use crate::entity::{
    channels, Entity, EntityBase, EntityCommand, Error, ICON_SHUTTER_CLOSED, ICON_SHUTTER_OPEN,
};

pub const DEVICE_CLASS: &str = "shutter";

pub fn discover(device: &Arc<Device>) -> Vec<Cover> {
    let shutters = channels(device, Capability::Shutter);
    let single = shutters.len() == 1;
    shutters.map(|index| Cover::new(device, index, single)).collect()
}

pub struct Cover {
    base: EntityBase,
    index: usize,
}

impl Cover {
    /// `single` covers of one-shutter devices are not numbered.
    pub fn new(device: &Arc<Device>, index: usize, single: bool) -> Self {
        let base = if single {
            EntityBase::new(device, "shutter", "Shutter")
        } else {
            EntityBase::new(device, &format!("shutter{index}"), &format!("Shutter {}", index + 1))
        };
        Self { base, index }
    }

    pub fn is_closed(&self) -> Option<bool> {
        self.base
            .read(|state| state.shutter(self.index))
            .map(|shutter| shutter == ShutterState::Closed)
    }

    fn set(&self, shutter: ShutterState) -> Result<(), Error> {
        self.base
            .device
            .modify(|state| state.set_shutter(self.index, shutter))?;
        Ok(())
    }

    pub fn open(&self) -> Result<(), Error> {
        self.set(ShutterState::Open)
    }

    pub fn close(&self) -> Result<(), Error> {
        self.set(ShutterState::Closed)
    }

    /// Stop in the direction opposite of the current state.
    pub fn stop(&self) -> Result<(), Error> {
        let stop = if self.is_closed() == Some(true) {
            ShutterState::StopUp
        } else {
            ShutterState::StopDown
        };
        self.set(stop)
    }
}

impl Entity for Cover {
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
        Platform::Cover
    }
    fn icon(&self) -> Option<&'static str> {
        Some(if self.is_closed() == Some(true) { ICON_SHUTTER_CLOSED } else { ICON_SHUTTER_OPEN })
    }
    fn state(&self) -> Option<String> {
        self.is_closed().map(|closed| if closed { "closed" } else { "open" }.to_string())
    }
    fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![("device_class", DEVICE_CLASS.to_string())]
    }

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        match command {
            EntityCommand::Open => self.open(),
            EntityCommand::Close => self.close(),
            EntityCommand::Stop => self.stop(),
            _ => Err(self.base.unsupported(Platform::Cover, command)),
        }
    }
}
