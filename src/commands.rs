use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::device::{self, Device, DeviceRecord, StateWriter};

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not read the device file at {1:?}")]
    ReadFile(#[source] std::io::Error, PathBuf),
    #[error("could not parse the device file at {1:?}")]
    Parse(#[source] serde_json::Error, PathBuf),
    #[error("device {1} is not valid")]
    Device(#[source] device::Error, String),
}

/// Load the devices described by a JSON file holding a list of [`DeviceRecord`]s.
pub fn load_devices(
    path: &Path,
    writer: Arc<dyn StateWriter>,
) -> Result<Vec<Arc<Device>>, LoadError> {
    let data = std::fs::read(path).map_err(|e| LoadError::ReadFile(e, path.into()))?;
    let records: Vec<DeviceRecord> =
        serde_json::from_slice(&data).map_err(|e| LoadError::Parse(e, path.into()))?;
    tracing::debug!(path = ?path, count = records.len(), "loaded device records");
    records
        .into_iter()
        .map(|record| {
            let unique_id = record.unique_id.clone();
            record
                .into_device(Arc::clone(&writer))
                .map(Arc::new)
                .map_err(|e| LoadError::Device(e, unique_id))
        })
        .collect()
}

pub mod decode {
    use crate::raw_value::{self, DecodeError};

    /// Decode raw hexadecimal sensor readings.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: crate::output::Args,
        /// Readings as reported by the devices, e.g. `0898` or `7FFF`.
        #[arg(required = true)]
        readings: Vec<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not decode the reading {1:?}")]
        Decode(#[source] DecodeError, String),
        #[error("could not output the decoded readings")]
        Output(#[source] crate::output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct DecodedReading<'a> {
        pub reading: &'a str,
        pub value: f64,
        pub faulted: bool,
        pub fault: Option<&'static str>,
    }

    pub fn run(args: Args) -> Result<(), Error> {
        // Check everything first so that nothing is output for bad input.
        let decoded = args
            .readings
            .iter()
            .map(|reading| {
                raw_value::decode(reading)
                    .map(|decoded| (reading.as_str(), decoded))
                    .map_err(|e| Error::Decode(e, reading.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut output = args.output.to_output().map_err(Error::Output)?;
        output
            .table_headers(vec!["Reading", "Value", "Faulted", "Fault"])
            .map_err(Error::Output)?;
        for (reading, decoded) in decoded {
            let fault = decoded.fault.map(|fault| fault.meaning());
            output
                .result(
                    || {
                        vec![
                            reading.to_string(),
                            decoded.value.to_string(),
                            decoded.faulted().to_string(),
                            fault.unwrap_or_default().to_string(),
                        ]
                    },
                    || DecodedReading {
                        reading,
                        value: decoded.value,
                        faulted: decoded.faulted(),
                        fault,
                    },
                )
                .map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod faults {
    use strum::VariantArray as _;

    use crate::raw_value::SensorFault;

    /// List the sentinel readings devices use to report sensor faults.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: crate::output::Args,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not output the fault table")]
        Output(#[source] crate::output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct FaultSchema {
        pub digit: u8,
        pub name: &'static str,
        pub sentinel_2_bytes: String,
        pub sentinel_4_bytes: String,
        pub meaning: &'static str,
    }

    impl From<SensorFault> for FaultSchema {
        fn from(fault: SensorFault) -> Self {
            Self {
                digit: fault.digit(),
                name: fault.into(),
                sentinel_2_bytes: fault.sentinel(4),
                sentinel_4_bytes: fault.sentinel(8),
                meaning: fault.meaning(),
            }
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let mut output = args.output.to_output().map_err(Error::Output)?;
        output
            .table_headers(vec!["Digit", "2 bytes", "4 bytes", "Meaning"])
            .map_err(Error::Output)?;
        for &fault in SensorFault::VARIANTS {
            let schema = FaultSchema::from(fault);
            output
                .result(
                    || {
                        vec![
                            format!("{:X}", schema.digit),
                            schema.sentinel_2_bytes.clone(),
                            schema.sentinel_4_bytes.clone(),
                            schema.meaning.to_string(),
                        ]
                    },
                    || &schema,
                )
                .map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod entities {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::device::{Platform, RecordingWriter};
    use crate::entity::{self, Entity, EntityCategory};

    /// Show the entities discovered for the devices in a device file.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: crate::output::Args,
        /// JSON file with a list of device records.
        devices: PathBuf,
        /// Only show entities whose id, name or platform contain this text.
        filter: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not load the devices")]
        Load(#[source] super::LoadError),
        #[error("could not output the entities")]
        Output(#[source] crate::output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct EntityRecord<'a> {
        pub unique_id: &'a str,
        pub device: &'a str,
        pub platform: Platform,
        pub name: &'a str,
        pub state: Option<String>,
        pub available: bool,
        pub icon: Option<&'static str>,
        pub entity_category: Option<EntityCategory>,
        pub attributes: BTreeMap<&'static str, String>,
    }

    impl<'a> EntityRecord<'a> {
        pub fn new(entity: &'a dyn Entity) -> Self {
            Self {
                unique_id: entity.unique_id(),
                device: entity.device().unique_id(),
                platform: entity.platform(),
                name: entity.name(),
                state: entity.state(),
                available: entity.available(),
                icon: entity.icon(),
                entity_category: entity.entity_category(),
                attributes: entity.attributes().into_iter().collect(),
            }
        }

        pub fn is_match(&self, pattern: &str) -> bool {
            let pattern = pattern.to_lowercase();
            self.unique_id.to_lowercase().contains(&pattern)
                || self.name.to_lowercase().contains(&pattern)
                || self.platform.to_string().contains(&pattern)
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        // Listing entities never writes to the devices.
        let devices = super::load_devices(&args.devices, Arc::new(RecordingWriter::default()))
            .map_err(Error::Load)?;
        let mut output = args.output.to_output().map_err(Error::Output)?;
        output
            .table_headers(vec!["Unique ID", "Platform", "Name", "State", "Available", "Icon"])
            .map_err(Error::Output)?;
        for device in &devices {
            for entity in entity::discover(device) {
                let record = EntityRecord::new(&*entity);
                if let Some(pattern) = &args.filter {
                    if !record.is_match(pattern) {
                        continue;
                    }
                }
                output
                    .result(
                        || {
                            vec![
                                record.unique_id.to_string(),
                                record.platform.to_string(),
                                record.name.to_string(),
                                record.state.clone().unwrap_or_default(),
                                record.available.to_string(),
                                record.icon.unwrap_or_default().to_string(),
                            ]
                        },
                        || &record,
                    )
                    .map_err(Error::Output)?;
            }
        }
        output.commit().map_err(Error::Output)
    }
}

pub mod command {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::device::{DeviceState, RecordingWriter};
    use crate::entity::{self, EntityCommand};

    #[derive(clap::Subcommand, Clone, Debug)]
    pub enum Action {
        /// Turn a light or a switch on.
        TurnOn {
            /// Brightness on the 0-255 scale. Lights go back to their previous level without it.
            #[arg(long, short = 'b')]
            brightness: Option<u8>,
        },
        /// Turn a light or a switch off.
        TurnOff,
        /// Open a shutter.
        Open,
        /// Close a shutter.
        Close,
        /// Stop a moving shutter.
        Stop,
        /// Set the temperature a thermovalve should reach.
        SetTemperature {
            /// Temperature in °C.
            temperature: f64,
        },
        /// Pick one of the options of a select.
        Select { option: String },
        /// Press a button.
        Press,
    }

    impl From<Action> for EntityCommand {
        fn from(action: Action) -> Self {
            match action {
                Action::TurnOn { brightness } => Self::TurnOn { brightness },
                Action::TurnOff => Self::TurnOff,
                Action::Open => Self::Open,
                Action::Close => Self::Close,
                Action::Stop => Self::Stop,
                Action::SetTemperature { temperature } => Self::SetTemperature(temperature),
                Action::Select { option } => Self::Select(option),
                Action::Press => Self::Press,
            }
        }
    }

    /// Run an action on an entity and output the state that would be written to the device.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: crate::output::Args,
        /// JSON file with a list of device records.
        devices: PathBuf,
        /// Unique ID of the entity, as listed by `entities`.
        entity: String,
        #[command(subcommand)]
        action: Action,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not load the devices")]
        Load(#[source] super::LoadError),
        #[error("no entity with the unique ID {0:?}")]
        UnknownEntity(String),
        #[error("could not run the action on {1}")]
        Execute(#[source] entity::Error, String),
        #[error("could not serialize the written state")]
        SerializeState(#[source] serde_json::Error),
        #[error("could not output the written state")]
        Output(#[source] crate::output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct WrittenState {
        pub device: String,
        pub state: DeviceState,
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let writer = Arc::new(RecordingWriter::default());
        let devices = super::load_devices(&args.devices, writer.clone()).map_err(Error::Load)?;
        let entity = devices
            .iter()
            .flat_map(entity::discover)
            .find(|entity| entity.unique_id() == args.entity)
            .ok_or_else(|| Error::UnknownEntity(args.entity.clone()))?;
        let command = EntityCommand::from(args.action);
        let action: &'static str = (&command).into();
        tracing::info!(entity = entity.unique_id(), action, "executing entity command");
        entity
            .execute(&command)
            .map_err(|e| Error::Execute(e, args.entity.clone()))?;

        let mut output = args.output.to_output().map_err(Error::Output)?;
        output
            .table_headers(vec!["Device", "State"])
            .map_err(Error::Output)?;
        for (device, state) in writer.take() {
            let json = serde_json::to_string(&state).map_err(Error::SerializeState)?;
            let written = WrittenState { device, state };
            output
                .result(|| vec![written.device.clone(), json], || &written)
                .map_err(Error::Output)?;
        }
        output.commit().map_err(Error::Output)
    }
}
