use std::sync::Arc;

use inels_tools::device::{Device, DeviceState, InelsType, RecordingWriter, ShutterState};
use inels_tools::entity::{self, EntityCommand};
use inels_tools::raw_value::SensorFault;

fn glass_controller(temp_in: &str, buttons: [bool; 2]) -> DeviceState {
    DeviceState::GlassController {
        buttons: buttons.to_vec(),
        prox: false,
        temp_in: temp_in.into(),
        light_in: "00000000".into(),
        ain: "7FFF".into(),
        humidity: "1388".into(),
        dew_point: "03E8".into(),
    }
}

#[test]
fn entities_follow_device_updates() {
    let writer = Arc::new(RecordingWriter::default());
    let device = Arc::new(
        Device::new(
            "gsb",
            "Kitchen",
            InelsType::Gsb3_90sx,
            glass_controller("0898", [false, false]),
            writer.clone(),
        )
        .unwrap(),
    );
    let mut entities = entity::discover(&device);
    fn state_of(entities: &[Box<dyn entity::Entity>], id: &str) -> (Option<String>, bool) {
        let entity = entities.iter().find(|e| e.unique_id() == id).unwrap();
        (entity.state(), entity.available())
    }

    assert_eq!(state_of(&entities, "gsb-prox"), (Some("off".into()), true));
    assert_eq!(state_of(&entities, "gsb-2"), (Some("no_action".into()), true));
    assert_eq!(state_of(&entities, "gsb-temp_in"), (Some("22".into()), true));
    assert_eq!(state_of(&entities, "gsb-ain").1, false);

    device
        .update(glass_controller("7FFE", [false, true]))
        .unwrap();
    for entity in &mut entities {
        entity.on_state_change();
    }
    assert_eq!(state_of(&entities, "gsb-2"), (Some("press".into()), true));
    let temperature = entities.iter().find(|e| e.unique_id() == "gsb-temp_in").unwrap();
    assert!(!temperature.available());
    assert!(temperature
        .attributes()
        .contains(&("fault", SensorFault::MeasurementError.meaning().to_string())));

    let button = entities.iter().find(|e| e.unique_id() == "gsb-1").unwrap();
    button.execute(&EntityCommand::Press).unwrap();
    assert!(writer.take().is_empty());
}

#[test]
fn rf_shutter_round_trip() {
    let writer = Arc::new(RecordingWriter::default());
    let device = Arc::new(
        Device::new(
            "blind",
            "Blind",
            InelsType::Rfja12,
            DeviceState::Shutters { shutters: vec![ShutterState::Open] },
            writer.clone(),
        )
        .unwrap(),
    );
    let entities = entity::discover(&device);
    assert_eq!(entities.len(), 1);
    entities[0].execute(&EntityCommand::Close).unwrap();
    let (id, state) = writer.take().remove(0);
    assert_eq!(id, "blind");

    // The device reports back the state it was asked for.
    device.update(state).unwrap();
    assert_eq!(entities[0].state().as_deref(), Some("closed"));
    entities[0].execute(&EntityCommand::Stop).unwrap();
    assert_eq!(
        writer.take()[0].1,
        DeviceState::Shutters { shutters: vec![ShutterState::StopUp] }
    );

    // RFJA-12 controls exactly one shutter.
    assert!(device
        .update(DeviceState::Shutters { shutters: vec![ShutterState::Open; 2] })
        .is_err());
}
