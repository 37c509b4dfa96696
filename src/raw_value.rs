//! Decoding of raw hexadecimal sensor readings.
//!
//! Bus sensors report measurements as fixed width hexadecimal strings: 4 digits for 2-byte
//! channels (temperatures, humidity, dew point) and 8 digits for 4-byte channels (light
//! intensity). The number stored is the measurement multiplied by 100.
//!
//! The `7FF…` range is reserved by the firmware for fault reporting. A reading is a fault
//! sentinel when it starts with `7`, every digit between the first and the last one is `F` and
//! the last digit is one of `9` through `F`. The last digit then names the fault, see
//! [`SensorFault`].
//!
//! RF devices instead report a frame of newline separated hex bytes, out of which a reading is
//! assembled with [`select_bytes`].

/// Readings wider than this do not fit into a `u64`.
pub const MAX_DIGITS: usize = 16;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("the reading is empty")]
    Empty,
    #[error("reading {0:?} is too short, at least two digits are required")]
    TooShort(String),
    #[error("reading {0:?} has more than {MAX_DIGITS} digits")]
    TooLong(String),
    #[error("reading {0:?} is not a hexadecimal number")]
    NotHex(String),
    #[error("frame has no byte at index {index}, it is only {len} bytes long")]
    MissingByte { index: usize, len: usize },
}

/// Fault conditions a sensor can report in place of a measurement.
///
/// The discriminant is the hex digit the firmware puts at the end of the sentinel.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::FromRepr,
    strum::VariantArray,
    strum::IntoStaticStr,
)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum SensorFault {
    NotCommunicating = 0x9,
    NotCalibrated = 0xA,
    NoValue = 0xB,
    NotConfigured = 0xC,
    OutOfRange = 0xD,
    MeasurementError = 0xE,
    NoSensor = 0xF,
}

impl SensorFault {
    pub fn from_digit(digit: u8) -> Option<Self> {
        Self::from_repr(digit)
    }

    pub const fn digit(self) -> u8 {
        self as u8
    }

    pub const fn meaning(self) -> &'static str {
        match self {
            Self::NotCommunicating => "Sensor not communicating",
            Self::NotCalibrated => "Sensor not calibrated",
            Self::NoValue => "No value",
            Self::NotConfigured => "Sensor not configured",
            Self::OutOfRange => "Sensor value out of range",
            Self::MeasurementError => "Sensor measurement error",
            Self::NoSensor => "No sensor connected",
        }
    }

    /// The sentinel reading `digits` wide that reports this fault.
    pub fn sentinel(self, digits: usize) -> String {
        let mut sentinel = String::with_capacity(digits.max(2));
        sentinel.push('7');
        for _ in 2..digits {
            sentinel.push('F');
        }
        sentinel.push_str(&format!("{:X}", self.digit()));
        sentinel
    }
}

impl std::fmt::Display for SensorFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.meaning())
    }
}

/// A decoded reading.
///
/// `value` is computed even for fault sentinels. It is not meaningful while `fault` is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decoded {
    pub value: f64,
    pub fault: Option<SensorFault>,
}

impl Decoded {
    pub fn faulted(&self) -> bool {
        self.fault.is_some()
    }
}

/// Parse a whole reading as an unsigned base-16 integer.
pub fn parse_hex(reading: &str) -> Result<u64, DecodeError> {
    if reading.is_empty() {
        return Err(DecodeError::Empty);
    }
    if reading.len() > MAX_DIGITS {
        return Err(DecodeError::TooLong(reading.to_string()));
    }
    // `from_str_radix` would also accept a leading `+`.
    if !reading.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::NotHex(reading.to_string()));
    }
    u64::from_str_radix(reading, 16).map_err(|_| DecodeError::NotHex(reading.to_string()))
}

/// Classify and decode a single reading.
pub fn decode(reading: &str) -> Result<Decoded, DecodeError> {
    let digits = reading.as_bytes();
    let Some((&first, rest)) = digits.split_first() else {
        return Err(DecodeError::Empty);
    };
    let Some((&last, middle)) = rest.split_last() else {
        return Err(DecodeError::TooShort(reading.to_string()));
    };
    let middle_all_f = middle.iter().all(|d| d.eq_ignore_ascii_case(&b'F'));
    let last_digit = char::from(last).to_digit(16);
    let sentinel = middle_all_f && first == b'7' && matches!(last_digit, Some(9..=15));

    let value = parse_hex(reading)? as f64 / 100.0;
    let fault = match last_digit {
        Some(digit) if sentinel => SensorFault::from_digit(digit as u8),
        _ => None,
    };
    if let Some(fault) = fault {
        tracing::debug!(reading, fault = fault.meaning(), "reading is a fault sentinel");
    }
    Ok(Decoded { value, fault })
}

/// Assemble a reading out of an RF frame.
///
/// The frame is a list of hex bytes, one per line. The bytes at `indexes` are concatenated in
/// the given order.
pub fn select_bytes(frame: &str, indexes: &[usize]) -> Result<String, DecodeError> {
    let bytes = frame.lines().map(str::trim).collect::<Vec<_>>();
    indexes
        .iter()
        .map(|&index| {
            bytes.get(index).copied().ok_or(DecodeError::MissingByte {
                index,
                len: bytes.len(),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use strum::VariantArray as _;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a debug level subscriber and return everything it logged.
    pub(crate) fn capture_logs(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn plain_readings() {
        assert_eq!(
            decode("0226").unwrap(),
            Decoded { value: 5.5, fault: None }
        );
        assert_eq!(decode("0898").unwrap().value, 22.0);
        assert_eq!(decode("0000").unwrap().value, 0.0);
        assert_eq!(decode("FFFF").unwrap().value, 655.35);
        for reading in ["0226", "1234", "ABCD", "8000", "7FEF", "6FFF"] {
            let decoded = decode(reading).unwrap();
            assert!(!decoded.faulted(), "{reading}");
            let expected = u64::from_str_radix(reading, 16).unwrap() as f64 / 100.0;
            assert_eq!(decoded.value, expected);
        }
    }

    #[test]
    fn sentinels() {
        assert_eq!(decode("7FFF").unwrap().fault, Some(SensorFault::NoSensor));
        assert_eq!(decode("7FF9").unwrap().fault, Some(SensorFault::NotCommunicating));
        assert_eq!(decode("7FFA").unwrap().fault, Some(SensorFault::NotCalibrated));
        assert_eq!(decode("7FFFFFFB").unwrap().fault, Some(SensorFault::NoValue));
        assert_eq!(
            decode("7FF9").unwrap().fault.map(SensorFault::meaning),
            Some("Sensor not communicating")
        );
        // The numeric value is kept alongside the fault.
        assert_eq!(decode("7FFF").unwrap().value, 327.67);
    }

    #[test]
    fn near_sentinels_are_measurements() {
        let decoded = decode("7FF8").unwrap();
        assert_eq!(decoded.fault, None);
        assert_eq!(decoded.value, 327.6);
        assert_eq!(decode("7EFF").unwrap().fault, None);
        assert_eq!(decode("6FFF").unwrap().fault, None);
        assert_eq!(decode("7FFFFEFF").unwrap().fault, None);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(decode("7fff").unwrap(), decode("7FFF").unwrap());
        assert_eq!(decode("7ffc").unwrap().fault, Some(SensorFault::NotConfigured));
        assert_eq!(decode("abcd").unwrap(), decode("ABCD").unwrap());
    }

    #[test]
    fn idempotent() {
        assert_eq!(decode("7FFD").unwrap(), decode("7FFD").unwrap());
        assert_eq!(decode("0226").unwrap(), decode("0226").unwrap());
    }

    #[test]
    fn malformed() {
        assert_eq!(decode("12G4"), Err(DecodeError::NotHex("12G4".into())));
        assert_eq!(decode(""), Err(DecodeError::Empty));
        assert_eq!(decode("7"), Err(DecodeError::TooShort("7".into())));
        assert_eq!(decode("+123"), Err(DecodeError::NotHex("+123".into())));
        assert!(matches!(decode("7FFFFFFFFFFFFFFFFF"), Err(DecodeError::TooLong(_))));
        // A sentinel lookalike with garbage in it is still malformed.
        assert!(matches!(decode("7FZF"), Err(DecodeError::NotHex(_))));
    }

    #[test]
    fn fault_table() {
        assert_eq!(SensorFault::VARIANTS.len(), 7);
        for fault in SensorFault::VARIANTS {
            assert_eq!(SensorFault::from_digit(fault.digit()), Some(*fault));
            assert_eq!(decode(&fault.sentinel(4)).unwrap().fault, Some(*fault));
            assert_eq!(decode(&fault.sentinel(8)).unwrap().fault, Some(*fault));
        }
        assert_eq!(SensorFault::OutOfRange.sentinel(4), "7FFD");
        assert_eq!(SensorFault::MeasurementError.sentinel(8), "7FFFFFFE");
        assert_eq!(SensorFault::from_digit(8), None);
    }

    #[test]
    fn frame_bytes() {
        let frame = "00\n0A\n08\n6B\n07\n";
        assert_eq!(select_bytes(frame, &[0]).unwrap(), "00");
        assert_eq!(select_bytes(frame, &[2, 1]).unwrap(), "080A");
        assert_eq!(select_bytes(frame, &[4, 3]).unwrap(), "076B");
        assert_eq!(
            select_bytes(frame, &[5]),
            Err(DecodeError::MissingByte { index: 5, len: 5 })
        );
    }

    #[test]
    fn sentinels_are_logged() {
        let logs = capture_logs(|| {
            decode("7FFA").unwrap();
            decode("0898").unwrap();
            decode("7FFFFFFF").unwrap();
        });
        let events = logs.lines().filter(|l| l.contains("reading is a fault sentinel"));
        assert_eq!(events.count(), 2);
        assert!(logs.contains("Sensor not calibrated"));
        assert!(logs.contains("No sensor connected"));
        assert!(!logs.contains("0898"));
    }
}
