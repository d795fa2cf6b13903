use pulsewire::{decode, CadenceConfig, Characteristic, SessionStore};
use tracing::{info, warn, Level};

fn main() -> pulsewire::Result<()> {
    // Debug level shows why frames get rejected
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let frames: [(Characteristic, &[u8]); 5] = [
        (Characteristic::HeartRateMeasurement, &[0x10, 0x48, 0x00, 0x04]),
        (
            Characteristic::TemperatureMeasurement,
            &[
                0x06, 0x71, 0x0E, 0x00, 0xFE, 0xE4, 0x07, 0x05, 0x15, 0x0A, 0x1E, 0x2D, 0x02,
            ],
        ),
        (
            Characteristic::BloodPressureMeasurement,
            &[0x04, 0x78, 0x00, 0x50, 0x00, 0x5D, 0x00, 0x48, 0x00],
        ),
        (Characteristic::RecordAccessControlPoint, &[0x06, 0x00, 0x01, 0x06]),
        // reserved flag bits set
        (Characteristic::HeartRateMeasurement, &[0xE0, 0x48]),
    ];

    for (characteristic, frame) in frames {
        match decode(characteristic, frame) {
            Ok(measurement) => info!("{}: {:?}", characteristic, measurement),
            Err(e) => warn!("{}: {}", characteristic, e),
        }
    }

    let mut sessions = SessionStore::new(CadenceConfig {
        wheel_circumference_mm: 2100.0,
    })?;
    let ride: [&[u8]; 3] = [
        &[0x03, 0xE8, 0x03, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00],
        &[0x03, 0xEB, 0x03, 0x00, 0x00, 0x00, 0x04, 0x0B, 0x00, 0x00, 0x04],
        &[0x03, 0xEE, 0x03, 0x00, 0x00, 0x00, 0x08, 0x0C, 0x00, 0x00, 0x08],
    ];
    for frame in ride {
        let snapshot = sessions.process("demo-bike", frame)?;
        info!(
            "speed {:.2} m/s, crank {:.0} rpm, gear ratio {:.2}",
            snapshot.speed, snapshot.crank_cadence, snapshot.gear_ratio
        );
    }

    Ok(())
}
