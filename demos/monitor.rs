use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager;
use pulsewire::{ble, CadenceConfig, CadenceSession, Measurement};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let manager = Manager::new().await?;
    let Some(central) = manager.adapters().await?.into_iter().next() else {
        error!("No Bluetooth adapter found");
        return Ok(());
    };

    info!("Scanning for sensors...");
    central.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(5)).await;
    central.stop_scan().await?;

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let mut peers = 0;

    for peripheral in central.peripherals().await? {
        if let Err(e) = peripheral.connect().await {
            warn!("Skipping {}: {}", peripheral.address(), e);
            continue;
        }

        match ble::subscribe_all(&peripheral).await {
            Ok(characteristics) => {
                info!("{} streams {:?}", peripheral.address(), characteristics);
                let session = CadenceSession::new(CadenceConfig::default())?;
                tokio::spawn(ble::forward_measurements(
                    peripheral,
                    session,
                    sender.clone(),
                ));
                peers += 1;
            }
            Err(e) => {
                info!("{}: {}", peripheral.address(), e);
                peripheral.disconnect().await?;
            }
        }
    }
    drop(sender);

    if peers == 0 {
        warn!("No supported sensor found");
        return Ok(());
    }

    while let Some(measurement) = receiver.recv().await {
        match measurement {
            Measurement::HeartRate(record) => println!("❤️  {} bpm", record.heart_rate),
            Measurement::Cycling(snapshot) => println!(
                "🚲 {:.1} km/h, {:.0} rpm",
                snapshot.speed * 3.6,
                snapshot.crank_cadence
            ),
            other => println!("{other:?}"),
        }
    }

    Ok(())
}
