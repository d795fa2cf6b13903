//! Bridge between btleplug notifications and the decoders.
//!
//! Each connected peer gets its own forwarding task and its own
//! [`CadenceSession`], so cycling samples from one peer never mix with
//! another's.

use btleplug::api::{CharPropFlags, Peripheral as _, ValueNotification};
use btleplug::platform::Peripheral;
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::{
    error::{BridgeError, Result},
    profile::{decode_with_session, Characteristic, Measurement, CGM_FEATURE_UUID},
    session::CadenceSession,
};

/// Decode a notification by its characteristic UUID
///
/// Returns `Ok(None)` for characteristics this crate does not decode.
///
/// # Errors
///
/// Propagates the parser's [`crate::DecodeError`].
pub fn decode_notification(
    notification: &ValueNotification,
    session: &mut CadenceSession,
) -> Result<Option<Measurement>> {
    let Some(characteristic) = Characteristic::from_uuid(notification.uuid) else {
        trace!("Ignoring notification from {}", notification.uuid);
        return Ok(None);
    };

    trace!("Routing {} notification", characteristic);
    decode_with_session(characteristic, &notification.value, session).map(Some)
}

/// Subscribe to every decodable characteristic the peripheral streams
///
/// # Errors
///
/// Returns [`BridgeError::Ble`] if service discovery or a subscription fails,
/// or [`BridgeError::NoDecodableCharacteristic`] if nothing could be subscribed.
pub async fn subscribe_all(
    peripheral: &Peripheral,
) -> std::result::Result<Vec<Characteristic>, BridgeError> {
    peripheral.discover_services().await?;

    let mut subscribed = Vec::new();
    for characteristic in peripheral.characteristics() {
        let Some(known) = Characteristic::from_uuid(characteristic.uuid) else {
            continue;
        };
        let streams = characteristic
            .properties
            .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE);
        if !known.is_streamed() || !streams {
            continue;
        }

        peripheral.subscribe(&characteristic).await?;
        debug!("Subscribed to {}", known);
        subscribed.push(known);
    }

    if subscribed.is_empty() {
        return Err(BridgeError::NoDecodableCharacteristic);
    }

    info!("Subscribed to {} characteristics", subscribed.len());
    Ok(subscribed)
}

/// Forward decoded notifications until the stream ends or the receiver is dropped
///
/// Call after [`subscribe_all`]. If the peripheral exposes a readable CGM
/// Feature, it is read first so CGM measurements are checked against the
/// device's E2E-CRC support. Frames that fail to decode are skipped.
///
/// # Errors
///
/// Returns [`BridgeError::Ble`] if the CGM Feature read fails or the
/// notification stream cannot be opened.
pub async fn forward_measurements(
    peripheral: Peripheral,
    mut session: CadenceSession,
    sender: mpsc::UnboundedSender<Measurement>,
) -> std::result::Result<(), BridgeError> {
    read_cgm_feature(&peripheral, &mut session).await?;

    let notifications = peripheral.notifications().await?;
    forward_stream(notifications, session, &sender).await;
    debug!("Notification forwarding for {} stopped", peripheral.address());
    Ok(())
}

async fn read_cgm_feature(
    peripheral: &Peripheral,
    session: &mut CadenceSession,
) -> std::result::Result<(), BridgeError> {
    let Some(characteristic) = peripheral.characteristics().into_iter().find(|characteristic| {
        characteristic.uuid == CGM_FEATURE_UUID
            && characteristic.properties.contains(CharPropFlags::READ)
    }) else {
        return Ok(());
    };

    let value = peripheral.read(&characteristic).await?;
    match decode_with_session(Characteristic::CgmFeature, &value, session) {
        Ok(_) => debug!("Read CGM feature from {}", peripheral.address()),
        Err(e) => debug!("Ignoring CGM feature of {}: {}", peripheral.address(), e),
    }
    Ok(())
}

async fn forward_stream<S>(
    mut notifications: S,
    mut session: CadenceSession,
    sender: &mpsc::UnboundedSender<Measurement>,
) where
    S: Stream<Item = ValueNotification> + Unpin,
{
    while let Some(notification) = notifications.next().await {
        if let Ok(Some(measurement)) = decode_notification(&notification, &mut session) {
            if sender.send(measurement).is_err() {
                break;
            }
        }
    }
}
