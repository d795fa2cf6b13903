//! Per-peer speed and cadence derivation for CSC counters.
//!
//! A CSC notification only carries cumulative counters, so distance, speed
//! and cadence come from the difference to the previous sample of the same
//! peer. That previous sample lives in a [`DeltaSessionState`], owned by one
//! [`CadenceSession`] per peer. [`SessionStore`] keys sessions by a caller
//! supplied peer identifier. Calls against one session must be serialized.
//!
//! A session also remembers the peer's CGM Feature once it has been read, so
//! CGM measurements from that peer are held to its E2E-CRC support.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, hash::Hash};
use tracing::{debug, warn};

use crate::{
    cgm::CgmFeature,
    cycling::{CscMeasurement, EVENT_TIME_RESOLUTION},
    error::{DecodeError, Result},
};

/// Wheel circumference used when none is configured, in millimetres
pub const DEFAULT_WHEEL_CIRCUMFERENCE_MM: f32 = 2340.0;

/// Configuration for deriving speed and distance from wheel revolutions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Wheel circumference in millimetres
    pub wheel_circumference_mm: f32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            wheel_circumference_mm: DEFAULT_WHEEL_CIRCUMFERENCE_MM,
        }
    }
}

impl CadenceConfig {
    /// Check that the configuration can be used for derivation
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidParameters`] if the circumference is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<()> {
        if !self.wheel_circumference_mm.is_finite() || self.wheel_circumference_mm <= 0.0 {
            return Err(DecodeError::InvalidParameters(format!(
                "wheel circumference must be positive, got {} mm",
                self.wheel_circumference_mm
            )));
        }
        Ok(())
    }
}

/// Counters of the previous sample seen on a session
///
/// `None` marks a counter that has not been reported yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DeltaSessionState {
    /// Last cumulative wheel revolutions
    pub last_wheel_revolutions: Option<u32>,
    /// Last wheel event time (1/1024 s)
    pub last_wheel_event_time: Option<u16>,
    /// Last cumulative crank revolutions
    pub last_crank_revolutions: Option<u16>,
    /// Last crank event time (1/1024 s)
    pub last_crank_event_time: Option<u16>,
}

/// Values derived from one CSC sample and its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CyclingSnapshot {
    /// Distance covered by all reported wheel revolutions, in metres
    pub total_distance: Option<f32>,
    /// Distance since the previous sample, in metres
    pub distance: f32,
    /// Speed in m/s
    pub speed: f32,
    /// Wheel cadence in revolutions per minute
    pub wheel_cadence: f32,
    /// Crank cadence in revolutions per minute
    pub crank_cadence: f32,
    /// Wheel cadence over crank cadence, 0 when not pedalling
    pub gear_ratio: f32,
}

/// Seconds between two event times, correcting for 16-bit wraparound
#[must_use]
pub fn event_time_delta(previous: u16, current: u16) -> f32 {
    f32::from(current.wrapping_sub(previous)) / EVENT_TIME_RESOLUTION
}

/// Derive a snapshot from `sample` and overwrite `state` with its counters
///
/// The first sample on a fresh state yields zero distance, speed and cadence.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn advance(
    state: &mut DeltaSessionState,
    sample: &CscMeasurement,
    config: &CadenceConfig,
) -> CyclingSnapshot {
    let circumference_m = config.wheel_circumference_mm / 1000.0;
    let mut snapshot = CyclingSnapshot::default();

    if let Some(wheel) = sample.wheel {
        snapshot.total_distance = Some(wheel.revolutions as f32 * circumference_m);

        if let (Some(last_revolutions), Some(last_time)) =
            (state.last_wheel_revolutions, state.last_wheel_event_time)
        {
            let revolutions = i64::from(wheel.revolutions) - i64::from(last_revolutions);
            if revolutions < 0 {
                warn!(
                    "Wheel revolutions went backwards: {} -> {}",
                    last_revolutions, wheel.revolutions
                );
            }

            let elapsed = event_time_delta(last_time, wheel.event_time);
            snapshot.distance = revolutions as f32 * circumference_m;
            if elapsed > 0.0 {
                snapshot.speed = snapshot.distance / elapsed;
                snapshot.wheel_cadence = revolutions as f32 * 60.0 / elapsed;
            }
        }

        state.last_wheel_revolutions = Some(wheel.revolutions);
        state.last_wheel_event_time = Some(wheel.event_time);
    }

    if let Some(crank) = sample.crank {
        if let (Some(last_revolutions), Some(last_time)) =
            (state.last_crank_revolutions, state.last_crank_event_time)
        {
            // 16-bit counter
            let revolutions = crank.revolutions.wrapping_sub(last_revolutions);
            let elapsed = event_time_delta(last_time, crank.event_time);
            if elapsed > 0.0 {
                snapshot.crank_cadence = f32::from(revolutions) * 60.0 / elapsed;
            }
        }

        state.last_crank_revolutions = Some(crank.revolutions);
        state.last_crank_event_time = Some(crank.event_time);
    }

    if snapshot.crank_cadence > 0.0 {
        snapshot.gear_ratio = snapshot.wheel_cadence / snapshot.crank_cadence;
    }

    snapshot
}

/// Speed and cadence session for a single peer
#[derive(Debug, Clone, Default)]
pub struct CadenceSession {
    config: CadenceConfig,
    state: DeltaSessionState,
    cgm_feature: Option<CgmFeature>,
}

impl CadenceSession {
    /// Start a session with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidParameters`] if the configuration is invalid.
    pub fn new(config: CadenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: DeltaSessionState::default(),
            cgm_feature: None,
        })
    }

    /// Decode a CSC frame and derive values against the previous sample
    ///
    /// A frame that fails to decode leaves the session state untouched.
    ///
    /// # Errors
    ///
    /// Returns the decode error of [`CscMeasurement::parse`].
    pub fn process(&mut self, data: &[u8]) -> Result<CyclingSnapshot> {
        let sample = CscMeasurement::parse(data)?;
        Ok(self.update(&sample))
    }

    /// Derive values from an already decoded sample
    pub fn update(&mut self, sample: &CscMeasurement) -> CyclingSnapshot {
        let snapshot = advance(&mut self.state, sample, &self.config);
        debug!(
            "CSC sample: distance {:.2} m, speed {:.2} m/s, crank {:.1} rpm",
            snapshot.distance, snapshot.speed, snapshot.crank_cadence
        );
        snapshot
    }

    /// Counters of the last processed sample
    #[must_use]
    pub const fn state(&self) -> &DeltaSessionState {
        &self.state
    }

    /// Configuration of this session
    #[must_use]
    pub const fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Forget the previous sample, so the next one is treated as the first
    pub fn reset(&mut self) {
        self.state = DeltaSessionState::default();
    }

    /// Record the CGM Feature read from the peer
    pub fn set_cgm_feature(&mut self, feature: CgmFeature) {
        self.cgm_feature = Some(feature);
    }

    /// CGM Feature of the peer, once known
    #[must_use]
    pub const fn cgm_feature(&self) -> Option<CgmFeature> {
        self.cgm_feature
    }
}

/// Independent cadence sessions keyed by peer
#[derive(Debug, Clone)]
pub struct SessionStore<K> {
    config: CadenceConfig,
    sessions: HashMap<K, CadenceSession>,
}

impl<K: Eq + Hash> Default for SessionStore<K> {
    fn default() -> Self {
        Self {
            config: CadenceConfig::default(),
            sessions: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> SessionStore<K> {
    /// Create a store whose new sessions use `config`
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidParameters`] if the configuration is invalid.
    pub fn new(config: CadenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: HashMap::new(),
        })
    }

    /// Start (or restart) the session for `peer` with its own configuration
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidParameters`] if the configuration is invalid.
    pub fn start_session(&mut self, peer: K, config: CadenceConfig) -> Result<()> {
        let session = CadenceSession::new(config)?;
        self.sessions.insert(peer, session);
        Ok(())
    }

    /// Decode a CSC frame from `peer`, starting its session on first contact
    ///
    /// # Errors
    ///
    /// Returns the decode error of [`CscMeasurement::parse`].
    pub fn process(&mut self, peer: K, data: &[u8]) -> Result<CyclingSnapshot> {
        let config = self.config;
        self.sessions
            .entry(peer)
            .or_insert_with(|| CadenceSession {
                config,
                state: DeltaSessionState::default(),
                cgm_feature: None,
            })
            .process(data)
    }

    /// Look up the session of `peer`
    #[must_use]
    pub fn session(&self, peer: &K) -> Option<&CadenceSession> {
        self.sessions.get(peer)
    }

    /// Drop the session of a disconnected peer, returning its last state
    pub fn end_session(&mut self, peer: &K) -> Option<DeltaSessionState> {
        self.sessions.remove(peer).map(|session| session.state)
    }

    /// Number of active sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
