//! Value types shared by the routing, viewer and runtime layers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActorError;

// ── Camera identifiers ────────────────────────────────────────────────────────

/// Spectrograph arm, the letter half of a camera token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arm {
    /// Blue arm (`b`).
    Blue,
    /// Red arm, low resolution (`r`).
    Red,
    /// Near-infrared arm (`n`).
    Nir,
    /// Red arm, medium resolution (`m`).
    Medium,
}

impl Arm {
    /// Lowercase letter used in keyword names and file names.
    pub fn letter(self) -> char {
        match self {
            Arm::Blue => 'b',
            Arm::Red => 'r',
            Arm::Nir => 'n',
            Arm::Medium => 'm',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'b' => Some(Arm::Blue),
            'r' => Some(Arm::Red),
            'n' => Some(Arm::Nir),
            'm' => Some(Arm::Medium),
            _ => None,
        }
    }
}

/// Highest spectrograph module number.
pub const MAX_SPECTROGRAPH: u8 = 4;

/// A physical imaging channel, e.g. `r1` for the red arm of spectrograph 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId {
    pub arm: Arm,
    pub spectrograph: u8,
}

impl CameraId {
    /// Fails with [`ActorError::InvalidCamera`] outside spectrographs 1 to 4.
    pub fn new(arm: Arm, spectrograph: u8) -> Result<Self, ActorError> {
        if !(1..=MAX_SPECTROGRAPH).contains(&spectrograph) {
            return Err(ActorError::InvalidCamera(format!(
                "{}{}",
                arm.letter(),
                spectrograph
            )));
        }
        Ok(Self { arm, spectrograph })
    }

    /// Uppercase token used as a channel-name prefix (`R1`).
    pub fn upper(&self) -> String {
        self.to_string().to_uppercase()
    }

    /// Every camera that can exist, in arm-major order.
    pub fn all() -> Vec<CameraId> {
        [Arm::Blue, Arm::Red, Arm::Nir, Arm::Medium]
            .into_iter()
            .flat_map(|arm| (1..=MAX_SPECTROGRAPH).map(move |spectrograph| CameraId { arm, spectrograph }))
            .collect()
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.arm.letter(), self.spectrograph)
    }
}

impl FromStr for CameraId {
    type Err = ActorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ActorError::InvalidCamera(s.to_string());
        let mut chars = s.trim().chars();
        let (Some(letter), Some(digit), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(invalid());
        };
        let arm = Arm::from_letter(letter).ok_or_else(invalid)?;
        let spectrograph = digit.to_digit(10).ok_or_else(invalid)? as u8;
        CameraId::new(arm, spectrograph).map_err(|_| invalid())
    }
}

impl Serialize for CameraId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CameraId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── Channel names ─────────────────────────────────────────────────────────────

/// Name of a display surface on the remote viewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Channel for the auxiliary (SAC) camera.
    pub const SAC: &'static str = "SAC";
    /// Channel used when no camera token can be derived.
    pub const FALLBACK: &'static str = "Image";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `R1_RAW` style channel for raw exposures of one camera.
    pub fn raw(camera: &CameraId) -> Self {
        Self(format!("{}_RAW", camera.upper()))
    }

    /// `B4_DETREND` style channel for processed exposures.
    pub fn detrend(token: &str) -> Self {
        Self(format!("{}_DETREND", token.to_uppercase()))
    }

    pub fn sac() -> Self {
        Self(Self::SAC.to_string())
    }

    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── HDU index ─────────────────────────────────────────────────────────────────

/// Which header/data unit of a FITS file to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HduIndex(pub usize);

impl HduIndex {
    pub const PRIMARY: HduIndex = HduIndex(0);
    pub const FIRST_EXTENSION: HduIndex = HduIndex(1);

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for HduIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Events and routes ─────────────────────────────────────────────────────────

/// Which keyword callback produced a filepath event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// Raw exposure written by one spectrograph camera.
    Camera(CameraId),
    /// Auxiliary camera exposure.
    Sac,
    /// Processed (detrended) exposure from the reduction pipeline.
    Detrend,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Camera(cam) => write!(f, "ccd_{cam}"),
            EventSource::Sac => f.write_str("sac"),
            EventSource::Detrend => f.write_str("detrend"),
        }
    }
}

/// Where a new exposure lives and how it should be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: PathBuf,
    pub channel: ChannelName,
    pub hdu: HduIndex,
}

impl Route {
    /// File name component of the path, used as the image label.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
