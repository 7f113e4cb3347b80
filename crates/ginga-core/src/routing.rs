//! Filepath → (path, channel, HDU) routing.
//!
//! Three kinds of keyword events announce new exposures:
//!
//! - **Raw camera** – `(root, night, filename)`; the file lives under a fixed
//!   instrument subdirectory of the night directory and is shown on
//!   `<CAM>_RAW`, extension HDU 1.
//! - **Auxiliary camera (SAC)** – any number of path segments, shown on
//!   `SAC`, primary HDU 0.
//! - **Detrend** – a single absolute path; the channel comes from the camera
//!   token embedded in the file name, HDU 1.
//!
//! Raw and SAC events are only routed when the deployment site matches the
//! required site. Detrend events ignore the site.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::ActorConfig;
use crate::error::{ActorError, Result};
use crate::models::{CameraId, ChannelName, EventSource, HduIndex, Route};

/// Camera token embedded in processed file names, e.g. `PFJA00123456_b4.fits`.
const DETREND_CAMERA_PATTERN: &str = r"_([brnm][0-9])[_.]";

// ── SiteFilter ────────────────────────────────────────────────────────────────

/// Restricts raw and SAC events to a single observing site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFilter {
    location: Option<String>,
    required: Option<String>,
}

impl SiteFilter {
    /// `required = None` disables the filter; otherwise `location` must
    /// equal it.
    pub fn new(location: Option<String>, required: Option<String>) -> Self {
        Self { location, required }
    }

    /// A filter that lets everything through.
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Whether raw and SAC events should be routed at this site.
    pub fn allows(&self) -> bool {
        match &self.required {
            None => true,
            Some(required) => self.location.as_deref() == Some(required.as_str()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Stateless routing rules; one decision per event.
#[derive(Debug, Clone)]
pub struct Router {
    site: SiteFilter,
    raw_subdir: String,
    detrend_pattern: Regex,
}

impl Router {
    /// # Parameters
    /// - `site`: filter applied to raw and SAC events.
    /// - `raw_subdir`: directory inserted between the night directory and
    ///   the raw file name.
    pub fn new(site: SiteFilter, raw_subdir: impl Into<String>) -> Self {
        Self {
            site,
            raw_subdir: raw_subdir.into(),
            detrend_pattern: Regex::new(DETREND_CAMERA_PATTERN)
                .expect("regex is valid"),
        }
    }

    /// Build a router from the loaded configuration. The site location is
    /// read here, once.
    pub fn from_config(config: &ActorConfig) -> Self {
        let site = SiteFilter::new(config.site.resolve_location(), config.site.required.clone());
        tracing::debug!(?site, raw_subdir = %config.routing.raw_subdir, "router configured");
        Self::new(site, config.routing.raw_subdir.clone())
    }

    /// Route one event.
    ///
    /// Returns `Ok(None)` when the site filter drops the event, and an error
    /// when the payload does not have the shape its event kind requires.
    pub fn route(&self, source: &EventSource, values: &[String]) -> Result<Option<Route>> {
        match source {
            EventSource::Camera(camera) => {
                if !self.site.allows() {
                    return Ok(None);
                }
                self.route_raw(camera, values).map(Some)
            }
            EventSource::Sac => {
                if !self.site.allows() {
                    return Ok(None);
                }
                self.route_sac(values).map(Some)
            }
            EventSource::Detrend => self.route_detrend(values).map(Some),
        }
    }

    fn route_raw(&self, camera: &CameraId, values: &[String]) -> Result<Route> {
        let [root, night, filename] = values else {
            return Err(malformed(
                &EventSource::Camera(*camera),
                format!("expected 3 path segments, got {}", values.len()),
            ));
        };
        let path = [root.as_str(), night.as_str(), self.raw_subdir.as_str(), filename.as_str()].join("/");
        Ok(Route {
            path: PathBuf::from(path),
            channel: ChannelName::raw(camera),
            hdu: HduIndex::FIRST_EXTENSION,
        })
    }

    fn route_sac(&self, values: &[String]) -> Result<Route> {
        if values.is_empty() {
            return Err(malformed(&EventSource::Sac, "no path segments".to_string()));
        }
        Ok(Route {
            path: PathBuf::from(values.join("/")),
            channel: ChannelName::sac(),
            hdu: HduIndex::PRIMARY,
        })
    }

    fn route_detrend(&self, values: &[String]) -> Result<Route> {
        let [path] = values else {
            return Err(malformed(
                &EventSource::Detrend,
                format!("expected 1 path, got {}", values.len()),
            ));
        };
        let path = PathBuf::from(path);
        Ok(Route {
            channel: self.detrend_channel(&path),
            path,
            hdu: HduIndex::FIRST_EXTENSION,
        })
    }

    /// `<CAM>_DETREND` when the file name carries a camera token, else `Image`.
    pub fn detrend_channel(&self, path: &Path) -> ChannelName {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        match self.detrend_pattern.captures(&filename) {
            Some(caps) => ChannelName::detrend(&caps[1]),
            None => ChannelName::fallback(),
        }
    }
}

fn malformed(source: &EventSource, message: String) -> ActorError {
    ActorError::MalformedPayload {
        source_name: source.to_string(),
        message,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn open_router() -> Router {
        Router::new(SiteFilter::disabled(), "sps")
    }

    fn remote_router() -> Router {
        Router::new(
            SiteFilter::new(Some("L".to_string()), Some("S".to_string())),
            "sps",
        )
    }

    fn camera(token: &str) -> EventSource {
        EventSource::Camera(token.parse().unwrap())
    }

    // ── raw camera ────────────────────────────────────────────────────────

    #[test]
    fn test_raw_event_inserts_subdir() {
        let route = open_router()
            .route(&camera("r1"), &strings(&["/data/raw", "2024-05-01", "PFSA00012311.fits"]))
            .unwrap()
            .expect("routed");

        assert_eq!(
            route.path,
            PathBuf::from("/data/raw/2024-05-01/sps/PFSA00012311.fits")
        );
        assert_eq!(route.channel.as_str(), "R1_RAW");
        assert_eq!(route.hdu, HduIndex(1));
    }

    #[test]
    fn test_raw_event_uses_configured_subdir() {
        let router = Router::new(SiteFilter::disabled(), "ics");
        let route = router
            .route(&camera("b3"), &strings(&["root", "night", "f.fits"]))
            .unwrap()
            .unwrap();
        assert_eq!(route.path, PathBuf::from("root/night/ics/f.fits"));
        assert_eq!(route.channel.as_str(), "B3_RAW");
    }

    #[test]
    fn test_raw_event_with_wrong_arity_is_an_error() {
        let err = open_router()
            .route(&camera("r1"), &strings(&["/data/raw", "PFSA00012311.fits"]))
            .unwrap_err();
        assert!(matches!(err, ActorError::MalformedPayload { .. }));
        assert!(err.to_string().contains("ccd_r1"));
    }

    #[test]
    fn test_required_site_match_lets_raw_through() {
        let router = Router::new(
            SiteFilter::new(Some("S".to_string()), Some("S".to_string())),
            "sps",
        );
        let routed = router
            .route(&camera("n2"), &strings(&["a", "b", "c"]))
            .unwrap();
        assert!(routed.is_some());
    }

    // ── SAC ───────────────────────────────────────────────────────────────

    #[test]
    fn test_sac_event_joins_all_segments() {
        let route = open_router()
            .route(&EventSource::Sac, &strings(&["a", "b", "c"]))
            .unwrap()
            .unwrap();
        assert_eq!(route.path, PathBuf::from("a/b/c"));
        assert_eq!(route.channel.as_str(), "SAC");
        assert_eq!(route.hdu, HduIndex(0));
    }

    #[test]
    fn test_sac_event_without_segments_is_an_error() {
        let err = open_router().route(&EventSource::Sac, &[]).unwrap_err();
        assert!(matches!(err, ActorError::MalformedPayload { .. }));
    }

    // ── detrend ───────────────────────────────────────────────────────────

    #[test]
    fn test_detrend_event_derives_camera_channel() {
        let route = open_router()
            .route(
                &EventSource::Detrend,
                &strings(&["/data/drp/2024-05-01/PFJA00123456_b4.fits"]),
            )
            .unwrap()
            .unwrap();
        assert_eq!(route.channel.as_str(), "B4_DETREND");
        assert_eq!(route.hdu, HduIndex(1));
        assert_eq!(
            route.path,
            PathBuf::from("/data/drp/2024-05-01/PFJA00123456_b4.fits")
        );
    }

    #[test]
    fn test_detrend_token_between_underscores() {
        let channel = open_router().detrend_channel(Path::new("/x/calexp-PFJA00123456_r2_v1.fits"));
        assert_eq!(channel.as_str(), "R2_DETREND");
    }

    #[test]
    fn test_detrend_without_token_falls_back_to_image() {
        let route = open_router()
            .route(&EventSource::Detrend, &strings(&["/data/drp/summary.fits"]))
            .unwrap()
            .unwrap();
        assert_eq!(route.channel.as_str(), "Image");
        assert_eq!(route.hdu, HduIndex(1));
    }

    #[test]
    fn test_detrend_token_only_matched_in_file_name() {
        let channel = open_router().detrend_channel(Path::new("/data/run_b1_x/output.fits"));
        assert_eq!(channel.as_str(), "Image");
    }

    #[test]
    fn test_detrend_ignores_unknown_arm_letters() {
        let channel = open_router().detrend_channel(Path::new("/x/PFJA00123456_x4.fits"));
        assert_eq!(channel, ChannelName::fallback());
    }

    // ── site filter ───────────────────────────────────────────────────────

    #[test]
    fn test_site_mismatch_drops_raw_and_sac() {
        let router = remote_router();
        assert_eq!(
            router.route(&camera("r1"), &strings(&["a", "b", "c"])).unwrap(),
            None
        );
        assert_eq!(
            router.route(&EventSource::Sac, &strings(&["a", "b", "c"])).unwrap(),
            None
        );
    }

    #[test]
    fn test_site_mismatch_drops_before_payload_checks() {
        let router = remote_router();
        assert_eq!(router.route(&camera("r1"), &[]).unwrap(), None);
    }

    #[test]
    fn test_site_mismatch_does_not_affect_detrend() {
        let route = remote_router()
            .route(&EventSource::Detrend, &strings(&["/d/PFJA00123456_b4.fits"]))
            .unwrap();
        assert_eq!(route.unwrap().channel.as_str(), "B4_DETREND");
    }

    #[test]
    fn test_unknown_location_is_filtered_when_site_required() {
        let filter = SiteFilter::new(None, Some("S".to_string()));
        assert!(!filter.allows());
        assert!(SiteFilter::disabled().allows());
    }

    #[test]
    fn test_from_config_reads_site_and_subdir() {
        let mut config = ActorConfig::default();
        config.site.location = Some("S".to_string());
        config.routing.raw_subdir = "pfs".to_string();
        let route = Router::from_config(&config)
            .route(&camera("m1"), &strings(&["r", "n", "f.fits"]))
            .unwrap()
            .unwrap();
        assert_eq!(route.path, PathBuf::from("r/n/pfs/f.fits"));
    }
}
