//! Forwards routed exposures to viewer channels.

use ginga_core::models::Route;
use ginga_core::Result;
use tracing::info;

use crate::fits::{FitsHduReader, HduReader};
use crate::viewer::Viewer;

/// Makes sure the target channel exists, then hands it the exposure.
///
/// Fire-and-forget: nothing confirms the image was actually shown.
pub struct ChannelDispatcher<V, R = FitsHduReader> {
    viewer: V,
    reader: R,
}

impl<V: Viewer> ChannelDispatcher<V> {
    /// Dispatcher that reads headers from FITS files on disk.
    pub fn new(viewer: V) -> Self {
        Self::with_reader(viewer, FitsHduReader)
    }
}

impl<V: Viewer, R: HduReader> ChannelDispatcher<V, R> {
    /// # Parameters
    /// - `viewer`: receives channel lookups, creations and loads.
    /// - `reader`: opens the requested HDU before it is sent.
    pub fn with_reader(viewer: V, reader: R) -> Self {
        Self { viewer, reader }
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// Display `route` on its channel, labelled with the file name.
    pub async fn forward(&self, route: &Route) -> Result<()> {
        info!(
            channel = %route.channel,
            path = %route.path.display(),
            hdu = %route.hdu,
            "loading exposure"
        );

        let channel = self.viewer.ensure_channel(&route.channel).await?;
        let payload = self.reader.open(&route.path, route.hdu)?;
        self.viewer.load_hdu(&channel, &route.label(), &payload).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::HduPayload;
    use crate::viewer::ChannelHandle;
    use async_trait::async_trait;
    use ginga_core::models::{ChannelName, HduIndex};
    use ginga_core::ActorError;
    use std::collections::{BTreeMap, HashSet};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    // ── test doubles ──────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeViewer {
        channels: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
        refuse_creation: bool,
    }

    impl FakeViewer {
        fn with_channels(names: &[&str]) -> Self {
            let viewer = Self::default();
            viewer
                .channels
                .lock()
                .unwrap()
                .extend(names.iter().map(|n| n.to_string()));
            viewer
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    #[async_trait]
    impl Viewer for FakeViewer {
        async fn channel(&self, name: &ChannelName) -> ginga_core::Result<ChannelHandle> {
            self.calls.lock().unwrap().push(format!("channel {name}"));
            if self.channels.lock().unwrap().contains(name.as_str()) {
                Ok(ChannelHandle { name: name.clone() })
            } else {
                Err(ActorError::ChannelUnavailable(name.to_string()))
            }
        }

        async fn add_channel(&self, name: &ChannelName) -> ginga_core::Result<()> {
            self.calls.lock().unwrap().push(format!("add_channel {name}"));
            if !self.refuse_creation {
                self.channels.lock().unwrap().insert(name.to_string());
            }
            Ok(())
        }

        async fn load_hdu(
            &self,
            channel: &ChannelHandle,
            label: &str,
            hdu: &HduPayload,
        ) -> ginga_core::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("load_hdu {} {} {}", channel.name, label, hdu.hdu));
            Ok(())
        }
    }

    struct StubReader;

    impl HduReader for StubReader {
        fn open(&self, path: &Path, hdu: HduIndex) -> ginga_core::Result<HduPayload> {
            if path.to_string_lossy().contains("missing") {
                return Err(ActorError::HduNotFound {
                    path: path.to_path_buf(),
                    index: hdu.get(),
                });
            }
            Ok(HduPayload {
                path: path.to_path_buf(),
                hdu,
                header: BTreeMap::new(),
            })
        }
    }

    /// Collects formatted log output for the current thread.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .without_time()
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn lines_containing(&self, needle: &str) -> Vec<String> {
            let output = String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned();
            output
                .lines()
                .filter(|line| line.contains(needle))
                .map(str::to_string)
                .collect()
        }
    }

    fn route(path: &str, channel: &str, hdu: usize) -> Route {
        Route {
            path: PathBuf::from(path),
            channel: ChannelName::new(channel),
            hdu: HduIndex(hdu),
        }
    }

    // ── forward ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_forward_to_existing_channel_creates_nothing() {
        let dispatcher =
            ChannelDispatcher::with_reader(FakeViewer::with_channels(&["R1_RAW"]), StubReader);

        dispatcher
            .forward(&route("/data/r/n/sps/PFSA00012311.fits", "R1_RAW", 1))
            .await
            .unwrap();

        let viewer = dispatcher.viewer();
        assert_eq!(viewer.count("add_channel"), 0);
        assert_eq!(
            viewer.calls(),
            vec![
                "channel R1_RAW".to_string(),
                "load_hdu R1_RAW PFSA00012311.fits 1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_forward_to_new_channel_creates_exactly_once() {
        let dispatcher = ChannelDispatcher::with_reader(FakeViewer::default(), StubReader);

        dispatcher
            .forward(&route("a/b/c.fits", "SAC", 0))
            .await
            .unwrap();

        let viewer = dispatcher.viewer();
        assert_eq!(viewer.count("add_channel"), 1);
        assert_eq!(viewer.count("load_hdu"), 1);
        assert_eq!(
            viewer.calls(),
            vec![
                "channel SAC".to_string(),
                "add_channel SAC".to_string(),
                "channel SAC".to_string(),
                "load_hdu SAC c.fits 0".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_forward_reuses_created_channel() {
        let dispatcher = ChannelDispatcher::with_reader(FakeViewer::default(), StubReader);

        dispatcher.forward(&route("x/1.fits", "B4_DETREND", 1)).await.unwrap();
        dispatcher.forward(&route("x/2.fits", "B4_DETREND", 1)).await.unwrap();

        assert_eq!(dispatcher.viewer().count("add_channel"), 1);
        assert_eq!(dispatcher.viewer().count("load_hdu"), 2);
    }

    #[tokio::test]
    async fn test_retry_is_not_recursive() {
        let viewer = FakeViewer {
            refuse_creation: true,
            ..Default::default()
        };
        let dispatcher = ChannelDispatcher::with_reader(viewer, StubReader);

        let err = dispatcher
            .forward(&route("x/1.fits", "Image", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, ActorError::ChannelUnavailable(_)));
        let viewer = dispatcher.viewer();
        assert_eq!(viewer.count("channel"), 2);
        assert_eq!(viewer.count("add_channel"), 1);
        assert_eq!(viewer.count("load_hdu"), 0);
    }

    #[tokio::test]
    async fn test_forward_logs_target_once_on_success() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let dispatcher =
            ChannelDispatcher::with_reader(FakeViewer::with_channels(&["R1_RAW"]), StubReader);

        dispatcher
            .forward(&route("/data/r/n/sps/PFSA00012311.fits", "R1_RAW", 1))
            .await
            .unwrap();

        let lines = logs.lines_containing("loading exposure");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("channel=R1_RAW"));
        assert!(lines[0].contains("path=/data/r/n/sps/PFSA00012311.fits"));
        assert!(lines[0].contains("hdu=1"));
    }

    #[tokio::test]
    async fn test_forward_logs_target_once_when_channel_is_unavailable() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let viewer = FakeViewer {
            refuse_creation: true,
            ..Default::default()
        };
        let dispatcher = ChannelDispatcher::with_reader(viewer, StubReader);

        assert!(dispatcher.forward(&route("x/1.fits", "Image", 1)).await.is_err());

        let lines = logs.lines_containing("loading exposure");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("channel=Image"));
        assert!(lines[0].contains("path=x/1.fits"));
    }

    #[tokio::test]
    async fn test_open_failure_propagates() {
        let dispatcher =
            ChannelDispatcher::with_reader(FakeViewer::with_channels(&["R1_RAW"]), StubReader);

        let err = dispatcher
            .forward(&route("/data/missing.fits", "R1_RAW", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, ActorError::HduNotFound { index: 1, .. }));
        assert_eq!(dispatcher.viewer().count("load_hdu"), 0);
    }
}
