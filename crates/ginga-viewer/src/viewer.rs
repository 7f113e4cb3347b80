//! Capability interface to the remote image viewer.

use async_trait::async_trait;
use ginga_core::models::ChannelName;
use ginga_core::Result;

use crate::fits::HduPayload;

/// A resolved display channel on the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub name: ChannelName,
}

/// Operations the actor needs from an image viewer.
#[async_trait]
pub trait Viewer: Send + Sync {
    /// Resolve an existing channel. Fails if the viewer does not have it.
    async fn channel(&self, name: &ChannelName) -> Result<ChannelHandle>;

    /// Create a channel.
    async fn add_channel(&self, name: &ChannelName) -> Result<()>;

    /// Display one header/data unit on a channel under `label`.
    async fn load_hdu(&self, channel: &ChannelHandle, label: &str, hdu: &HduPayload) -> Result<()>;

    /// Resolve `name`, creating it first if resolution fails.
    ///
    /// Creation is attempted at most once and resolution is retried exactly
    /// once afterwards; a second failure is returned to the caller.
    async fn ensure_channel(&self, name: &ChannelName) -> Result<ChannelHandle> {
        match self.channel(name).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                tracing::debug!(channel = %name, error = %e, "channel not resolved; creating it");
                self.add_channel(name).await?;
                self.channel(name).await
            }
        }
    }
}
