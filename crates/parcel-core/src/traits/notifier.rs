// # Notifier Trait
//
// Outbound `sendMessage(destination, text)` capability supplied by the chat
// platform integration (Telegram: `parcel-notify-telegram`).

use async_trait::async_trait;

/// Trait for chat delivery implementations
///
/// Callers treat delivery as fire-and-forget: the `Tracker` logs and
/// swallows any error returned here.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text` to `destination` (a platform-specific chat identifier)
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the transport accepted the message
    /// - `Err(Error::Delivery)`: the transport rejected it
    async fn send_message(&self, destination: &str, text: &str) -> Result<(), crate::Error>;

    /// Notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}
