//! Webhook delivery
//!
//! Telegram posts updates to `<public base>/webhook/<bot id>`. The request
//! must carry the secret token derived from the bot token; teloxide rejects
//! anything else. Setting the webhook replaces any stale one.

use parcel_core::{Error, Result};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use teloxide::prelude::*;
use teloxide::update_listeners::UpdateListener;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

/// Fallback Render service name when neither a URL nor a hostname is given
const DEFAULT_SERVICE_NAME: &str = "parcelbot";

/// Longest secret token Telegram accepts
const MAX_SECRET_LEN: usize = 256;

/// Route path for incoming updates; contains only the public bot id
pub fn webhook_path(token: &str) -> String {
    let bot_id = token.split(':').next().unwrap_or_default();
    format!("/webhook/{}", bot_id)
}

/// Secret token header value derived from the private half of the bot token
pub fn secret_token(token: &str) -> String {
    token
        .split_once(':')
        .map(|(_, secret)| secret)
        .unwrap_or(token)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_SECRET_LEN)
        .collect()
}

/// Public base URL for the webhook
///
/// An explicit URL wins; otherwise the Render hostname, and failing that
/// `<service name>.onrender.com`.
pub fn resolve_webhook_base(
    explicit: Option<&str>,
    render_hostname: Option<&str>,
    render_service: Option<&str>,
) -> Result<Url> {
    let raw = match (explicit, render_hostname) {
        (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
        (_, Some(host)) if !host.trim().is_empty() => format!("https://{}", host.trim()),
        _ => format!(
            "https://{}.onrender.com",
            render_service
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_SERVICE_NAME)
        ),
    };

    let url = Url::parse(&raw).map_err(|e| Error::config(format!("Invalid webhook URL '{}': {}", raw, e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(Error::config(format!(
            "Webhook URL must use HTTP or HTTPS scheme. Got: {}",
            raw
        )));
    }
    Ok(url)
}

/// Webhook options for the bot identified by `token`
pub fn webhook_options(base: &Url, token: &str, address: SocketAddr) -> Result<Options> {
    let raw = format!("{}{}", base.as_str().trim_end_matches('/'), webhook_path(token));
    let url = Url::parse(&raw).map_err(|e| Error::config(format!("Invalid webhook URL: {}", e)))?;

    Ok(Options::new(address, url).secret_token(secret_token(token)))
}

/// Register the webhook with Telegram and build the axum router for it
///
/// # Returns
///
/// `(listener, stop_flag, router)`: the update listener for the dispatcher,
/// a future that resolves once the listener stops, and the router to merge
/// into the HTTP server.
pub async fn setup_webhook(
    bot: Bot,
    options: Options,
) -> Result<(
    impl UpdateListener<Err = Infallible>,
    impl Future<Output = ()> + Send,
    axum::Router,
)> {
    let path = options.url.path().to_string();
    let (listener, stop_flag, router) = webhooks::axum_to_router(bot, options)
        .await
        .map_err(|e| Error::delivery(format!("setWebhook failed: {}", e)))?;

    info!("Webhook registered, receiving updates on {}", path);
    Ok((listener, stop_flag, router))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456789:AAE-secret_Part";

    #[test]
    fn path_exposes_only_bot_id() {
        assert_eq!(webhook_path(TOKEN), "/webhook/123456789");
        assert!(!webhook_path(TOKEN).contains("secret"));
    }

    #[test]
    fn secret_is_private_half_of_token() {
        assert_eq!(secret_token(TOKEN), "AAE-secret_Part");
        assert_eq!(secret_token("no-colon!"), "no-colon");
    }

    #[test]
    fn explicit_url_wins() {
        let url = resolve_webhook_base(Some("https://bot.example.com"), Some("x.onrender.com"), None)
            .unwrap();
        assert_eq!(url.host_str(), Some("bot.example.com"));
    }

    #[test]
    fn render_hostname_then_service_name() {
        let url = resolve_webhook_base(None, Some("tracker.onrender.com"), None).unwrap();
        assert_eq!(url.as_str(), "https://tracker.onrender.com/");

        let url = resolve_webhook_base(None, None, Some("jt-bot")).unwrap();
        assert_eq!(url.as_str(), "https://jt-bot.onrender.com/");

        let url = resolve_webhook_base(Some(" "), None, None).unwrap();
        assert_eq!(url.as_str(), "https://parcelbot.onrender.com/");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(resolve_webhook_base(Some("ftp://bot.example.com"), None, None).is_err());
    }

    #[test]
    fn options_point_at_token_path() {
        let base = Url::parse("https://bot.example.com/").unwrap();
        let address = SocketAddr::from(([0, 0, 0, 0], 5000));
        let options = webhook_options(&base, TOKEN, address).unwrap();

        assert_eq!(options.url.as_str(), "https://bot.example.com/webhook/123456789");
        assert_eq!(options.address, address);
        assert_eq!(options.secret_token.as_deref(), Some("AAE-secret_Part"));
    }
}
