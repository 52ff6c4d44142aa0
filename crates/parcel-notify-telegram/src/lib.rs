// # Telegram Integration
//
// This crate connects the parcel tracking bot to the Telegram Bot API.
//
// ## Components
//
// - `TelegramNotifier`: the `Notifier` implementation (sendMessage)
// - `build_dispatcher`: routes text messages into `Tracker::handle_command`
// - `webhook`: webhook URL derivation and the axum router that receives updates
//
// ## Update Delivery
//
// Long polling needs no public address and suits local runs. Webhook mode
// serves updates on the same HTTP port as the health endpoint.

pub mod dispatch;
pub mod notifier;
pub mod webhook;

pub use dispatch::{build_dispatcher, schema};
pub use notifier::{TelegramNotifier, parse_chat_id};
pub use webhook::{resolve_webhook_base, secret_token, setup_webhook, webhook_options, webhook_path};
