//! Update dispatcher
//!
//! Every text message is handed to [`Tracker::handle_command`]; a reply, if
//! any, goes back to the originating chat through the Tracker's notifier.
//! Updates from one chat are processed in order, different chats run
//! concurrently.

use parcel_core::Tracker;
use std::sync::Arc;
use teloxide::dispatching::{DefaultKey, UpdateHandler};
use teloxide::prelude::*;
use tracing::{debug, trace};

/// Handler tree for incoming updates
pub fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message().endpoint(handle_message)
}

async fn handle_message(msg: Message, tracker: Arc<Tracker>) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Some(reply) = tracker.handle_command(text).await else {
        trace!("Ignoring non-command message in chat {}", msg.chat.id.0);
        return Ok(());
    };

    let destination = msg.chat.id.0.to_string();
    if tracker.respond(&destination, &reply).await {
        debug!("Replied to chat {}", destination);
    }

    Ok(())
}

/// Build the dispatcher with `tracker` as shared dependency
pub fn build_dispatcher(
    bot: Bot,
    tracker: Arc<Tracker>,
) -> Dispatcher<Bot, anyhow::Error, DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![tracker])
        .default_handler(|update| async move {
            trace!("Unhandled update {:?}", update.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in update handler",
        ))
        .build()
}
