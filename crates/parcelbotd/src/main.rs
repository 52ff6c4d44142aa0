// # parcelbotd - Parcel Tracking Bot Daemon
//
// This daemon is a THIN integration layer. Lookup, extraction, change
// detection and retry all live in parcel-core.
//
// The parcelbotd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering page fetchers and building the Tracker
// 4. Serving the health endpoint (and webhook route)
// 5. Running the chat dispatcher and the background monitor
// 6. Shutting everything down on SIGTERM/SIGINT
//
// ## Configuration
//
// ### Telegram
// - `TELEGRAM_TOKEN`: Bot token (required)
// - `PARCELBOT_MODE`: Update delivery (polling, webhook)
// - `PARCELBOT_WEBHOOK_URL`: Public base URL (webhook mode; defaults from
//   `RENDER_EXTERNAL_HOSTNAME` or `RENDER_SERVICE_NAME`)
// - `PORT`: HTTP listen port for health and webhook
//
// ### Fetching
// - `PARCELBOT_FETCHER`: Backend (http, webdriver)
// - `PARCELBOT_WEBDRIVER_URL`: WebDriver server (for webdriver)
// - `PARCELBOT_PROVIDER_URL`: Tracking URL template
// - `PARCELBOT_FETCH_TIMEOUT_SECS`, `PARCELBOT_MAX_ATTEMPTS`,
//   `PARCELBOT_RETRY_DELAY_SECS`
//
// ### State Store
// - `PARCELBOT_STATE_STORE`: Type of state store (file, memory)
// - `PARCELBOT_STATE_PATH`: Path to state file (for file store)
//
// ### Monitor
// - `PARCELBOT_CHAT_ID`, `PARCELBOT_MONITOR_BILLCODE`,
//   `PARCELBOT_MONITOR_PHONE`: Monitored key and push destination
// - `PARCELBOT_POLL_INTERVAL_SECS`: Poll interval
//
// ## Example
//
// ```bash
// export TELEGRAM_TOKEN=123456:your_bot_token
// export PARCELBOT_FETCHER=webdriver
// export PARCELBOT_CHAT_ID=123456789
// export PARCELBOT_MONITOR_BILLCODE=861396533622
// export PARCELBOT_MONITOR_PHONE=6719
//
// parcelbotd
// ```

mod config;
mod server;

use anyhow::Result;
use parcel_core::{FetcherRegistry, MonitorEvent, Tracker};
use parcel_notify_telegram::{TelegramNotifier, build_dispatcher, setup_webhook, webhook_options};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::Options;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use config::{Config, DeliveryMode};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound for draining the monitor and HTTP server after shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum BotExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BotExitCode> for ExitCode {
    fn from(code: BotExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return BotExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return BotExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            return BotExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BotExitCode::ConfigError.into();
    }

    info!("Starting parcelbotd");
    debug!("Configuration loaded: {:?}", config);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BotExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let daemon = match Daemon::start(config).await {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return BotExitCode::ConfigError;
            }
        };

        match daemon.run().await {
            Ok(()) => BotExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                BotExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// How updates reach the dispatcher, resolved at startup
enum Delivery {
    Polling,
    Webhook(Options),
}

/// Components built at startup
struct Daemon {
    delivery: Delivery,
    bot: Bot,
    tracker: Arc<Tracker>,
    events: mpsc::Receiver<MonitorEvent>,
    listener: TcpListener,
}

impl Daemon {
    /// Build every component; failures here are startup errors
    async fn start(config: Config) -> Result<Self> {
        let tracker_config = config.tracker_config();

        // Create fetcher registry and register built-in backends
        let registry = FetcherRegistry::new();

        #[cfg(feature = "http")]
        {
            info!("Registering HTTP page fetcher");
            parcel_fetch_http::register(&registry);
        }

        #[cfg(feature = "webdriver")]
        {
            info!("Registering WebDriver page fetcher");
            parcel_fetch_webdriver::register(&registry);
        }

        let fetcher = registry.create_fetcher(&tracker_config.fetcher, &tracker_config.provider)?;
        info!("Page fetcher: {}", fetcher.backend_name());

        let state_store = parcel_core::state::open(&tracker_config.state_store).await?;
        info!("State store: {}", config.state_store_type);

        let bot = Bot::new(&config.telegram_token);
        let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

        let (tracker, events) = Tracker::new(fetcher, state_store, notifier, tracker_config)?;

        let address = SocketAddr::from(([0, 0, 0, 0], config.port));
        let delivery = match config.delivery_mode()? {
            DeliveryMode::Polling => Delivery::Polling,
            DeliveryMode::Webhook => {
                let base = config.webhook_base()?;
                Delivery::Webhook(webhook_options(&base, &config.telegram_token, address)?)
            }
        };

        let listener = TcpListener::bind(address).await?;
        info!("HTTP server listening on {}", address);

        Ok(Self {
            delivery,
            bot,
            tracker: Arc::new(tracker),
            events,
            listener,
        })
    }

    /// Run until a shutdown signal
    ///
    /// The dispatcher stops first; the monitor and HTTP server are then
    /// signalled together and each given `SHUTDOWN_TIMEOUT` to finish.
    async fn run(self) -> Result<()> {
        let Self {
            delivery,
            bot,
            tracker,
            mut events,
            listener,
        } = self;

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!("Monitor event: {:?}", event);
            }
        });

        let (monitor_tx, monitor_rx) = oneshot::channel();
        let monitor = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.run_with_shutdown(Some(monitor_rx)).await })
        };

        let mut dispatcher = build_dispatcher(bot.clone(), Arc::clone(&tracker));
        let signals = spawn_signal_handler(dispatcher.shutdown_token());
        let (server_tx, server_rx) = oneshot::channel::<()>();

        let server = match delivery {
            Delivery::Polling => {
                let server = tokio::spawn(server::serve(listener, server::health_router(), async move {
                    let _ = server_rx.await;
                }));

                info!("Receiving updates by long polling");
                dispatcher.dispatch().await;
                server
            }
            Delivery::Webhook(options) => {
                let url = options.url.clone();
                let (updates, stop_flag, router) = setup_webhook(bot, options).await?;

                let app = server::health_router().merge(router);
                let server = tokio::spawn(server::serve(listener, app, async move {
                    tokio::select! {
                        _ = server_rx => {}
                        _ = stop_flag => {}
                    }
                }));

                info!("Receiving updates by webhook at {}", url.origin().ascii_serialization());
                dispatcher
                    .dispatch_with_listener(
                        updates,
                        LoggingErrorHandler::with_custom_text("Error from update listener"),
                    )
                    .await;
                server
            }
        };

        info!("Dispatcher stopped, shutting down");
        signals.abort();

        let _ = monitor_tx.send(());
        let _ = server_tx.send(());

        let monitor = tokio::time::timeout(SHUTDOWN_TIMEOUT, monitor).await;
        let server = tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await;

        match monitor {
            Ok(joined) => joined??,
            Err(_) => anyhow::bail!("Monitor did not stop within {:?}", SHUTDOWN_TIMEOUT),
        }
        match server {
            Ok(joined) => joined??,
            Err(_) => anyhow::bail!("HTTP server did not stop within {:?}", SHUTDOWN_TIMEOUT),
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Stop the dispatcher once SIGTERM or SIGINT arrives
fn spawn_signal_handler(token: ShutdownToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let signal = wait_for_shutdown().await;
        info!("Received shutdown signal: {}", signal);

        // The dispatcher refuses shutdown until it is running
        loop {
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    })
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// The name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> &'static str {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to set up signal handlers, falling back to CTRL-C: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for CTRL-C: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
