//! Telegram gateway.
//!
//! Long-polls the Bot API, dispatches commands to the core services, and
//! renders replies with a degrade ladder: sanitized HTML first, stripped
//! plain text on a parse rejection, a fixed apology if even that fails.
//! Each update is handled in its own task; pipeline calls run on the
//! blocking pool.

mod api;
mod commands;

pub use api::{BotIdentity, Chat, Message, TelegramApi, Update, User};
pub use commands::Command;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ToolscoutConfig;
use crate::embedding::GeminiEmbedder;
use crate::index::KnowledgeIndex;
use crate::ingest::{build_documents, load_tool_records};
use crate::llm::{GeminiGenerator, Generator, ResilientGenerator, RetryPolicy};
use crate::models::ComponentState;
use crate::pipeline::AnswerPipeline;
use crate::sanitize::{clean_html, escape_markdown_v2, strip_tags};
use crate::translate::TranslationService;
use crate::{Error, Result};

/// Delay before retrying after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Shared service handles, constructed once at startup.
///
/// Passed by `Arc` into the gateway and every update task; there is no
/// global mutable state.
pub struct ServiceContext {
    /// Resolved configuration.
    pub config: ToolscoutConfig,
    /// The RAG answer pipeline.
    pub pipeline: AnswerPipeline,
    /// The translation service.
    pub translator: TranslationService,
}

impl ServiceContext {
    /// Builds every service from configuration.
    ///
    /// The index reconciliation runs here, before any traffic is
    /// accepted. A missing API key or knowledge base degrades the
    /// affected features to `Unavailable` instead of failing startup.
    #[must_use]
    pub fn initialize(config: ToolscoutConfig) -> Self {
        let policy = RetryPolicy {
            max_retries: config.llm.max_retries.unwrap_or(2),
            backoff_ms: config.llm.retry_backoff_ms.unwrap_or(250),
        };

        let generator: Option<Arc<dyn Generator>> = config.llm.api_key.clone().map(|key| {
            let mut client = GeminiGenerator::new().with_api_key(key);
            if let Some(ref model) = config.llm.model {
                client = client.with_model(model.clone());
            }
            if let Some(ref base_url) = config.llm.base_url {
                client = client.with_endpoint(base_url.clone());
            }
            Arc::new(ResilientGenerator::new(client, policy)) as Arc<dyn Generator>
        });

        let pipeline_generator = generator.clone().map_or_else(
            || ComponentState::Unavailable {
                reason: format!("{} not set", crate::config::API_KEY_ENV),
            },
            ComponentState::Ready,
        );
        let translator_generator = generator.map_or_else(
            || ComponentState::Unavailable {
                reason: format!("{} not set", crate::config::API_KEY_ENV),
            },
            ComponentState::Ready,
        );

        let index = Self::initialize_index(&config, policy);

        Self {
            pipeline: AnswerPipeline::new(index, pipeline_generator),
            translator: TranslationService::new(translator_generator),
            config,
        }
    }

    /// Runs the startup index reconciliation.
    fn initialize_index(config: &ToolscoutConfig, policy: RetryPolicy) -> ComponentState<KnowledgeIndex> {
        let Some(api_key) = config.llm.api_key.clone() else {
            tracing::warn!(
                "{} not provided; tool suggestions will be unavailable",
                crate::config::API_KEY_ENV
            );
            return ComponentState::Unavailable {
                reason: format!("{} not set", crate::config::API_KEY_ENV),
            };
        };

        let mut embedder = GeminiEmbedder::new()
            .with_api_key(api_key)
            .with_retry_policy(policy);
        if let Some(ref model) = config.llm.embedding_model {
            embedder = embedder.with_model(model.clone());
        }
        if let Some(ref base_url) = config.llm.base_url {
            embedder = embedder.with_endpoint(base_url.clone());
        }

        let documents = match load_tool_records(&config.data_file) {
            Ok(records) => build_documents(&records),
            Err(e) => {
                tracing::error!("Knowledge base ingestion failed: {e}");
                Vec::new()
            },
        };

        ComponentState::from_init(KnowledgeIndex::build_or_load(
            &config.index_dir,
            documents,
            Arc::new(embedder),
            config.top_k,
        ))
    }
}

/// The long-poll gateway.
pub struct BotGateway {
    api: Arc<TelegramApi>,
    context: Arc<ServiceContext>,
}

impl BotGateway {
    /// Creates a gateway over an API client and service context.
    #[must_use]
    pub fn new(api: TelegramApi, context: Arc<ServiceContext>) -> Self {
        Self {
            api: Arc::new(api),
            context,
        }
    }

    /// Runs the update loop until interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error when the bot token is rejected at startup.
    pub async fn run(&self) -> Result<()> {
        let me = self.api.get_me().await?;
        tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or("<unknown>"),
            rag_available = self.context.pipeline.is_available(),
            translate_available = self.context.translator.is_available(),
            "Bot gateway started"
        );

        let timeout = self.context.config.telegram.poll_timeout_secs;
        let mut offset = 0i64;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down gateway");
                    return Ok(());
                },
                polled = self.api.get_updates(offset, timeout) => match polled {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let api = Arc::clone(&self.api);
                            let context = Arc::clone(&self.context);
                            tokio::spawn(async move {
                                handle_update(api, context, update).await;
                            });
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Polling failed: {e}; retrying");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    },
                },
            }
        }
    }
}

/// Handles one update end to end. Never propagates an error.
async fn handle_update(api: Arc<TelegramApi>, context: Arc<ServiceContext>, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let Some(text) = message.text.clone() else {
        return;
    };
    let chat_id = message.chat.id;
    metrics::counter!("telegram_updates_total").increment(1);

    match commands::parse(&text) {
        Command::Start => {
            let first_name = message
                .from
                .as_ref()
                .map_or("there", |user| user.first_name.as_str());
            send_plain(&api, chat_id, &commands::start_message(first_name)).await;
        },
        Command::Hello => send_plain(&api, chat_id, commands::HELLO_MESSAGE).await,
        Command::Ping => send_plain(&api, chat_id, commands::PING_MESSAGE).await,
        Command::Help => send_plain(&api, chat_id, commands::HELP_MESSAGE).await,
        Command::Translate(args) => {
            if args.is_empty() {
                send_plain(&api, chat_id, commands::TRANSLATE_USAGE).await;
                return;
            }
            send_markdown(&api, chat_id, commands::TRANSLATING_MESSAGE).await;
            let input = args.to_string();
            let translated = run_blocking(move |ctx| ctx.translator.translate(&input), &context).await;
            let reply = clean_html(&format!(
                "Translation result:\n\n<pre>{translated}</pre>"
            ));
            deliver(&api, chat_id, &reply).await;
        },
        Command::AskTool(args) => {
            if args.is_empty() {
                send_plain(&api, chat_id, commands::ASK_TOOL_USAGE).await;
                return;
            }
            send_markdown(&api, chat_id, &commands::searching_message(args)).await;
            let query = args.to_string();
            let answer = run_blocking(move |ctx| ctx.pipeline.answer(&query), &context).await;
            deliver(&api, chat_id, &answer).await;
        },
        Command::Unknown(_) | Command::Text => {
            send_plain(&api, chat_id, commands::HINT_MESSAGE).await;
        },
    }
}

/// Runs a core call on the blocking pool with the shared context.
async fn run_blocking<F>(call: F, context: &Arc<ServiceContext>) -> String
where
    F: FnOnce(&ServiceContext) -> String + Send + 'static,
{
    let context = Arc::clone(context);
    match tokio::task::spawn_blocking(move || call(&context)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Blocking task failed: {e}");
            commands::APOLOGY_MESSAGE.to_string()
        },
    }
}

/// Sends a service message in the MarkdownV2 dialect.
///
/// The text may embed user input, so the special-character set is
/// escaped first; a rejection falls back to plain text.
async fn send_markdown(api: &TelegramApi, chat_id: i64, text: &str) {
    let escaped = escape_markdown_v2(text);
    if api
        .send_message(chat_id, &escaped, Some("MarkdownV2"))
        .await
        .is_err()
    {
        send_plain(api, chat_id, text).await;
    }
}

/// Sends a plain-text message, logging failures.
async fn send_plain(api: &TelegramApi, chat_id: i64, text: &str) {
    if let Err(e) = api.send_message(chat_id, text, None).await {
        tracing::error!(chat_id, "Failed to send message: {e}");
    }
}

/// Delivers sanitized HTML with the render-degrade ladder.
async fn deliver(api: &TelegramApi, chat_id: i64, html: &str) {
    match api.send_message(chat_id, html, Some("HTML")).await {
        Ok(()) => {},
        Err(Error::RenderRejected(reason)) => {
            tracing::warn!(chat_id, "Render rejected ({reason}); resending as plain text");
            metrics::counter!("render_rejected_total").increment(1);
            let plain = strip_tags(html);
            if api.send_message(chat_id, &plain, None).await.is_err() {
                send_plain(api, chat_id, commands::APOLOGY_MESSAGE).await;
            }
        },
        Err(e) => {
            tracing::error!(chat_id, "Failed to deliver answer: {e}");
        },
    }
}
