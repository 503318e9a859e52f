//! Update routing
//!
//! Routes are tried in registration order and the first match handles the
//! update; a default handler, if registered, takes whatever text nothing
//! else matched. [`Dispatcher::dispatch`] is the entry point for the
//! transport layer: it never fails, so one bad update can not take down the
//! webhook or affect other chats.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;

use educore::Store;

use crate::telegram::{OutboundMessage, TextUpdate, Update};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type HandlerResult = Result<Vec<OutboundMessage>, HandlerError>;

/// Reply sent when a handler fails or panics.
pub const GENERIC_FAILURE_REPLY: &str = "⚠️ حدث خطأ غير متوقع، حاول مرة أخرى بعد قليل.";

/// What a handler gets besides the update itself.
#[derive(Clone, Debug)]
pub struct HandlerContext {
    pub store: Store,
    pub chat_id: i64,
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, cx: HandlerContext, update: TextUpdate) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(HandlerContext, TextUpdate) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, cx: HandlerContext, update: TextUpdate) -> HandlerResult {
        (self)(cx, update).await
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Nothing matched and no default handler is registered, or the update
    /// carries nothing routable (no text message).
    #[error("no handler for update (chat {chat_id:?})")]
    Unhandled { chat_id: Option<i64> },

    #[error("handler '{route}' failed for chat {chat_id}: {source}")]
    Handler {
        route: String,
        chat_id: i64,
        #[source]
        source: HandlerError,
    },

    #[error("handler '{route}' panicked for chat {chat_id}")]
    Panicked { route: String, chat_id: i64 },
}

impl DispatchError {
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            DispatchError::Unhandled { chat_id } => *chat_id,
            DispatchError::Handler { chat_id, .. } | DispatchError::Panicked { chat_id, .. } => Some(*chat_id),
        }
    }
}

type Predicate = Box<dyn Fn(&TextUpdate) -> bool + Send + Sync>;

enum Matcher {
    Command(String),
    Text(Predicate),
}

impl Matcher {
    fn matches(&self, update: &TextUpdate) -> bool {
        match self {
            Matcher::Command(name) => update.is_command(name),
            Matcher::Text(predicate) => predicate(update),
        }
    }
}

struct Route {
    name: String,
    matcher: Matcher,
    handler: Arc<dyn Handler>,
}

/// Builder for [`Dispatcher`]; registration order is match order.
pub struct DispatcherBuilder {
    store: Store,
    routes: Vec<Route>,
    default: Option<Arc<dyn Handler>>,
}

impl DispatcherBuilder {
    /// Routes `/name` (any case, with or without `@botname`).
    pub fn command(mut self, name: &str, handler: impl Handler + 'static) -> Self {
        let name = name.trim_start_matches('/').to_lowercase();
        self.routes.push(Route {
            name: format!("/{}", name),
            matcher: Matcher::Command(name),
            handler: Arc::new(handler),
        });
        self
    }

    /// Routes text updates accepted by `predicate`.
    pub fn text<P>(mut self, name: &str, predicate: P, handler: impl Handler + 'static) -> Self
    where
        P: Fn(&TextUpdate) -> bool + Send + Sync + 'static,
    {
        self.routes.push(Route {
            name: name.to_string(),
            matcher: Matcher::Text(Box::new(predicate)),
            handler: Arc::new(handler),
        });
        self
    }

    /// Handles text no route matched.
    pub fn default_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.default = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            store: self.store,
            routes: self.routes,
            default: self.default,
            chat_locks: DashMap::new(),
        }
    }
}

pub struct Dispatcher {
    store: Store,
    routes: Vec<Route>,
    default: Option<Arc<dyn Handler>>,
    chat_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl Dispatcher {
    pub fn builder(store: Store) -> DispatcherBuilder {
        DispatcherBuilder {
            store,
            routes: Vec::new(),
            default: None,
        }
    }

    /// Runs the handler matching `update` and returns its replies.
    ///
    /// Updates of one chat are handled one at a time; different chats run
    /// concurrently.
    pub async fn handle(&self, update: &Update) -> Result<Vec<OutboundMessage>, DispatchError> {
        let Some(text) = update.text_update() else {
            return Err(DispatchError::Unhandled {
                chat_id: update.chat_id(),
            });
        };
        let chat_id = text.chat_id;

        let (route, handler) = match self.routes.iter().find(|r| r.matcher.matches(&text)) {
            Some(route) => (route.name.as_str(), Arc::clone(&route.handler)),
            None => match &self.default {
                Some(handler) => ("default", Arc::clone(handler)),
                None => return Err(DispatchError::Unhandled { chat_id: Some(chat_id) }),
            },
        };

        let lock = Arc::clone(self.chat_locks.entry(chat_id).or_default().value());
        let outcome = {
            let _guard = lock.lock().await;
            log::debug!("Dispatching chat {} to '{}'", chat_id, route);

            let cx = HandlerContext {
                store: self.store.clone(),
                chat_id,
            };
            AssertUnwindSafe(handler.handle(cx, text)).catch_unwind().await
        };
        drop(lock);
        self.chat_locks.remove_if(&chat_id, |_, lock| Arc::strong_count(lock) == 1);

        match outcome {
            Ok(Ok(replies)) => Ok(replies),
            Ok(Err(source)) => Err(DispatchError::Handler {
                route: route.to_string(),
                chat_id,
                source,
            }),
            Err(_) => Err(DispatchError::Panicked {
                route: route.to_string(),
                chat_id,
            }),
        }
    }

    /// Like [`handle`](Self::handle), but never fails.
    ///
    /// Unhandled updates produce no reply. Failed or panicked handlers are
    /// logged and produce a generic apology to the chat.
    pub async fn dispatch(&self, update: &Update) -> Vec<OutboundMessage> {
        match self.handle(update).await {
            Ok(replies) => replies,
            Err(DispatchError::Unhandled { chat_id }) => {
                log::debug!("Ignoring unhandled update {:?} (chat {:?})", update.update_id, chat_id);
                Vec::new()
            }
            Err(e) => {
                log::error!("{}", e);
                e.chat_id()
                    .map(|chat_id| vec![OutboundMessage::text(chat_id, GENERIC_FAILURE_REPLY)])
                    .unwrap_or_default()
            }
        }
    }

    /// Chats with an update in flight.
    pub fn active_chats(&self) -> usize {
        self.chat_locks.len()
    }
}
