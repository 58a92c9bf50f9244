use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use super::error::{DispatchError, HandlerError};
use super::handler::{ExceptionHandler, ExceptionResolution, MessageHandler};
use crate::config::ConfigurationError;
use crate::message::{Message, MessageType};

type HandlerTable = RwLock<HashMap<String, Arc<dyn MessageHandler>>>;
type Slot<T> = RwLock<Option<Arc<T>>>;

/// How a dispatched message was settled. Every outcome except
/// `Resolved(..)` means the delivery should be acknowledged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registered handler accepted the message.
    Handled,
    /// An event nobody subscribed to.
    Dropped,
    /// The unsupported-message handler accepted the message.
    Fallback,
    /// The handler failed and the exception handler chose a resolution.
    Resolved(ExceptionResolution),
}

impl DispatchOutcome {
    pub fn is_ack(&self) -> bool {
        !matches!(self, DispatchOutcome::Resolved(_))
    }
}

/// Per-type, per-name handler tables plus the optional interceptor,
/// unsupported-message handler and exception handler.
///
/// Handler names are matched case-insensitively. The first registration
/// for a `(type, name)` pair wins; the three single slots are replaced on
/// every set.
///
/// Locks are held only long enough to clone a handler out, so a handler
/// may itself register handlers or replace slots.
///
/// ## Example
///
/// ```
/// use envelope_mq::dispatch::{DispatchOutcome, HandlerRegistry};
/// use envelope_mq::Message;
///
/// let registry = HandlerRegistry::new()
///     .on_task("resize", |_msg| Ok(()));
///
/// let outcome = registry.dispatch(&Message::task("RESIZE")).unwrap();
/// assert_eq!(outcome, DispatchOutcome::Handled);
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    events: HandlerTable,
    tasks: HandlerTable,
    task_results: HandlerTable,
    interceptor: Slot<dyn MessageHandler>,
    unsupported: Slot<dyn MessageHandler>,
    exception: Slot<dyn ExceptionHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, message_type: MessageType) -> Option<&HandlerTable> {
        match message_type {
            MessageType::Event => Some(&self.events),
            MessageType::Task => Some(&self.tasks),
            MessageType::TaskResult => Some(&self.task_results),
            MessageType::Error | MessageType::Unknown => None,
        }
    }

    fn insert(table: &HandlerTable, name: &str, handler: Arc<dyn MessageHandler>) -> bool {
        let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
        let key = name.to_lowercase();
        if table.contains_key(&key) {
            return false;
        }
        table.insert(key, handler);
        true
    }

    fn lookup(&self, message_type: MessageType, name: &str) -> Option<Arc<dyn MessageHandler>> {
        let table = self.table(message_type)?;
        let table = table.read().unwrap_or_else(PoisonError::into_inner);
        table.get(&name.to_lowercase()).cloned()
    }

    fn slot<T: ?Sized>(slot: &Slot<T>) -> Option<Arc<T>> {
        slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace<T: ?Sized>(slot: &Slot<T>, value: Option<Arc<T>>) {
        *slot.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a handler for `(message_type, name)`.
    ///
    /// Only events, tasks and task results accept handlers. Registering a
    /// name that is already taken is a no-op.
    pub fn register<H>(
        &self,
        message_type: MessageType,
        name: &str,
        handler: H,
    ) -> Result<(), ConfigurationError>
    where
        H: MessageHandler + 'static,
    {
        self.register_arc(message_type, name, Arc::new(handler))
    }

    /// Register an already shared handler.
    pub fn register_arc(
        &self,
        message_type: MessageType,
        name: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), ConfigurationError> {
        let table = self
            .table(message_type)
            .ok_or(ConfigurationError::UnsupportedHandlerType(message_type))?;
        if !Self::insert(table, name, handler) {
            debug!(%message_type, name, "handler already registered, keeping the first");
        }
        Ok(())
    }

    /// Register an event handler. Builder form of [`register`](Self::register).
    pub fn on_event<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::insert(&self.events, name, Arc::new(handler));
        self
    }

    pub fn on_task<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::insert(&self.tasks, name, Arc::new(handler));
        self
    }

    pub fn on_task_result<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self::insert(&self.task_results, name, Arc::new(handler));
        self
    }

    /// Registered (lower-cased) names for a type, sorted.
    pub fn handlers(&self, message_type: MessageType) -> Vec<String> {
        let Some(table) = self.table(message_type) else {
            return Vec::new();
        };
        let mut names: Vec<String> = table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    // =========================================================================
    // Single slots
    // =========================================================================

    /// Set or clear the interceptor, invoked before every dispatch.
    pub fn set_interceptor(&self, interceptor: Option<Arc<dyn MessageHandler>>) {
        Self::replace(&self.interceptor, interceptor);
    }

    pub fn set_unsupported_handler(&self, handler: Option<Arc<dyn MessageHandler>>) {
        Self::replace(&self.unsupported, handler);
    }

    pub fn set_exception_handler(&self, handler: Option<Arc<dyn ExceptionHandler>>) {
        Self::replace(&self.exception, handler);
    }

    pub fn has_unsupported_handler(&self) -> bool {
        Self::slot(&self.unsupported).is_some()
    }

    pub fn with_interceptor<F>(self, interceptor: F) -> Self
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.set_interceptor(Some(Arc::new(interceptor)));
        self
    }

    pub fn with_unsupported_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.set_unsupported_handler(Some(Arc::new(handler)));
        self
    }

    pub fn with_exception_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&Message, &(dyn Error + 'static)) -> ExceptionResolution + Send + Sync + 'static,
    {
        self.set_exception_handler(Some(Arc::new(handler)));
        self
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Route a message to its handler.
    ///
    /// 1. The interceptor, if set, sees every message first.
    /// 2. The handler is looked up by type and lower-cased name.
    /// 3. An event without a handler is dropped. Anything else without a
    ///    handler goes to the unsupported handler, or fails with
    ///    [`DispatchError::UnsupportedMessage`].
    /// 4. A failing handler is passed to the exception handler when one is
    ///    set; otherwise the error is returned.
    pub fn dispatch(&self, message: &Message) -> Result<DispatchOutcome, DispatchError> {
        let message_type = message.resolved_type();

        if let Some(interceptor) = Self::slot(&self.interceptor) {
            interceptor.handle(message)?;
        }

        let handler = message
            .name
            .as_deref()
            .and_then(|name| self.lookup(message_type, name));

        let Some(handler) = handler else {
            return self.dispatch_unmatched(message, message_type);
        };

        debug!(
            message_id = ?message.message_id,
            %message_type,
            name = ?message.name,
            "dispatching message"
        );
        match handler.handle(message) {
            Ok(()) => Ok(DispatchOutcome::Handled),
            Err(err) => match Self::slot(&self.exception) {
                Some(exception) => Ok(DispatchOutcome::Resolved(
                    exception.handle_exception(message, &err),
                )),
                None => Err(DispatchError::Handler(err)),
            },
        }
    }

    fn dispatch_unmatched(
        &self,
        message: &Message,
        message_type: MessageType,
    ) -> Result<DispatchOutcome, DispatchError> {
        if message_type == MessageType::Event {
            debug!(name = ?message.name, "no handler for event, dropping");
            return Ok(DispatchOutcome::Dropped);
        }

        match Self::slot(&self.unsupported) {
            Some(unsupported) => {
                unsupported.handle(message)?;
                Ok(DispatchOutcome::Fallback)
            }
            None => {
                warn!(%message_type, name = ?message.name, "no handler for message");
                Err(DispatchError::UnsupportedMessage {
                    message_type,
                    name: message.name.clone(),
                })
            }
        }
    }

    /// Ask the exception handler how to settle a failed message.
    /// `Default` when none is set.
    pub fn resolve_exception(
        &self,
        message: &Message,
        cause: &(dyn Error + 'static),
    ) -> ExceptionResolution {
        Self::slot(&self.exception)
            .map(|handler| handler.handle_exception(message, cause))
            .unwrap_or_default()
    }
}
