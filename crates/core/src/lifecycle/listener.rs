use crate::errors::BootstrapError;
use crate::lifecycle::LifecycleEvent;
use crate::types::TypeKey;

/// Receiver of lifecycle events.
///
/// A returned error aborts the remaining dispatch of that event and the
/// whole bootstrap.
pub trait LifecycleListener: Send + 'static {
    /// Get listener name (defaults to type name)
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn on_event(&mut self, event: &LifecycleEvent) -> Result<(), BootstrapError>;

    /// Listeners of the same type with equal `Some` keys are registered once.
    ///
    /// `None` makes every instance distinct.
    fn dedup_key(&self) -> Option<String> {
        None
    }
}

/// Listener built from a closure, see [`listener_fn`]
pub struct FnListener<F> {
    name: &'static str,
    callback: F,
}

/// Wrap a closure as a named listener
pub fn listener_fn<F>(name: &'static str, callback: F) -> FnListener<F>
where
    F: FnMut(&LifecycleEvent) -> Result<(), BootstrapError> + Send + 'static,
{
    FnListener { name, callback }
}

impl<F> LifecycleListener for FnListener<F>
where
    F: FnMut(&LifecycleEvent) -> Result<(), BootstrapError> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn on_event(&mut self, event: &LifecycleEvent) -> Result<(), BootstrapError> {
        (self.callback)(event)
    }
}

/// Registered listener with its type identity
pub struct ListenerEntry {
    key: TypeKey,
    listener: Box<dyn LifecycleListener>,
}

impl ListenerEntry {
    pub fn new<L: LifecycleListener>(listener: L) -> Self {
        Self {
            key: TypeKey::of::<L>(),
            listener: Box::new(listener),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        self.listener.name()
    }

    pub fn dedup_key(&self) -> Option<String> {
        self.listener.dedup_key()
    }

    pub(crate) fn deliver(&mut self, event: &LifecycleEvent) -> Result<(), BootstrapError> {
        self.listener.on_event(event)
    }
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("key", &self.key)
            .field("name", &self.listener.name())
            .finish()
    }
}
