//! Listener traits and the append-only registries that hold them.

use crate::hardware::DigitalState;
use crate::matrix::{MatrixDirection, MatrixSymbol};
use std::sync::{Arc, PoisonError, RwLock};

/// Receives every debounced state change of the touch sensor.
pub trait TouchListener: Send + Sync {
    fn on_touch_event(&self, state: DigitalState);
}

/// Receives the matrix symbol and direction after every print or rotate.
pub trait MatrixListener: Send + Sync {
    fn on_matrix_change(&self, symbol: MatrixSymbol, direction: MatrixDirection);
}

impl<F> TouchListener for F
where
    F: Fn(DigitalState) + Send + Sync,
{
    fn on_touch_event(&self, state: DigitalState) {
        self(state)
    }
}

impl<F> MatrixListener for F
where
    F: Fn(MatrixSymbol, MatrixDirection) + Send + Sync,
{
    fn on_matrix_change(&self, symbol: MatrixSymbol, direction: MatrixDirection) {
        self(symbol, direction)
    }
}

/// Thread-safe, append-only list of listeners.
///
/// Notification walks a snapshot of the list, so a listener registered while
/// another thread is notifying is never lost; it is simply reached from the
/// next notification on. Listeners may register further listeners from
/// inside a callback.
pub struct ListenerRegistry<L: ?Sized> {
    listeners: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> ListenerRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Duplicates are kept.
    pub fn register(&self, listener: Arc<L>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The listeners registered so far, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Invoke `f` once for every registered listener.
    pub fn for_each(&self, mut f: impl FnMut(&L)) {
        for listener in self.snapshot() {
            f(&listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_closures_are_listeners() {
        let registry: ListenerRegistry<dyn TouchListener> = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        registry.register(Arc::new(move |state: DigitalState| {
            assert_eq!(state, DigitalState::High);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.for_each(|listener| listener.on_touch_event(DigitalState::High));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry: ListenerRegistry<dyn MatrixListener> = ListenerRegistry::new();
        let listener: Arc<dyn MatrixListener> = Arc::new(|_: MatrixSymbol, _: MatrixDirection| {});
        registry.register(Arc::clone(&listener));
        registry.register(listener);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_register_during_notification() {
        let registry: Arc<ListenerRegistry<dyn TouchListener>> = Arc::new(ListenerRegistry::new());

        let inner = Arc::clone(&registry);
        registry.register(Arc::new(move |_: DigitalState| {
            inner.register(Arc::new(|_: DigitalState| {}));
        }));

        registry.for_each(|listener| listener.on_touch_event(DigitalState::Low));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry: Arc<ListenerRegistry<dyn TouchListener>> = Arc::new(ListenerRegistry::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let hits = Arc::clone(&hits);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let hits = Arc::clone(&hits);
                        registry.register(Arc::new(move |_: DigitalState| {
                            hits.fetch_add(1, Ordering::SeqCst);
                        }));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        registry.for_each(|listener| listener.on_touch_event(DigitalState::High));
        assert_eq!(registry.len(), 200);
        assert_eq!(hits.load(Ordering::SeqCst), 200);
    }
}
