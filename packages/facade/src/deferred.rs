//! A resource that is opened on first use, at most once.

use std::sync::{Arc, Mutex};

use tierfs_core::ClientError;

type Opener<T> = Box<dyn FnOnce() -> Result<T, ClientError> + Send>;

enum State<T> {
    Unopened(Opener<T>),
    Opened(Result<Arc<T>, ClientError>),
}

/// Holds an opener closure until the resource is first needed.
///
/// The first call to [`DeferredOpener::open`] runs the closure and keeps its
/// outcome; later calls return the same resource, or the same error, without
/// running anything. Concurrent first calls are serialized so the closure
/// runs exactly once.
pub struct DeferredOpener<T> {
    state: Mutex<State<T>>,
}

impl<T> DeferredOpener<T> {
    pub fn new(opener: impl FnOnce() -> Result<T, ClientError> + Send + 'static) -> Self {
        Self {
            state: Mutex::new(State::Unopened(Box::new(opener))),
        }
    }

    /// Open the resource if that has not happened yet.
    pub fn open(&self) -> Result<Arc<T>, ClientError> {
        let mut state = self.state.lock().map_err(|_| ClientError::Other {
            message: "lock poisoned".into(),
        })?;
        if let State::Opened(outcome) = &*state {
            return outcome.clone();
        }

        // The lock stays held while the opener runs; the placeholder is
        // never observed.
        let placeholder = State::Opened(Err(ClientError::Other {
            message: "deferred resource is being opened".to_string(),
        }));
        let outcome = match std::mem::replace(&mut *state, placeholder) {
            State::Unopened(opener) => opener().map(Arc::new),
            State::Opened(outcome) => outcome,
        };
        *state = State::Opened(outcome.clone());
        outcome
    }

    pub fn is_opened(&self) -> bool {
        self.state
            .lock()
            .is_ok_and(|state| matches!(&*state, State::Opened(_)))
    }
}

impl<T> std::fmt::Debug for DeferredOpener<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredOpener")
            .field("opened", &self.is_opened())
            .finish()
    }
}
