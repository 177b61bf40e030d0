/// Catalog events
///
/// Handlers are plain functions registered by name against an event.
/// The process-wide table must be created with `init()` before anything
/// registers or emits, and is torn down with `shutdown()`.

use std::sync::Mutex;
use tracing::{debug, warn};

use super::library::Library;
use crate::error::{LensError, Result};

/// Events emitted by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new image was added to the catalog; carries its ID
    ImageImported,
}

/// Event handler: receives the catalog and the image ID the event is about
pub type Handler = fn(&Library, i64) -> Result<()>;

/// Result of one handler for one emitted event
#[derive(Debug)]
pub struct HandlerOutcome {
    pub handler: &'static str,
    pub result: Result<()>,
}

/// Event -> handlers table
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<(Event, &'static str, Handler)>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|(event, name, _)| (event, name)))
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`; an existing handler with the same
    /// name for this event is replaced in place
    pub fn register(&mut self, event: Event, name: &'static str, handler: Handler) {
        match self
            .handlers
            .iter_mut()
            .find(|(e, n, _)| *e == event && *n == name)
        {
            Some(entry) => entry.2 = handler,
            None => self.handlers.push((event, name, handler)),
        }
    }

    /// Remove a handler; returns false if it was not registered
    pub fn unregister(&mut self, event: Event, name: &str) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(e, n, _)| !(*e == event && *n == name));
        self.handlers.len() != before
    }

    /// Call every handler for `event` in registration order.
    /// A failing handler does not stop the ones after it.
    pub fn emit(&self, event: Event, library: &Library, image_id: i64) -> Vec<HandlerOutcome> {
        self.handlers
            .iter()
            .filter(|(e, _, _)| *e == event)
            .map(|(_, name, handler)| {
                let result = handler(library, image_id);
                if let Err(e) = &result {
                    warn!("⚠️  Handler '{}' failed for image {}: {}", name, image_id, e);
                }
                HandlerOutcome {
                    handler: *name,
                    result,
                }
            })
            .collect()
    }
}

static DISPATCH: Mutex<Option<Dispatcher>> = Mutex::new(None);

fn with_dispatch<T>(f: impl FnOnce(&mut Option<Dispatcher>) -> T) -> T {
    // A handler panicking mid-emit poisons the lock; the table itself is still usable
    let mut guard = DISPATCH.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut *guard)
}

/// Create the process-wide table. Calling it again keeps existing handlers.
pub fn init() {
    with_dispatch(|dispatch| {
        if dispatch.is_none() {
            *dispatch = Some(Dispatcher::new());
            debug!("Event dispatch initialized");
        }
    });
}

/// Drop the process-wide table and every handler in it
pub fn shutdown() {
    with_dispatch(|dispatch| {
        *dispatch = None;
    });
    debug!("Event dispatch shut down");
}

pub fn register(event: Event, name: &'static str, handler: Handler) -> Result<()> {
    with_dispatch(|dispatch| match dispatch {
        Some(dispatcher) => {
            dispatcher.register(event, name, handler);
            Ok(())
        }
        None => Err(LensError::DispatchNotInitialized),
    })
}

pub fn unregister(event: Event, name: &str) -> bool {
    with_dispatch(|dispatch| {
        dispatch
            .as_mut()
            .map(|dispatcher| dispatcher.unregister(event, name))
            .unwrap_or(false)
    })
}

/// Emit on the process-wide table; a no-op before `init()`
pub fn emit(event: Event, library: &Library, image_id: i64) -> Vec<HandlerOutcome> {
    with_dispatch(|dispatch| match dispatch {
        Some(dispatcher) => dispatcher.emit(event, library, image_id),
        None => {
            warn!(
                "⚠️  {:?} for image {} emitted before event dispatch was initialized",
                event, image_id
            );
            Vec::new()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_handler(library: &Library, image_id: i64) -> Result<()> {
        library.set_crop_factor(image_id, 1.0)
    }

    fn failing_handler(_library: &Library, image_id: i64) -> Result<()> {
        Err(LensError::ImageNotFound(image_id))
    }

    fn library_with_image() -> (Library, i64) {
        let library = Library::open_in_memory().unwrap();
        let id = library
            .import_image("/p/a.nef", "a.nef", &Default::default())
            .unwrap()
            .unwrap();
        (library, id)
    }

    #[test]
    fn test_emit_runs_all_handlers_in_order() {
        let (library, id) = library_with_image();
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Event::ImageImported, "fails", failing_handler);
        dispatcher.register(Event::ImageImported, "fixes", ok_handler);

        let outcomes = dispatcher.emit(Event::ImageImported, &library, id);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].handler, "fails");
        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[1].handler, "fixes");
        assert!(outcomes[1].result.is_ok());
        assert_eq!(library.image(id).unwrap().crop_factor, Some(1.0));
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Event::ImageImported, "lens", failing_handler);
        dispatcher.register(Event::ImageImported, "lens", ok_handler);

        let (library, id) = library_with_image();
        let outcomes = dispatcher.emit(Event::ImageImported, &library, id);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
    }

    #[test]
    fn test_unregister() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Event::ImageImported, "lens", ok_handler);
        assert!(dispatcher.unregister(Event::ImageImported, "lens"));
        assert!(!dispatcher.unregister(Event::ImageImported, "lens"));

        let (library, id) = library_with_image();
        assert!(dispatcher.emit(Event::ImageImported, &library, id).is_empty());
    }

    // The only test that touches the process-wide table
    #[test]
    fn test_global_lifecycle() {
        let (library, id) = library_with_image();

        shutdown();
        assert!(matches!(
            register(Event::ImageImported, "lens", ok_handler),
            Err(LensError::DispatchNotInitialized)
        ));
        assert!(emit(Event::ImageImported, &library, id).is_empty());

        init();
        register(Event::ImageImported, "lens", ok_handler).unwrap();
        init();
        assert_eq!(emit(Event::ImageImported, &library, id).len(), 1);

        assert!(unregister(Event::ImageImported, "lens"));
        assert!(emit(Event::ImageImported, &library, id).is_empty());

        shutdown();
        assert!(!unregister(Event::ImageImported, "lens"));
    }
}
