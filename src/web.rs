//! Browser host: `requestAnimationFrame`, `setTimeout`, page visibility and
//! an `IntersectionObserver` wired to an [`OrbitSystemManager`].
//!
//! Callbacks hold only a weak reference to the manager, so dropping the
//! [`WebHost`] is enough to make any in-flight browser callback a no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use rustc_hash::FxHashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, IntersectionObserver, IntersectionObserverEntry,
    VisibilityState, Window,
};
use web_time::Instant;

use crate::engine::{HostBindings, OrbitSystemManager};
use crate::error::OrbitError;
use crate::host::{
    FrameRequest, HostScheduler, SignalSubscription, TimerHandle, TimerKind,
};
use crate::options::Options;

type ManagerRef = Weak<RefCell<OrbitSystemManager>>;
type ManagerSlot = Rc<RefCell<ManagerRef>>;

/// Route `log` to the browser console and panics to `console.error`.
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_err() {
        log::debug!("console logger already installed");
    }
}

fn js_error(what: &str, err: &JsValue) -> OrbitError {
    OrbitError::HostMismatch(format!("{what}: {err:?}"))
}

/// Run `f` against the manager if it is still alive and not already
/// borrowed further up the stack.
fn with_manager(slot: &ManagerRef, f: impl FnOnce(&mut OrbitSystemManager)) {
    let Some(manager) = slot.upgrade() else {
        return;
    };
    let Ok(mut manager) = manager.try_borrow_mut() else {
        log::warn!("re-entrant browser callback dropped");
        return;
    };
    f(&mut manager);
}

#[derive(Default)]
struct BrowserIds {
    frames: FxHashMap<u64, i32>,
    timers: FxHashMap<u64, i32>,
}

/// [`HostScheduler`] over the browser's frame and timeout primitives.
pub struct WebScheduler {
    window: Window,
    slot: ManagerSlot,
    ids: Rc<RefCell<BrowserIds>>,
    next_id: u64,
}

impl WebScheduler {
    fn new(window: Window, slot: ManagerSlot) -> Self {
        Self {
            window,
            slot,
            ids: Rc::default(),
            next_id: 1,
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl HostScheduler for WebScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let id = self.next();
        let request = FrameRequest(id);
        let slot = self.slot.borrow().clone();
        let ids = Rc::clone(&self.ids);
        let callback = Closure::once_into_js(move |_ts: f64| {
            let _ = ids.borrow_mut().frames.remove(&id);
            with_manager(&slot, |m| m.on_frame(request, Instant::now()));
        });
        match self
            .window
            .request_animation_frame(callback.unchecked_ref())
        {
            Ok(browser_id) => {
                let _ = self.ids.borrow_mut().frames.insert(id, browser_id);
            }
            Err(e) => log::warn!("requestAnimationFrame failed: {e:?}"),
        }
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let removed = self.ids.borrow_mut().frames.remove(&request.0);
        if let Some(browser_id) = removed {
            if let Err(e) = self.window.cancel_animation_frame(browser_id) {
                log::warn!("cancelAnimationFrame failed: {e:?}");
            }
        }
    }

    fn set_timer(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        let id = self.next();
        let handle = TimerHandle(id);
        let slot = self.slot.borrow().clone();
        let ids = Rc::clone(&self.ids);
        let callback = Closure::once_into_js(move || {
            let _ = ids.borrow_mut().timers.remove(&id);
            with_manager(&slot, |m| m.on_timer(handle, Instant::now()));
        });
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                millis,
            ) {
            Ok(browser_id) => {
                let _ = self.ids.borrow_mut().timers.insert(id, browser_id);
            }
            Err(e) => log::warn!("setTimeout for {kind:?} failed: {e:?}"),
        }
        handle
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        let removed = self.ids.borrow_mut().timers.remove(&handle.0);
        if let Some(browser_id) = removed {
            self.window.clear_timeout_with_handle(browser_id);
        }
    }
}

/// Page visibility listener plus viewport intersection observer.
struct BrowserSignals {
    document: Document,
    on_visibility: Closure<dyn FnMut()>,
    observer: IntersectionObserver,
    _on_intersect: Closure<dyn FnMut(js_sys::Array)>,
}

impl BrowserSignals {
    fn subscribe(
        document: &Document,
        element: &Element,
        manager: &ManagerRef,
    ) -> Result<Self, OrbitError> {
        let doc = document.clone();
        let slot = manager.clone();
        let on_visibility = Closure::<dyn FnMut()>::new(move || {
            let visible = doc.visibility_state() == VisibilityState::Visible;
            with_manager(&slot, |m| {
                m.handle_visibility_change(visible, Instant::now());
            });
        });
        document
            .add_event_listener_with_callback(
                "visibilitychange",
                on_visibility.as_ref().unchecked_ref(),
            )
            .map_err(|e| js_error("visibilitychange listener", &e))?;

        let slot = manager.clone();
        let on_intersect =
            Closure::<dyn FnMut(js_sys::Array)>::new(move |entries: js_sys::Array| {
                // Last entry carries the latest state when several queue up.
                let latest = entries
                    .iter()
                    .filter_map(|e| e.dyn_into::<IntersectionObserverEntry>().ok())
                    .last();
                if let Some(entry) = latest {
                    let entered = entry.is_intersecting();
                    with_manager(&slot, |m| {
                        m.handle_viewport_change(entered, Instant::now());
                    });
                }
            });
        let observer =
            IntersectionObserver::new(on_intersect.as_ref().unchecked_ref())
                .map_err(|e| js_error("IntersectionObserver", &e))?;
        observer.observe(element);

        Ok(Self {
            document: document.clone(),
            on_visibility,
            observer,
            _on_intersect: on_intersect,
        })
    }
}

impl SignalSubscription for BrowserSignals {
    fn unsubscribe(&mut self) {
        self.observer.disconnect();
        if let Err(e) = self.document.remove_event_listener_with_callback(
            "visibilitychange",
            self.on_visibility.as_ref().unchecked_ref(),
        ) {
            log::warn!("failed to remove visibilitychange listener: {e:?}");
        }
    }
}

/// A manager mounted on a DOM element.
pub struct WebHost {
    manager: Rc<RefCell<OrbitSystemManager>>,
}

impl WebHost {
    /// Build a manager for `element`. `bindings` receives the browser
    /// scheduler and returns the remaining collaborators (visuals, layers,
    /// projector). Initial page visibility is read from the document; the
    /// viewport state arrives with the observer's first callback.
    ///
    /// # Errors
    ///
    /// [`OrbitError::HostMismatch`] when there is no window/document or a
    /// browser subscription fails, plus anything
    /// [`OrbitSystemManager::new`] rejects.
    pub fn mount(
        element: &Element,
        mut options: Options,
        bindings: impl FnOnce(Box<dyn HostScheduler>) -> HostBindings,
    ) -> Result<Self, OrbitError> {
        let window = web_sys::window().ok_or_else(|| {
            OrbitError::HostMismatch("no global window".to_owned())
        })?;
        let document = window.document().ok_or_else(|| {
            OrbitError::HostMismatch("window has no document".to_owned())
        })?;
        options.lifecycle.initially_visible =
            document.visibility_state() == VisibilityState::Visible;
        options.lifecycle.initially_in_viewport = false;

        let slot: ManagerSlot = Rc::default();
        let scheduler = WebScheduler::new(window, Rc::clone(&slot));
        let manager = OrbitSystemManager::new(
            options,
            bindings(Box::new(scheduler)),
            Instant::now(),
        )?;
        let manager = Rc::new(RefCell::new(manager));
        *slot.borrow_mut() = Rc::downgrade(&manager);

        let signals =
            BrowserSignals::subscribe(&document, element, &Rc::downgrade(&manager))?;
        manager.borrow_mut().attach_subscription(Box::new(signals));
        Ok(Self { manager })
    }

    /// Shared handle for probes and direct calls.
    pub fn manager(&self) -> &Rc<RefCell<OrbitSystemManager>> {
        &self.manager
    }

    /// See [`OrbitSystemManager::start`].
    pub fn start(&self) {
        self.manager.borrow_mut().start(Instant::now());
    }

    /// See [`OrbitSystemManager::pause`].
    pub fn pause(&self) {
        self.manager.borrow_mut().pause(Instant::now());
    }

    /// See [`OrbitSystemManager::resume`].
    pub fn resume(&self) {
        self.manager.borrow_mut().resume(Instant::now());
    }

    /// See [`OrbitSystemManager::dispose`].
    pub fn dispose(&self) {
        self.manager.borrow_mut().dispose();
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        if let Ok(mut manager) = self.manager.try_borrow_mut() {
            manager.dispose();
        }
    }
}
