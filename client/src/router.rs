use std::cell::RefCell;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

use cidade_shared::route::Route;

struct PopstateBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
}

thread_local! {
    static POPSTATE_BINDING: RefCell<Option<PopstateBinding>> = const { RefCell::new(None) };
}

/// The route matching the address bar right now.
pub fn current() -> Route {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .map(|path| Route::from_path(&path))
        .unwrap_or(Route::Map)
}

/// Push `target` onto the browser history and switch to it.
pub fn navigate(route: RwSignal<Route>, target: Route) {
    if let Some(window) = web_sys::window() {
        let at_target = window
            .location()
            .pathname()
            .is_ok_and(|path| path == target.path());
        if !at_target
            && let Ok(history) = window.history()
            && let Err(err) = history.push_state_with_url(&JsValue::NULL, "", Some(target.path()))
        {
            log::warn!("pushState to {} failed: {err:?}", target.path());
        }
    }
    if route.get_untracked() != target {
        log::debug!("navigate to {}", target.path());
        route.set(target);
    }
}

/// Follow back/forward navigation into `route`. Replaces any earlier binding.
pub fn follow_history(route: RwSignal<Route>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    unbind();

    let handler = Closure::<dyn Fn()>::new(move || {
        let next = current();
        if route.try_get_untracked() != Some(next) {
            route.try_set(next);
        }
    });
    if window
        .add_event_listener_with_callback("popstate", handler.as_ref().unchecked_ref())
        .is_err()
    {
        return;
    }
    POPSTATE_BINDING.with(|slot| {
        *slot.borrow_mut() = Some(PopstateBinding { window, handler });
    });
}

pub fn unbind() {
    POPSTATE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old.window.remove_event_listener_with_callback(
                "popstate",
                old.handler.as_ref().unchecked_ref(),
            );
        }
    });
}
