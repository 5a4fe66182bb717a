use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use gloo_timers::callback::Timeout;
use js_sys::{Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::PositionOptions;

use cidade_shared::geo::{Coordinate, LocationError, LocationState};

const POSITION_TIMEOUT_MS: u32 = 10_000;
const MAXIMUM_AGE_MS: u32 = 60_000;
/// Some browsers never call back when the permission prompt is ignored.
const WATCHDOG_MS: u32 = POSITION_TIMEOUT_MS + 2_000;

type Outcome = Result<Coordinate, LocationError>;
type PositionCallback = Closure<dyn FnMut(JsValue)>;

/// Shared between the browser callbacks and the watchdog. The first outcome wins.
struct Settlement {
    sender: Option<oneshot::Sender<Outcome>>,
    answered_by_browser: bool,
}

type SharedSettlement = Rc<RefCell<Settlement>>;

/// An in-flight position request. Owns its callbacks until the outcome is known.
struct PendingPosition {
    receiver: oneshot::Receiver<Outcome>,
    settlement: SharedSettlement,
    _watchdog: Timeout,
    on_success: PositionCallback,
    on_error: PositionCallback,
}

impl PendingPosition {
    async fn outcome(self) -> Outcome {
        let Self {
            receiver,
            settlement,
            _watchdog,
            on_success,
            on_error,
        } = self;
        let outcome = receiver.await.unwrap_or(Err(LocationError::Unavailable));
        if !settlement.borrow().answered_by_browser {
            // The browser may still answer later and must find live callbacks.
            on_success.forget();
            on_error.forget();
        }
        outcome
    }
}

/// Ask the device for its position once. Never fails: any problem resolves
/// to the fallback coordinate with an advisory.
pub async fn acquire() -> LocationState {
    let outcome = match request_position() {
        Ok(pending) => pending.outcome().await,
        Err(err) => Err(err),
    };

    let mut state = LocationState::Pending;
    state.resolve(outcome);
    match (state.advisory(), state.coordinate()) {
        (Some(advisory), _) => {
            log::warn!("geolocation fell back to the default area: {advisory}")
        }
        (None, Some(coordinate)) => log::debug!(
            "geolocation resolved to {:.5}, {:.5}",
            coordinate.latitude,
            coordinate.longitude
        ),
        (None, None) => {}
    }
    state
}

fn request_position() -> Result<PendingPosition, LocationError> {
    let window = web_sys::window().ok_or(LocationError::Unsupported)?;
    let geolocation = window
        .navigator()
        .geolocation()
        .map_err(|_| LocationError::Unsupported)?;
    let geolocation_value: &JsValue = geolocation.as_ref();
    if geolocation_value.is_undefined() || geolocation_value.is_null() {
        return Err(LocationError::Unsupported);
    }

    let (sender, receiver) = oneshot::channel();
    let settlement: SharedSettlement = Rc::new(RefCell::new(Settlement {
        sender: Some(sender),
        answered_by_browser: false,
    }));

    let on_success = {
        let settlement = settlement.clone();
        PositionCallback::new(move |position: JsValue| {
            settle(&settlement, read_coordinate(&position), true);
        })
    };
    let on_error = {
        let settlement = settlement.clone();
        PositionCallback::new(move |error: JsValue| {
            let code = Reflect::get(&error, &JsValue::from_str("code"))
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(2.0) as u16;
            settle(&settlement, Err(LocationError::from_code(code)), true);
        })
    };

    geolocation
        .get_current_position_with_error_callback_and_options(
            on_success.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &position_options(),
        )
        .map_err(|_| LocationError::Unavailable)?;

    let watchdog = {
        let settlement = settlement.clone();
        Timeout::new(WATCHDOG_MS, move || {
            settle(&settlement, Err(LocationError::Timeout), false);
        })
    };
    Ok(PendingPosition {
        receiver,
        settlement,
        _watchdog: watchdog,
        on_success,
        on_error,
    })
}

/// First outcome wins; later callers find the sender gone.
fn settle(settlement: &SharedSettlement, outcome: Outcome, from_browser: bool) {
    let mut settlement = settlement.borrow_mut();
    if let Some(tx) = settlement.sender.take() {
        settlement.answered_by_browser = from_browser;
        let _ = tx.send(outcome);
    }
}

fn read_coordinate(position: &JsValue) -> Outcome {
    let coords = Reflect::get(position, &JsValue::from_str("coords"))
        .map_err(|_| LocationError::Unavailable)?;
    let read = |field: &str| {
        Reflect::get(&coords, &JsValue::from_str(field))
            .ok()
            .and_then(|v| v.as_f64())
            .ok_or(LocationError::Unavailable)
    };
    Ok(Coordinate::new(read("latitude")?, read("longitude")?))
}

fn position_options() -> PositionOptions {
    let options = Object::new();
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("enableHighAccuracy"),
        &JsValue::TRUE,
    );
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("timeout"),
        &JsValue::from(POSITION_TIMEOUT_MS),
    );
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("maximumAge"),
        &JsValue::from(MAXIMUM_AGE_MS),
    );
    options.unchecked_into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settlement() -> (SharedSettlement, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();
        let shared = Rc::new(RefCell::new(Settlement {
            sender: Some(sender),
            answered_by_browser: false,
        }));
        (shared, receiver)
    }

    #[test]
    fn browser_answer_wins_and_is_recorded() {
        let (shared, mut receiver) = settlement();
        settle(&shared, Err(LocationError::PermissionDenied), true);
        settle(&shared, Err(LocationError::Timeout), false);
        assert!(shared.borrow().answered_by_browser);
        assert_eq!(
            receiver.try_recv().unwrap(),
            Some(Err(LocationError::PermissionDenied))
        );
    }

    #[test]
    fn watchdog_first_leaves_callbacks_expecting_a_late_answer() {
        let (shared, mut receiver) = settlement();
        settle(&shared, Err(LocationError::Timeout), false);
        settle(&shared, Ok(Coordinate::new(1.0, 2.0)), true);
        assert!(!shared.borrow().answered_by_browser);
        assert_eq!(
            receiver.try_recv().unwrap(),
            Some(Err(LocationError::Timeout))
        );
    }
}
