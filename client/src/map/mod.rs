//! The interactive map: one canvas, one viewport, one marker layer.
//!
//! At most one map exists at a time. It lives in a thread-local slot because
//! its DOM listeners and JS closures cannot sit in Leptos signals; views drive
//! it through [`mount`], [`with_map`] and [`destroy`].

mod draw;
pub mod slot;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, PointerEvent, WheelEvent,
};

use cidade_shared::geo::Coordinate;
use cidade_shared::marker::{MarkerKey, MarkerLayer, Popup, user_marker};
use cidade_shared::problem::{CategoryIndex, Problem};
use cidade_shared::viewport::Viewport;

use crate::render_loop::RenderScheduler;
use crate::tiles::TileCache;

use self::draw::{PIN_HEAD_OFFSET, PIN_RADIUS, draw_scene};
use self::slot::InstanceSlot;

/// Pointer travel (CSS px) beyond which a press counts as a drag, not a click.
const CLICK_SLOP: f64 = 5.0;
const WHEEL_LINE_PX: f64 = 16.0;
const WHEEL_PAGE_PX: f64 = 800.0;

thread_local! {
    static MAP: RefCell<InstanceSlot<MapInstance>> = const { RefCell::new(InstanceSlot::new()) };
}

pub struct MapOptions {
    pub home: Coordinate,
    pub used_fallback: bool,
    pub zoom: f64,
    pub tile_template: String,
}

/// The popup currently shown over the map, anchored above its pin.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopup {
    pub key: MarkerKey,
    pub popup: Popup,
    pub x: f64,
    pub y: f64,
}

/// Create the map on `canvas` unless one is already live. Returns whether a map was built.
pub fn mount(
    canvas: HtmlCanvasElement,
    options: MapOptions,
    popup: RwSignal<Option<OpenPopup>>,
) -> Result<bool, JsValue> {
    MAP.with(|slot| {
        let mut slot = slot.borrow_mut();
        let built = slot.ensure(|| MapInstance::create(canvas, options, popup))?;
        if built {
            log::debug!("map instance #{} is live", slot.created());
        }
        Ok(built)
    })
}

pub fn with_map<R>(f: impl FnOnce(&MapInstance) -> R) -> Option<R> {
    MAP.with(|slot| slot.borrow().get().map(f))
}

/// Tear down the live map, releasing its listeners, frame callback and tiles.
pub fn destroy() -> bool {
    MAP.with(|slot| slot.borrow_mut().clear())
}

#[derive(Default)]
struct DragState {
    pointer_id: Option<i32>,
    last: (f64, f64),
    travelled: f64,
}

struct MapInner {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    viewport: RefCell<Viewport>,
    markers: RefCell<MarkerLayer>,
    home: Coordinate,
    home_zoom: f64,
    selected: Cell<Option<MarkerKey>>,
    popup: RwSignal<Option<OpenPopup>>,
    drag: RefCell<DragState>,
    /// Travel of the last completed press, checked by the click handler.
    last_press_travel: Cell<f64>,
    tiles: TileCache,
    scheduler: RenderScheduler,
}

pub struct MapInstance {
    inner: Rc<MapInner>,
    listeners: Vec<ListenerBinding>,
}

impl MapInstance {
    fn create(
        canvas: HtmlCanvasElement,
        options: MapOptions,
        popup: RwSignal<Option<OpenPopup>>,
    ) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d canvas context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let (width, height) = css_size(&canvas);
        let viewport = Viewport::centered(options.home, options.zoom, width, height);
        let markers = MarkerLayer::new(user_marker(options.home, options.used_fallback));

        let inner = Rc::new_cyclic(|weak: &Weak<MapInner>| {
            let on_tile = weak.clone();
            let on_frame = weak.clone();
            MapInner {
                canvas: canvas.clone(),
                ctx,
                viewport: RefCell::new(viewport),
                markers: RefCell::new(markers),
                home: options.home,
                home_zoom: options.zoom,
                selected: Cell::new(None),
                popup,
                drag: RefCell::new(DragState::default()),
                last_press_travel: Cell::new(0.0),
                tiles: TileCache::new(options.tile_template, move || {
                    if let Some(inner) = on_tile.upgrade() {
                        inner.scheduler.mark_dirty();
                    }
                }),
                scheduler: RenderScheduler::new(move || {
                    if let Some(inner) = on_frame.upgrade() {
                        inner.render();
                    }
                }),
            }
        });

        let listeners = bind_listeners(&inner, &canvas)?;
        inner.scheduler.mark_dirty();
        log::info!(
            "map created at {:.5}, {:.5} (fallback: {})",
            options.home.latitude,
            options.home.longitude,
            options.used_fallback
        );
        Ok(Self { inner, listeners })
    }

    /// Replace the problem pins. The user pin is kept.
    pub fn sync_markers(&self, problems: &[Problem], categories: &CategoryIndex) {
        self.inner.markers.borrow_mut().sync(problems, categories);
        let count = self.inner.markers.borrow().problems().len();
        log::debug!("map shows {count} problem markers");
        self.inner.scheduler.mark_dirty();
    }

    /// Return to the user's location at the initial zoom.
    pub fn recenter(&self) {
        self.inner
            .viewport
            .borrow_mut()
            .recenter(self.inner.home, self.inner.home_zoom);
        self.inner.scheduler.mark_dirty();
    }

    pub fn zoom_by(&self, steps: f64) {
        self.inner.viewport.borrow_mut().zoom_by(steps);
        self.inner.scheduler.mark_dirty();
    }

    pub fn close_popup(&self) {
        self.inner.select(None);
    }
}

impl Drop for MapInstance {
    fn drop(&mut self) {
        self.listeners.clear();
        self.inner.scheduler.cancel();
        self.inner.tiles.release();
        log::info!("map destroyed");
    }
}

impl MapInner {
    fn render(&self) {
        let (width, height) = css_size(&self.canvas);
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .max(1.0);
        let backing_w = (width * dpr).round() as u32;
        let backing_h = (height * dpr).round() as u32;
        if self.canvas.width() != backing_w || self.canvas.height() != backing_h {
            self.canvas.set_width(backing_w);
            self.canvas.set_height(backing_h);
        }
        self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

        let mut viewport = self.viewport.borrow_mut();
        viewport.set_size(width, height);
        let markers = self.markers.borrow();

        if let Some(key) = self.selected.get()
            && markers.get(key).is_none()
        {
            self.selected.set(None);
        }
        draw_scene(
            &self.ctx,
            &viewport,
            &self.tiles,
            &markers,
            self.selected.get(),
        );

        let next = self.selected.get().and_then(|key| {
            let marker = markers.get(key)?;
            let (x, y) = viewport.coordinate_to_screen(marker.coordinate);
            Some(OpenPopup {
                key,
                popup: marker.popup.clone(),
                x,
                y: y - PIN_HEAD_OFFSET - PIN_RADIUS,
            })
        });
        if self
            .popup
            .try_with_untracked(|current| *current != next)
            .unwrap_or(false)
        {
            self.popup.try_set(next);
        }
    }

    fn select(&self, key: Option<MarkerKey>) {
        self.selected.set(key);
        if key.is_none() {
            self.popup.try_set(None);
        }
        self.scheduler.mark_dirty();
    }

    fn local_point(&self, client_x: i32, client_y: i32) -> (f64, f64) {
        let rect = self.canvas.get_bounding_client_rect();
        (client_x as f64 - rect.left(), client_y as f64 - rect.top())
    }

    fn on_pointer_down(&self, e: &PointerEvent) {
        if e.button() != 0 {
            return;
        }
        let point = self.local_point(e.client_x(), e.client_y());
        self.canvas.set_pointer_capture(e.pointer_id()).ok();
        *self.drag.borrow_mut() = DragState {
            pointer_id: Some(e.pointer_id()),
            last: point,
            travelled: 0.0,
        };
    }

    fn on_pointer_move(&self, e: &PointerEvent) {
        let point = self.local_point(e.client_x(), e.client_y());
        let (dx, dy) = {
            let mut drag = self.drag.borrow_mut();
            if drag.pointer_id != Some(e.pointer_id()) {
                return;
            }
            let delta = (point.0 - drag.last.0, point.1 - drag.last.1);
            drag.last = point;
            drag.travelled += delta.0.abs() + delta.1.abs();
            delta
        };
        self.viewport.borrow_mut().pan(dx, dy);
        self.scheduler.mark_dirty();
    }

    fn on_pointer_up(&self, e: &PointerEvent) {
        let mut drag = self.drag.borrow_mut();
        if drag.pointer_id != Some(e.pointer_id()) {
            return;
        }
        self.canvas.release_pointer_capture(e.pointer_id()).ok();
        self.last_press_travel.set(drag.travelled);
        *drag = DragState::default();
    }

    fn on_click(&self, e: &web_sys::MouseEvent) {
        if self.last_press_travel.replace(0.0) > CLICK_SLOP {
            return;
        }
        let (sx, sy) = self.local_point(e.client_x(), e.client_y());
        let hit = {
            let viewport = self.viewport.borrow();
            self.markers.borrow().hit_test(&viewport, sx, sy)
        };
        self.select(hit);
    }

    fn on_wheel(&self, e: &WheelEvent) {
        e.prevent_default();
        let delta = match e.delta_mode() {
            WheelEvent::DOM_DELTA_LINE => e.delta_y() * WHEEL_LINE_PX,
            WheelEvent::DOM_DELTA_PAGE => e.delta_y() * WHEEL_PAGE_PX,
            _ => e.delta_y(),
        };
        let (sx, sy) = self.local_point(e.client_x(), e.client_y());
        self.viewport.borrow_mut().zoom_at(delta, sx, sy);
        self.scheduler.mark_dirty();
    }
}

fn css_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
    (canvas.client_width() as f64, canvas.client_height() as f64)
}

/// A DOM listener that is removed when dropped.
struct ListenerBinding {
    target: EventTarget,
    event: &'static str,
    handler: Closure<dyn FnMut(Event)>,
}

impl ListenerBinding {
    fn bind(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let handler = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(event, handler.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            handler,
        })
    }
}

impl Drop for ListenerBinding {
    fn drop(&mut self) {
        self.target
            .remove_event_listener_with_callback(
                self.event,
                self.handler.as_ref().unchecked_ref(),
            )
            .ok();
    }
}

fn bind_listeners(
    inner: &Rc<MapInner>,
    canvas: &HtmlCanvasElement,
) -> Result<Vec<ListenerBinding>, JsValue> {
    let target: &EventTarget = canvas.as_ref();
    let mut listeners = Vec::with_capacity(7);

    let pointer_events: [(&'static str, fn(&MapInner, &PointerEvent)); 4] = [
        ("pointerdown", MapInner::on_pointer_down),
        ("pointermove", MapInner::on_pointer_move),
        ("pointerup", MapInner::on_pointer_up),
        ("pointercancel", MapInner::on_pointer_up),
    ];
    for (event, handle) in pointer_events {
        let weak = Rc::downgrade(inner);
        listeners.push(ListenerBinding::bind(target, event, move |e: Event| {
            if let (Some(inner), Some(e)) = (weak.upgrade(), e.dyn_ref::<PointerEvent>()) {
                handle(&inner, e);
            }
        })?);
    }

    let weak = Rc::downgrade(inner);
    listeners.push(ListenerBinding::bind(target, "click", move |e: Event| {
        if let (Some(inner), Some(e)) = (weak.upgrade(), e.dyn_ref::<web_sys::MouseEvent>()) {
            inner.on_click(e);
        }
    })?);

    let weak = Rc::downgrade(inner);
    listeners.push(ListenerBinding::bind(target, "wheel", move |e: Event| {
        if let (Some(inner), Some(e)) = (weak.upgrade(), e.dyn_ref::<WheelEvent>()) {
            inner.on_wheel(e);
        }
    })?);

    if let Some(window) = web_sys::window() {
        let weak = Rc::downgrade(inner);
        listeners.push(ListenerBinding::bind(window.as_ref(), "resize", move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.scheduler.mark_dirty();
            }
        })?);
    }

    Ok(listeners)
}
