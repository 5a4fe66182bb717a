#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use cidade_shared::tiles::{TileId, TilePlacement};

const MAX_CONCURRENCY: usize = 6;
const MAX_CACHED_TILES: usize = 384;
const ONLOAD_HANDLE_KEY: &str = "__cidadeTileOnload";
const ONERROR_HANDLE_KEY: &str = "__cidadeTileOnerror";

type ReadyCallback = Rc<dyn Fn()>;

enum TileEntry {
    Queued,
    Loading(HtmlImageElement),
    Ready(HtmlImageElement),
    Failed,
}

struct Inner {
    template: String,
    entries: HashMap<TileId, TileEntry>,
    queue: VecDeque<TileId>,
    in_flight: usize,
    on_ready: Option<ReadyCallback>,
    released: bool,
}

/// Raster tiles fetched on demand from the tile server, a few at a time.
///
/// Requests for tiles that scrolled out of view before their turn are dropped.
pub struct TileCache {
    inner: Rc<RefCell<Inner>>,
}

impl TileCache {
    /// `on_ready` fires after each tile finishes loading.
    pub fn new(template: impl Into<String>, on_ready: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                template: template.into(),
                entries: HashMap::new(),
                queue: VecDeque::new(),
                in_flight: 0,
                on_ready: Some(Rc::new(on_ready)),
                released: false,
            })),
        }
    }

    pub fn ready(&self, tile: TileId) -> Option<HtmlImageElement> {
        match self.inner.borrow().entries.get(&tile) {
            Some(TileEntry::Ready(image)) => Some(image.clone()),
            _ => None,
        }
    }

    /// Queue the visible tiles that are not cached yet, in the given priority order.
    pub fn request(&self, visible: &[TilePlacement]) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.released {
                return;
            }
            let wanted: HashSet<TileId> = visible.iter().map(|p| p.tile).collect();

            let stale: Vec<TileId> = inner
                .queue
                .iter()
                .copied()
                .filter(|tile| !wanted.contains(tile))
                .collect();
            for tile in stale {
                inner.entries.remove(&tile);
            }
            inner.queue.retain(|tile| wanted.contains(tile));

            for placement in visible {
                if !inner.entries.contains_key(&placement.tile) {
                    inner.entries.insert(placement.tile, TileEntry::Queued);
                    inner.queue.push_back(placement.tile);
                }
            }

            if inner.entries.len() > MAX_CACHED_TILES {
                inner.entries.retain(|tile, entry| {
                    wanted.contains(tile) || matches!(entry, TileEntry::Loading(_))
                });
            }
        }
        pump(&self.inner);
    }

    /// Detach every in-flight image and forget all tiles. Late load events are ignored.
    pub fn release(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.released = true;
        inner.on_ready = None;
        inner.queue.clear();
        for (_, entry) in inner.entries.drain() {
            if let TileEntry::Loading(image) = entry {
                clear_image_handlers(&image);
                image.set_src("");
            }
        }
    }
}

impl Drop for TileCache {
    fn drop(&mut self) {
        self.release();
    }
}

fn pump(inner_rc: &Rc<RefCell<Inner>>) {
    loop {
        let (tile, src) = {
            let mut inner = inner_rc.borrow_mut();
            if inner.released || inner.in_flight >= MAX_CONCURRENCY {
                return;
            }
            let Some(tile) = inner.queue.pop_front() else {
                return;
            };
            inner.in_flight += 1;
            (tile, tile.url(&inner.template))
        };

        match start_load(Rc::downgrade(inner_rc), tile, &src) {
            Some(image) => {
                inner_rc
                    .borrow_mut()
                    .entries
                    .insert(tile, TileEntry::Loading(image));
            }
            None => {
                let mut inner = inner_rc.borrow_mut();
                inner.in_flight = inner.in_flight.saturating_sub(1);
                inner.entries.insert(tile, TileEntry::Failed);
            }
        }
    }
}

fn start_load(weak: Weak<RefCell<Inner>>, tile: TileId, src: &str) -> Option<HtmlImageElement> {
    let img = HtmlImageElement::new().ok()?;

    let img_for_load = img.clone();
    let weak_load = weak.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        finish(&weak_load, tile, Some(img_for_load.clone()));
    });

    let img_for_error = img.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        log::warn!("tile {}/{}/{} failed to load", tile.z, tile.x, tile.y);
        finish(&weak, tile, None);
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    // Keep the closures reachable from the image until one of them fires.
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(src);
    Some(img)
}

fn finish(weak: &Weak<RefCell<Inner>>, tile: TileId, image: Option<HtmlImageElement>) {
    let Some(inner_rc) = weak.upgrade() else {
        return;
    };
    let on_ready = {
        let mut inner = inner_rc.borrow_mut();
        if inner.released {
            return;
        }
        inner.in_flight = inner.in_flight.saturating_sub(1);
        // An eviction may have dropped the entry while it was loading; keep the result anyway.
        let entry = match image {
            Some(image) => TileEntry::Ready(image),
            None => TileEntry::Failed,
        };
        inner.entries.insert(tile, entry);
        inner.on_ready.clone()
    };
    pump(&inner_rc);
    if let Some(cb) = on_ready {
        cb();
    }
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
