use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use cidade_shared::geo::LocationState;
use cidade_shared::marker::Popup;
use cidade_shared::problem::{Category, CategoryIndex, Problem};
use cidade_shared::route::Route;
use cidade_shared::tiles::OSM_ATTRIBUTION;

use crate::app::{Api, Banner, CurrentRoute, Session};
use crate::lifetime::ViewLifetime;
use crate::map::{self, MapOptions, OpenPopup};
use crate::{geolocation, router};

const BUTTON_STYLE: &str = "padding: 7px 12px; border: 1px solid #c9c4ba; border-radius: 6px; background: #ffffff; color: #1f2430; font-size: 14px; cursor: pointer;";

#[component]
pub fn MapView() -> impl IntoView {
    let Api(api) = expect_context::<Api>();
    let Session(auth) = expect_context::<Session>();
    let CurrentRoute(route) = expect_context::<CurrentRoute>();
    let banner = expect_context::<Banner>();

    let location = RwSignal::new(LocationState::Pending);
    let problems = RwSignal::new(None::<Vec<Problem>>);
    let categories = RwSignal::new(Vec::<Category>::new());
    let loading = RwSignal::new(false);
    let map_ready = RwSignal::new(false);
    let popup = RwSignal::new(None::<OpenPopup>);
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let lifetime = ViewLifetime::begin();
    on_cleanup(move || {
        lifetime.end();
        map::destroy();
    });

    spawn_local(async move {
        let state = geolocation::acquire().await;
        if !lifetime.is_alive() {
            return;
        }
        if let Some(advisory) = state.advisory() {
            banner.show(advisory.to_string());
        }
        location.set(state);
    });

    let load_problems = move || {
        if loading.get_untracked() {
            return;
        }
        loading.set(true);
        let client = api.get_value();
        let session = auth.get_untracked();
        spawn_local(async move {
            let (problems_result, categories_result) = futures::join!(
                client.list_problems(&session),
                client.list_categories(&session)
            );
            if !lifetime.is_alive() {
                return;
            }
            loading.set(false);
            match categories_result {
                Ok(list) => categories.set(list),
                Err(err) => banner.show(err.to_string()),
            }
            match problems_result {
                Ok(list) => problems.set(Some(list)),
                Err(err) => banner.show(err.to_string()),
            }
        });
    };
    load_problems();

    // Build the map once both the position and the canvas exist.
    Effect::new(move || {
        let Some((coordinate, used_fallback)) = location.with(|state| match state {
            LocationState::Pending => None,
            LocationState::Resolved {
                coordinate,
                used_fallback,
                ..
            } => Some((*coordinate, *used_fallback)),
        }) else {
            return;
        };
        let Some(canvas) = canvas_ref.get() else {
            return;
        };
        let options = api.with_value(|client| MapOptions {
            home: coordinate,
            used_fallback,
            zoom: client.config().default_zoom,
            tile_template: client.config().tile_url_template.clone(),
        });
        match map::mount(canvas, options, popup) {
            Ok(true) => map_ready.set(true),
            Ok(false) => {}
            Err(err) => {
                log::warn!("map creation failed: {err:?}");
                banner.show("Could not start the map.");
            }
        }
    });

    // Replace the problem pins whenever the data changes.
    Effect::new(move || {
        if !map_ready.get() {
            return;
        }
        let index = categories.with(|list| CategoryIndex::build(list));
        problems.with(|list| {
            if let Some(list) = list {
                map::with_map(|instance| instance.sync_markers(list, &index));
            }
        });
    });

    let located = move || location.with(LocationState::is_resolved);
    let mappable = move || {
        problems.with(|list| {
            list.as_ref()
                .map(|list| list.iter().filter(|p| p.coordinate().is_some()).count())
        })
    };

    view! {
        <div style="position: absolute; inset: 0; overflow: hidden; background: #e8e4dc;">
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />

            <div style="position: absolute; top: 12px; left: 12px; right: 12px; display: flex; flex-wrap: wrap; gap: 8px; align-items: center; pointer-events: none;">
                <div style="display: flex; gap: 6px; pointer-events: auto;">
                    <button
                        type="button"
                        style=BUTTON_STYLE
                        disabled=move || !map_ready.get()
                        on:click=move |_| {
                            map::with_map(|instance| instance.recenter());
                        }
                    >
                        "Recenter"
                    </button>
                    <button
                        type="button"
                        aria-label="Zoom in"
                        style=BUTTON_STYLE
                        on:click=move |_| {
                            map::with_map(|instance| instance.zoom_by(1.0));
                        }
                    >
                        "+"
                    </button>
                    <button
                        type="button"
                        aria-label="Zoom out"
                        style=BUTTON_STYLE
                        on:click=move |_| {
                            map::with_map(|instance| instance.zoom_by(-1.0));
                        }
                    >
                        "−"
                    </button>
                    <button
                        type="button"
                        style=BUTTON_STYLE
                        disabled=move || loading.get()
                        on:click=move |_| load_problems()
                    >
                        {move || if loading.get() { "Loading…" } else { "Reload problems" }}
                    </button>
                </div>
                <div style="flex: 1;" />
                <button
                    type="button"
                    style="padding: 8px 14px; border: none; border-radius: 6px; background: #2563eb; color: #ffffff; font-size: 14px; font-weight: 600; cursor: pointer; pointer-events: auto;"
                    on:click=move |_| router::navigate(route, Route::RegisterProblem)
                >
                    "Report a problem"
                </button>
            </div>

            {move || {
                if located() {
                    ().into_any()
                } else {
                    view! {
                        <div style="position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; color: #4b5160; font-size: 15px;">
                            "Locating you…"
                        </div>
                    }
                        .into_any()
                }
            }}

            {move || popup.get().map(|open| view! { <PopupCard open=open /> })}

            <div style="position: absolute; left: 12px; bottom: 10px; padding: 3px 8px; border-radius: 4px; background: rgba(255,255,255,0.85); font-size: 12px; color: #4b5160;">
                {move || match mappable() {
                    Some(1) => "1 problem on the map".to_string(),
                    Some(n) => format!("{n} problems on the map"),
                    None => String::new(),
                }}
            </div>
            <div style="position: absolute; right: 0; bottom: 0; padding: 2px 6px; background: rgba(255,255,255,0.8); font-size: 11px; color: #4b5160;">
                <a
                    href="https://www.openstreetmap.org/copyright"
                    target="_blank"
                    rel="noopener noreferrer"
                    style="color: inherit;"
                >
                    {OSM_ATTRIBUTION}
                </a>
            </div>
        </div>
    }
}

#[component]
fn PopupCard(open: OpenPopup) -> impl IntoView {
    let OpenPopup {
        popup: Popup { title, lines },
        x,
        y,
        ..
    } = open;
    let style = format!(
        "position: absolute; left: {x:.1}px; top: {y:.1}px; transform: translate(-50%, calc(-100% - 6px)); min-width: 180px; max-width: 280px; padding: 10px 28px 10px 12px; border-radius: 8px; background: #ffffff; box-shadow: 0 4px 14px rgba(20,22,30,0.22); font-size: 13px; line-height: 1.4;"
    );

    view! {
        <div style=style>
            <button
                type="button"
                aria-label="Close"
                style="position: absolute; top: 4px; right: 6px; border: none; background: transparent; font-size: 16px; cursor: pointer; color: #6b7080;"
                on:click=move |_| {
                    map::with_map(|instance| instance.close_popup());
                }
            >
                "×"
            </button>
            <div style="font-weight: 600; margin-bottom: 4px;">{title}</div>
            {lines
                .into_iter()
                .map(|line| view! { <div style="color: #3d4250;">{line}</div> })
                .collect_view()}
        </div>
    }
}
