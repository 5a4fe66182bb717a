use leptos::prelude::*;

use cidade_shared::config::ClientConfig;
use cidade_shared::request::AuthContext;
use cidade_shared::route::Route;

use crate::api::ApiClient;
use crate::map_view::MapView;
use crate::report_view::ReportView;
use crate::{router, session};

/// Newtype wrappers so each piece of app state has a distinct context type.
#[derive(Clone, Copy)]
pub(crate) struct Api(pub StoredValue<ApiClient>);
#[derive(Clone, Copy)]
pub(crate) struct Session(pub RwSignal<AuthContext>);
#[derive(Clone, Copy)]
pub(crate) struct CurrentRoute(pub RwSignal<Route>);

/// The single inline message area. Holds the most recent error or advisory.
#[derive(Clone, Copy)]
pub(crate) struct Banner(pub RwSignal<Option<String>>);

impl Banner {
    pub fn show(self, message: impl Into<String>) {
        self.0.try_set(Some(message.into()));
    }

    pub fn clear(self) {
        self.0.try_set(None);
    }
}

#[component]
pub fn App() -> impl IntoView {
    let config = ClientConfig::from_build_env();
    log::info!(
        "client starting against {} (timeout {} ms)",
        config.api_base_url,
        config.request_timeout_ms
    );

    let api = StoredValue::new(ApiClient::new(config));
    let auth = RwSignal::new(session::load());
    let route = RwSignal::new(router::current());
    let banner = RwSignal::new(None::<String>);

    provide_context(Api(api));
    provide_context(Session(auth));
    provide_context(CurrentRoute(route));
    provide_context(Banner(banner));

    Effect::new(move || {
        router::follow_history(route);
        on_cleanup(router::unbind);
    });

    // Only re-render the page when the route actually changes.
    let active = Memo::new(move |_| route.get());

    Effect::new(move || {
        let title = active.get().title();
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            document.set_title(title);
        }
    });

    view! {
        <div style="position: fixed; inset: 0; display: flex; flex-direction: column; font-family: system-ui, sans-serif; color: #1f2430; background: #f4f2ee;">
            <BannerBar />
            <div style="position: relative; flex: 1; min-height: 0;">
                {move || match active.get() {
                    Route::Map => view! { <MapView /> }.into_any(),
                    Route::RegisterProblem => view! { <ReportView /> }.into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
fn BannerBar() -> impl IntoView {
    let Banner(banner) = expect_context::<Banner>();

    move || {
        banner.get().map(|message| {
            view! {
                <div
                    role="alert"
                    style="display: flex; align-items: center; gap: 12px; padding: 10px 14px; background: #fdecea; color: #8a1c12; border-bottom: 1px solid #f3b8b0; font-size: 14px;"
                >
                    <span style="flex: 1;">{message}</span>
                    <button
                        type="button"
                        aria-label="Dismiss"
                        style="border: none; background: transparent; color: inherit; font-size: 18px; cursor: pointer; line-height: 1;"
                        on:click=move |_| banner.set(None)
                    >
                        "×"
                    </button>
                </div>
            }
        })
    }
}
