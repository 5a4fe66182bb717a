use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use cidade_shared::error::FormError;
use cidade_shared::geo::LocationState;
use cidade_shared::problem::Category;
use cidade_shared::report::{PhotoMeta, ProblemDraft};
use cidade_shared::route::Route;

use crate::app::{Api, Banner, CurrentRoute, Session};
use crate::lifetime::ViewLifetime;
use crate::{geolocation, router};

const FIELD_STYLE: &str = "width: 100%; box-sizing: border-box; padding: 8px 10px; border: 1px solid #c9c4ba; border-radius: 6px; background: #ffffff; font: inherit;";
const LABEL_STYLE: &str = "display: flex; flex-direction: column; gap: 4px; font-size: 14px; font-weight: 600;";
const PRIMARY_BUTTON_STYLE: &str = "padding: 9px 16px; border: none; border-radius: 6px; background: #2563eb; color: #ffffff; font-size: 14px; font-weight: 600; cursor: pointer;";
const SECONDARY_BUTTON_STYLE: &str = "padding: 7px 12px; border: 1px solid #c9c4ba; border-radius: 6px; background: #ffffff; color: #1f2430; font-size: 14px; cursor: pointer;";

#[component]
pub fn ReportView() -> impl IntoView {
    let Api(api) = expect_context::<Api>();
    let Session(auth) = expect_context::<Session>();
    let CurrentRoute(route) = expect_context::<CurrentRoute>();
    let banner = expect_context::<Banner>();

    let logged_in = Memo::new(move |_| auth.with(|a| a.is_authenticated()));

    let on_logout = move |_| {
        let anonymous = api.with_value(|client| client.logout());
        auth.set(anonymous);
        banner.clear();
    };

    view! {
        <div style="position: absolute; inset: 0; overflow-y: auto;">
            <div style="max-width: 560px; margin: 0 auto; padding: 20px 16px 40px; display: flex; flex-direction: column; gap: 16px;">
                <div style="display: flex; align-items: center; gap: 8px;">
                    <button
                        type="button"
                        style=SECONDARY_BUTTON_STYLE
                        on:click=move |_| router::navigate(route, Route::Map)
                    >
                        "← Back to map"
                    </button>
                    <div style="flex: 1;" />
                    <Show when=move || logged_in.get()>
                        <button type="button" style=SECONDARY_BUTTON_STYLE on:click=on_logout>
                            "Log out"
                        </button>
                    </Show>
                </div>
                <h1 style="margin: 0; font-size: 22px;">"Report a problem"</h1>
                {move || {
                    if logged_in.get() {
                        view! { <ReportForm /> }.into_any()
                    } else {
                        view! { <LoginForm /> }.into_any()
                    }
                }}
            </div>
        </div>
    }
}

#[component]
fn LoginForm() -> impl IntoView {
    let Api(api) = expect_context::<Api>();
    let Session(auth) = expect_context::<Session>();
    let banner = expect_context::<Banner>();

    let identifier = RwSignal::new(String::new());
    let secret = RwSignal::new(String::new());
    let submitting = RwSignal::new(false);

    let lifetime = ViewLifetime::begin();
    on_cleanup(move || lifetime.end());

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }
        let id = identifier.get_untracked();
        let pass = secret.get_untracked();
        if id.trim().is_empty() || pass.is_empty() {
            banner.show(FormError::MissingCredentials.to_string());
            return;
        }
        submitting.set(true);
        let client = api.get_value();
        spawn_local(async move {
            let result = client.login(&id, &pass).await;
            if !lifetime.is_alive() {
                return;
            }
            submitting.set(false);
            match result {
                Ok((_, session)) => {
                    banner.clear();
                    secret.set(String::new());
                    auth.set(session);
                }
                Err(err) => banner.show(err.to_string()),
            }
        });
    };

    view! {
        <form
            style="display: flex; flex-direction: column; gap: 14px; padding: 16px; border-radius: 8px; background: #ffffff; box-shadow: 0 1px 4px rgba(20,22,30,0.12);"
            on:submit=on_submit
        >
            <p style="margin: 0; font-size: 14px; color: #4b5160;">
                "Log in to report a problem."
            </p>
            <label style=LABEL_STYLE>
                "CPF"
                <input
                    type="text"
                    inputmode="numeric"
                    autocomplete="username"
                    style=FIELD_STYLE
                    prop:value=move || identifier.get()
                    on:input=move |ev| identifier.set(event_target_value(&ev))
                />
            </label>
            <label style=LABEL_STYLE>
                "Password"
                <input
                    type="password"
                    autocomplete="current-password"
                    style=FIELD_STYLE
                    prop:value=move || secret.get()
                    on:input=move |ev| secret.set(event_target_value(&ev))
                />
            </label>
            <button type="submit" style=PRIMARY_BUTTON_STYLE disabled=move || submitting.get()>
                {move || if submitting.get() { "Logging in…" } else { "Log in" }}
            </button>
        </form>
    }
}

#[component]
fn ReportForm() -> impl IntoView {
    let Api(api) = expect_context::<Api>();
    let Session(auth) = expect_context::<Session>();
    let banner = expect_context::<Banner>();

    let description = RwSignal::new(String::new());
    let category = RwSignal::new(None::<i64>);
    let address = RwSignal::new(String::new());
    let categories = RwSignal::new(Vec::<Category>::new());
    let location = RwSignal::new(LocationState::Pending);
    let submitting = RwSignal::new(false);
    let submitted = RwSignal::new(None::<String>);
    let photo_ref = NodeRef::<leptos::html::Input>::new();

    let lifetime = ViewLifetime::begin();
    on_cleanup(move || lifetime.end());

    spawn_local(async move {
        let state = geolocation::acquire().await;
        if lifetime.is_alive() {
            location.set(state);
        }
    });

    {
        let client = api.get_value();
        let session = auth.get_untracked();
        spawn_local(async move {
            let result = client.list_categories(&session).await;
            if !lifetime.is_alive() {
                return;
            }
            match result {
                Ok(list) => categories.set(list),
                Err(err) => banner.show(err.to_string()),
            }
        });
    }

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }
        let file = photo_ref
            .get_untracked()
            .and_then(|input| input.files())
            .and_then(|files| files.get(0));
        let draft = ProblemDraft {
            description: description.get_untracked(),
            category_id: category.get_untracked(),
            address: address.get_untracked(),
            coordinate: location.with_untracked(LocationState::coordinate),
            photo: file.as_ref().map(photo_meta),
        };
        let valid = match draft.validate() {
            Ok(valid) => valid,
            Err(err) => {
                banner.show(err.to_string());
                return;
            }
        };

        submitting.set(true);
        submitted.set(None);
        banner.clear();
        let client = api.get_value();
        let session = auth.get_untracked();
        spawn_local(async move {
            let result = client.create_problem(&session, &valid, file).await;
            if !lifetime.is_alive() {
                return;
            }
            submitting.set(false);
            match result {
                Ok(problem) => {
                    let reference = problem
                        .protocol
                        .clone()
                        .unwrap_or_else(|| format!("#{}", problem.id));
                    submitted.set(Some(reference));
                    description.set(String::new());
                    category.set(None);
                    address.set(String::new());
                    if let Some(input) = photo_ref.get_untracked() {
                        input.set_value("");
                    }
                }
                Err(err) => banner.show(err.to_string()),
            }
        });
    };

    let location_text = move || {
        location.with(|state| match state {
            LocationState::Pending => "Locating you…".to_string(),
            LocationState::Resolved {
                coordinate,
                used_fallback,
                ..
            } => {
                let suffix = if *used_fallback { " (default area)" } else { "" };
                format!(
                    "{:.5}, {:.5}{suffix}",
                    coordinate.latitude, coordinate.longitude
                )
            }
        })
    };

    view! {
        <form
            style="display: flex; flex-direction: column; gap: 14px; padding: 16px; border-radius: 8px; background: #ffffff; box-shadow: 0 1px 4px rgba(20,22,30,0.12);"
            on:submit=on_submit
        >
            {move || {
                submitted
                    .get()
                    .map(|reference| {
                        view! {
                            <div
                                role="status"
                                style="padding: 10px 12px; border-radius: 6px; background: #e7f6ec; color: #1d6b3a; font-size: 14px;"
                            >
                                "Problem submitted. Protocol: "
                                <strong>{reference}</strong>
                            </div>
                        }
                    })
            }}
            <label style=LABEL_STYLE>
                "Description"
                <textarea
                    rows="4"
                    style=FIELD_STYLE
                    prop:value=move || description.get()
                    on:input=move |ev| description.set(event_target_value(&ev))
                />
            </label>
            <label style=LABEL_STYLE>
                "Category"
                <select
                    style=FIELD_STYLE
                    prop:value=move || category.get().map(|id| id.to_string()).unwrap_or_default()
                    on:change=move |ev| category.set(event_target_value(&ev).parse::<i64>().ok())
                >
                    <option value="">"Choose a category"</option>
                    <For
                        each=move || categories.get()
                        key=|c| c.id
                        children=|c| view! { <option value=c.id.to_string()>{c.name}</option> }
                    />
                </select>
            </label>
            <label style=LABEL_STYLE>
                "Street address (optional)"
                <input
                    type="text"
                    autocomplete="street-address"
                    style=FIELD_STYLE
                    prop:value=move || address.get()
                    on:input=move |ev| address.set(event_target_value(&ev))
                />
            </label>
            <label style=LABEL_STYLE>
                "Photo (optional, JPEG or PNG up to 5 MB)"
                <input node_ref=photo_ref type="file" accept="image/jpeg,image/png" />
            </label>
            <div style="font-size: 14px; color: #4b5160;">
                "Location: " {location_text}
            </div>
            <button
                type="submit"
                style=PRIMARY_BUTTON_STYLE
                disabled=move || submitting.get() || !location.with(LocationState::is_resolved)
            >
                {move || if submitting.get() { "Submitting…" } else { "Submit" }}
            </button>
        </form>
    }
}

fn photo_meta(file: &web_sys::File) -> PhotoMeta {
    PhotoMeta {
        name: file.name(),
        mime: file.type_(),
        size: file.size() as u64,
    }
}
