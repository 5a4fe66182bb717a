//! Executes the request plans from `cidade_shared::request` over `fetch`.

use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use serde::de::DeserializeOwned;
use web_sys::{AbortController, FormData};

use cidade_shared::config::ClientConfig;
use cidade_shared::error::{ApiError, Operation, normalize_failure};
use cidade_shared::problem::{Category, Problem};
use cidade_shared::report::ValidDraft;
use cidade_shared::request::{
    AuthContext, LoginResponse, Method, RequestBody, RequestPlan, plan_create_problem,
    plan_list_categories, plan_list_problems, plan_login,
};

use crate::session;

/// Multipart field name of the optional photo.
const PHOTO_FIELD: &str = "photo";

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Log in and persist the granted token.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<(LoginResponse, AuthContext), ApiError> {
        let op = Operation::Login;
        let plan = plan_login(&self.config, identifier, secret)
            .map_err(|_| op.fallback_error())?;
        let response: LoginResponse = self.fetch_json(&plan, None).await?;
        let Some(auth) = response.auth_context() else {
            log::warn!("login response carried no token");
            return Err(op.fallback_error());
        };
        session::store(&auth);
        log::info!("login succeeded");
        Ok((response, auth))
    }

    pub fn logout(&self) -> AuthContext {
        session::clear();
        log::info!("logged out");
        AuthContext::anonymous()
    }

    pub async fn create_problem(
        &self,
        auth: &AuthContext,
        draft: &ValidDraft,
        photo: Option<web_sys::File>,
    ) -> Result<Problem, ApiError> {
        let plan = plan_create_problem(&self.config, auth, draft);
        let problem: Problem = self.fetch_json(&plan, photo.as_ref()).await?;
        log::info!("problem {} submitted", problem.id);
        Ok(problem)
    }

    pub async fn list_problems(&self, auth: &AuthContext) -> Result<Vec<Problem>, ApiError> {
        let plan = plan_list_problems(&self.config, auth);
        let problems: Vec<Problem> = self.fetch_json(&plan, None).await?;
        log::info!("loaded {} problems", problems.len());
        Ok(problems)
    }

    pub async fn list_categories(&self, auth: &AuthContext) -> Result<Vec<Category>, ApiError> {
        let plan = plan_list_categories(&self.config, auth);
        let categories: Vec<Category> = self.fetch_json(&plan, None).await?;
        log::debug!("loaded {} categories", categories.len());
        Ok(categories)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        plan: &RequestPlan,
        photo: Option<&web_sys::File>,
    ) -> Result<T, ApiError> {
        let op = plan.operation;
        let body = self.execute(plan, photo).await?;
        serde_json::from_str(&body).map_err(|e| {
            log::warn!("{op:?}: unexpected response body: {e}");
            op.fallback_error()
        })
    }

    /// Send a plan and return the body of a successful response.
    ///
    /// Non-success statuses are normalized from the error envelope; transport
    /// failures and timeouts become the operation's fallback message.
    async fn execute(
        &self,
        plan: &RequestPlan,
        photo: Option<&web_sys::File>,
    ) -> Result<String, ApiError> {
        let op = plan.operation;
        log::debug!("{op:?}: {:?} {}", plan.method, plan.url);

        let controller = AbortController::new().map_err(|_| op.fallback_error())?;
        let signal = controller.signal();
        // Dropping the guard on return disarms the abort.
        let _deadline = Timeout::new(self.config.request_timeout_ms, move || {
            controller.abort();
        });

        let mut builder = match plan.method {
            Method::Get => Request::get(&plan.url),
            Method::Post => Request::post(&plan.url),
        };
        for (name, value) in &plan.headers {
            builder = builder.header(name, value);
        }
        builder = builder.abort_signal(Some(&signal));

        let request = match &plan.body {
            RequestBody::Empty => builder.build(),
            RequestBody::Json(json) => builder.body(json.as_str()),
            RequestBody::Multipart(fields) => {
                let form = multipart_form(fields, photo).map_err(|_| op.fallback_error())?;
                builder.body(form)
            }
        }
        .map_err(|e| {
            log::warn!("{op:?}: could not build request: {e}");
            op.fallback_error()
        })?;

        let response = request.send().await.map_err(|e| {
            if signal.aborted() {
                log::warn!(
                    "{op:?}: timed out after {} ms",
                    self.config.request_timeout_ms
                );
            } else {
                log::warn!("{op:?}: request failed: {e}");
            }
            op.fallback_error()
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            log::warn!("{op:?}: could not read response body: {e}");
            op.fallback_error()
        })?;

        if !response.ok() {
            let err = normalize_failure(op, &text);
            log::warn!("{op:?}: HTTP {status}: {err}");
            return Err(err);
        }
        Ok(text)
    }
}

fn multipart_form(
    fields: &[(&'static str, String)],
    photo: Option<&web_sys::File>,
) -> Result<FormData, wasm_bindgen::JsValue> {
    let form = FormData::new()?;
    for (name, value) in fields {
        form.append_with_str(name, value)?;
    }
    if let Some(file) = photo {
        form.append_with_blob_and_filename(PHOTO_FIELD, file, &file.name())?;
    }
    Ok(form)
}

