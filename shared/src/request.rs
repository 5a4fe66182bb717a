//! Request planning for the backend API.
//!
//! Every call is described as a [`RequestPlan`] before it is executed, so the
//! URL, headers, and body rules live here and stay testable without a browser.
//! The session token is never stored on a client object: it travels in an
//! [`AuthContext`] handed to each planning function.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::Operation;
use crate::report::ValidDraft;

pub const LOGIN_PATH: &str = "/auth/login";
pub const CREATE_PROBLEM_PATH: &str = "/api/problems/create";
pub const LIST_PROBLEMS_PATH: &str = "/api/problems/list";
pub const LIST_CATEGORIES_PATH: &str = "/api/categories/list";

/// Credentials for the current session, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Blank tokens are treated as absent.
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        Self {
            token: (!token.is_empty()).then(|| token.to_string()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub cpf: &'a str,
    pub senha: &'a str,
}

/// The full login response body. The token may arrive as `access_token`, `token`, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginResponse {
    /// The session the response grants, if it carried a usable token.
    pub fn auth_context(&self) -> Option<AuthContext> {
        [self.access_token.as_deref(), self.token.as_deref()]
            .into_iter()
            .flatten()
            .map(AuthContext::with_token)
            .find(AuthContext::is_authenticated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(String),
    /// Text parts of a multipart form. File parts are attached by the executor.
    Multipart(Vec<(&'static str, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub operation: Operation,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: RequestBody,
}

impl RequestPlan {
    fn new(config: &ClientConfig, operation: Operation, method: Method, path: &str) -> Self {
        Self {
            operation,
            method,
            url: config.url(path),
            headers: vec![("Accept", "application/json".to_string())],
            body: RequestBody::Empty,
        }
    }

    fn json(mut self, body: String) -> Self {
        self.headers
            .push(("Content-Type", "application/json".to_string()));
        self.body = RequestBody::Json(body);
        self
    }

    fn authorized(mut self, auth: &AuthContext) -> Self {
        if let Some(value) = auth.authorization_header() {
            self.headers.push(("Authorization", value));
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn plan_login(
    config: &ClientConfig,
    identifier: &str,
    secret: &str,
) -> Result<RequestPlan, serde_json::Error> {
    let body = serde_json::to_string(&LoginRequest {
        cpf: identifier.trim(),
        senha: secret,
    })?;
    Ok(RequestPlan::new(config, Operation::Login, Method::Post, LOGIN_PATH).json(body))
}

/// Multipart submission. `Content-Type` is left to the browser so it can add the boundary.
pub fn plan_create_problem(
    config: &ClientConfig,
    auth: &AuthContext,
    draft: &ValidDraft,
) -> RequestPlan {
    let mut plan = RequestPlan::new(
        config,
        Operation::CreateProblem,
        Method::Post,
        CREATE_PROBLEM_PATH,
    )
    .authorized(auth);
    plan.body = RequestBody::Multipart(draft.text_fields());
    plan
}

pub fn plan_list_problems(config: &ClientConfig, auth: &AuthContext) -> RequestPlan {
    RequestPlan::new(
        config,
        Operation::ListProblems,
        Method::Get,
        LIST_PROBLEMS_PATH,
    )
    .authorized(auth)
}

pub fn plan_list_categories(config: &ClientConfig, auth: &AuthContext) -> RequestPlan {
    RequestPlan::new(
        config,
        Operation::ListCategories,
        Method::Get,
        LIST_CATEGORIES_PATH,
    )
    .authorized(auth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::report::ProblemDraft;

    fn config() -> ClientConfig {
        ClientConfig::default()
    }

    #[test]
    fn login_token_is_sent_as_bearer_on_later_requests() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"access_token": "abc.def.ghi", "token_type": "bearer"}"#)
                .unwrap();
        let auth = response.auth_context().unwrap();

        let problems = plan_list_problems(&config(), &auth);
        assert_eq!(problems.header("authorization"), Some("Bearer abc.def.ghi"));
        let categories = plan_list_categories(&config(), &auth);
        assert_eq!(categories.header("Authorization"), Some("Bearer abc.def.ghi"));
    }

    #[test]
    fn anonymous_requests_carry_no_authorization() {
        let plan = plan_list_problems(&config(), &AuthContext::anonymous());
        assert_eq!(plan.header("Authorization"), None);
        assert_eq!(plan.header("Accept"), Some("application/json"));
        assert_eq!(plan.url, "http://localhost:8000/api/problems/list");
        assert_eq!(plan.method, Method::Get);
    }

    #[test]
    fn login_plan_posts_json_credentials() {
        let plan = plan_login(&config(), " 12345678909 ", "s3cret").unwrap();
        assert_eq!(plan.url, "http://localhost:8000/auth/login");
        assert_eq!(plan.method, Method::Post);
        assert_eq!(plan.header("Content-Type"), Some("application/json"));
        assert_eq!(
            plan.body,
            RequestBody::Json(r#"{"cpf":"12345678909","senha":"s3cret"}"#.into())
        );
    }

    #[test]
    fn login_response_accepts_token_alias_and_keeps_body() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"token": "t-1", "user": {"id": 3}}"#).unwrap();
        assert_eq!(response.auth_context(), Some(AuthContext::with_token("t-1")));
        assert!(response.extra.contains_key("user"));
    }

    #[test]
    fn login_response_with_both_token_keys_is_accepted() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"access_token": "a", "token": "a", "token_type": "bearer"}"#,
        )
        .unwrap();
        let auth = response.auth_context().unwrap();
        let plan = plan_list_problems(&config(), &auth);
        assert_eq!(plan.header("Authorization"), Some("Bearer a"));
    }

    #[test]
    fn blank_access_token_falls_back_to_token_key() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"access_token": " ", "token": "t-2"}"#).unwrap();
        assert_eq!(response.auth_context(), Some(AuthContext::with_token("t-2")));
    }

    #[test]
    fn login_response_without_token_grants_nothing() {
        let response: LoginResponse = serde_json::from_str(r#"{"access_token": ""}"#).unwrap();
        assert_eq!(response.auth_context(), None);
    }

    #[test]
    fn create_problem_is_multipart_without_content_type() {
        let draft = ProblemDraft {
            description: "Poste apagado".into(),
            category_id: Some(2),
            address: String::new(),
            coordinate: Some(Coordinate::new(-29.1, -51.2)),
            photo: None,
        }
        .validate()
        .unwrap();
        let plan = plan_create_problem(&config(), &AuthContext::with_token("tok"), &draft);
        assert_eq!(plan.url, "http://localhost:8000/api/problems/create");
        assert_eq!(plan.header("Content-Type"), None);
        assert_eq!(plan.header("Authorization"), Some("Bearer tok"));
        let RequestBody::Multipart(fields) = plan.body else {
            panic!("expected multipart body");
        };
        assert!(fields.contains(&("category_id", "2".to_string())));
        assert!(fields.contains(&("description", "Poste apagado".to_string())));
    }
}
