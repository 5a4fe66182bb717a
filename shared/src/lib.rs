pub mod colors;
pub mod config;
pub mod error;
pub mod geo;
pub mod marker;
pub mod problem;
pub mod report;
pub mod request;
pub mod route;
pub mod tiles;
pub mod viewport;

pub use config::ClientConfig;
pub use error::{ApiError, FormError, Operation};
pub use geo::{Coordinate, FALLBACK_COORDINATE, LocationError, LocationState};
pub use marker::{Marker, MarkerKey, MarkerLayer, Popup};
pub use problem::{Category, CategoryIndex, Problem, ProblemStatus};
pub use report::{PhotoMeta, ProblemDraft, ValidDraft};
pub use request::{AuthContext, LoginResponse};
pub use route::Route;
pub use viewport::Viewport;
