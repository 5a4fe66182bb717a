/// Top-level views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Map,
    RegisterProblem,
}

impl Route {
    /// Pure dispatch; unknown paths show the map.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/register-problem" => Self::RegisterProblem,
            _ => Self::Map,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Map => "/",
            Self::RegisterProblem => "/register-problem",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Map => "Cidade · Map",
            Self::RegisterProblem => "Cidade · Report a problem",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Route;

    #[test]
    fn dispatches_known_paths() {
        assert_eq!(Route::from_path("/"), Route::Map);
        assert_eq!(Route::from_path("/register-problem"), Route::RegisterProblem);
        assert_eq!(Route::from_path("/register-problem/"), Route::RegisterProblem);
    }

    #[test]
    fn unknown_paths_show_the_map() {
        assert_eq!(Route::from_path("/nowhere"), Route::Map);
        assert_eq!(Route::from_path(""), Route::Map);
    }

    #[test]
    fn path_roundtrips_through_dispatch() {
        for route in [Route::Map, Route::RegisterProblem] {
            assert_eq!(Route::from_path(route.path()), route);
        }
    }
}
