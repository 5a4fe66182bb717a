use gloo_storage::{LocalStorage, Storage};

use cidade_shared::config::TOKEN_STORAGE_KEY;
use cidade_shared::request::AuthContext;

/// Whether `localStorage` can be touched without throwing. Blocked site data
/// makes the getter throw, and gloo's accessors would then abort.
fn storage_available() -> bool {
    web_sys::window().is_some_and(|w| matches!(w.local_storage(), Ok(Some(_))))
}

/// The session persisted by a previous login, or an anonymous one.
pub fn load() -> AuthContext {
    if !storage_available() {
        log::warn!("localStorage is unavailable; starting without a saved session");
        return AuthContext::anonymous();
    }
    restore(LocalStorage::raw().get_item(TOKEN_STORAGE_KEY).ok().flatten())
}

fn restore(stored: Option<String>) -> AuthContext {
    stored.map_or_else(AuthContext::anonymous, AuthContext::with_token)
}

pub fn store(auth: &AuthContext) {
    let Some(token) = auth.token() else {
        clear();
        return;
    };
    if !storage_available() {
        log::warn!("localStorage is unavailable; the session will not survive a reload");
        return;
    }
    // Raw string, not JSON-encoded.
    if let Err(err) = LocalStorage::raw().set_item(TOKEN_STORAGE_KEY, token) {
        log::warn!("could not persist session token: {err:?}");
    }
}

pub fn clear() {
    if storage_available() {
        LocalStorage::delete(TOKEN_STORAGE_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::restore;
    use cidade_shared::request::AuthContext;

    #[test]
    fn missing_or_blank_token_restores_anonymous() {
        assert_eq!(restore(None), AuthContext::anonymous());
        assert_eq!(restore(Some("   ".into())), AuthContext::anonymous());
    }

    #[test]
    fn stored_token_restores_session() {
        let auth = restore(Some("abc".into()));
        assert!(auth.is_authenticated());
        assert_eq!(auth.token(), Some("abc"));
    }
}
