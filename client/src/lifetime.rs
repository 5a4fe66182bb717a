use std::cell::{Cell, RefCell};
use std::collections::HashSet;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
    static LIVE: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

/// Marks one mounted instance of a view so async work started by it can tell
/// whether the view is still there when the work completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLifetime(u64);

impl ViewLifetime {
    pub fn begin() -> Self {
        let id = NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        LIVE.with(|live| live.borrow_mut().insert(id));
        Self(id)
    }

    pub fn is_alive(self) -> bool {
        LIVE.with(|live| live.borrow().contains(&self.0))
    }

    pub fn end(self) {
        LIVE.with(|live| live.borrow_mut().remove(&self.0));
    }
}

#[cfg(test)]
mod tests {
    use super::ViewLifetime;

    #[test]
    fn ended_lifetime_stays_dead() {
        let first = ViewLifetime::begin();
        let second = ViewLifetime::begin();
        assert_ne!(first, second);
        assert!(first.is_alive());

        first.end();
        assert!(!first.is_alive());
        assert!(second.is_alive());

        // A new mount never revives an old token.
        let third = ViewLifetime::begin();
        assert!(!first.is_alive());
        assert!(third.is_alive());
        second.end();
        third.end();
    }
}
