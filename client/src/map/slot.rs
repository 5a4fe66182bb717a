/// Holds at most one live instance of a resource.
///
/// Clearing the slot drops the instance, so whatever it releases in `Drop`
/// is gone before the next one can be created.
pub struct InstanceSlot<T> {
    current: Option<T>,
    created: u64,
}

impl<T> InstanceSlot<T> {
    pub const fn new() -> Self {
        Self {
            current: None,
            created: 0,
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }

    /// Number of instances constructed over the slot's lifetime.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Construct an instance unless one is already live. Returns whether one was built.
    pub fn ensure<E>(&mut self, create: impl FnOnce() -> Result<T, E>) -> Result<bool, E> {
        if self.current.is_some() {
            return Ok(false);
        }
        self.current = Some(create()?);
        self.created += 1;
        Ok(true)
    }

    /// Drop the live instance, if any.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }
}
