/// Guards work that must happen exactly once over an owner's lifetime.
///
/// The latch is reset only when the owner is torn down.
#[derive(Debug, Default, Clone)]
pub struct OnceLatch {
    fired: bool,
}

impl OnceLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` if the latch has not fired yet. Returns whether it ran.
    pub fn run(&mut self, work: impl FnOnce()) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        work();
        true
    }

    pub fn is_set(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}
