use quorumtoken_core::AccountId;

/// Identity of the caller for a request.
///
/// Taken from the `x-caller-id` header. Authenticating that header is the
/// deployment's job; this layer only parses it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: AccountId,
}

impl CallerContext {
    pub fn new(caller: AccountId) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> AccountId {
        self.caller
    }
}
