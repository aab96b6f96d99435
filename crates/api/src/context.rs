use wareflow_core::UserId;

/// Acting user of a request, taken from the `X-User-Id` header.
///
/// Used for attribution (`created_by`, transaction log `user_id`) only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user_id: UserId,
}

impl ActorContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
