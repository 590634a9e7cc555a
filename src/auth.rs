use crate::entities::UserId;

/// the authentication collaborator: who is acting right now, if anyone.
///
/// mutating operations require a resolved identity; readers work without
/// one. implementations live in the embedding UI layer.
pub trait AuthProvider {
    fn current_user_id(&self) -> Option<UserId>;
}

/// an `AuthProvider` pinned to one identity (or none). enough for UIs with
/// a session resolved up-front, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAuth(pub Option<UserId>);

impl AuthProvider for FixedAuth {
    fn current_user_id(&self) -> Option<UserId> { self.0 }
}
