use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

/// Identity collaborator. Protocol internals live with the hosted identity
/// provider; this crate only needs the resolved session, if any.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Option<CurrentUser>;
}

/// An already-resolved session.
pub struct SessionAuth {
    user: Option<CurrentUser>,
}

impl SessionAuth {
    pub fn signed_in(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}
