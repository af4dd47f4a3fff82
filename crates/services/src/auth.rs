//! Sign-in / sign-out / current identity.

use std::sync::Arc;

use client::RequestOptions;
use common::{ServiceError, ServiceResponse};
use store::AuthUser;

use crate::ctx::Ctx;

pub struct AuthService {
    ctx: Arc<Ctx>,
}

impl AuthService {
    pub(crate) fn new(ctx: Arc<Ctx>) -> Self {
        Self { ctx }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResponse<AuthUser> {
        if !email.contains('@') {
            return ServiceResponse::failure(&ServiceError::validation("email is not a valid address"));
        }
        if password.is_empty() {
            return ServiceResponse::failure(&ServiceError::validation("password is required"));
        }
        let auth = Arc::clone(&self.ctx.auth);
        let email = email.to_string();
        let password = password.to_string();
        self.ctx
            .dispatcher
            .handle("auth.sign_in", RequestOptions::new().logged(), move || {
                let auth = Arc::clone(&auth);
                let email = email.clone();
                let password = password.clone();
                async move { auth.sign_in(&email, &password).await.map_err(ServiceError::from) }
            })
            .await
    }

    /// Signs out and drops every cached read; the next caller may be a
    /// different identity.
    pub async fn sign_out(&self) -> ServiceResponse<()> {
        let auth = Arc::clone(&self.ctx.auth);
        let resp = self
            .ctx
            .dispatcher
            .handle("auth.sign_out", RequestOptions::new().logged(), move || {
                let auth = Arc::clone(&auth);
                async move { auth.sign_out().await.map_err(ServiceError::from) }
            })
            .await;
        if resp.is_success() {
            self.ctx.cache.clear();
        }
        resp
    }

    pub async fn current_user(&self) -> ServiceResponse<Option<AuthUser>> {
        let auth = Arc::clone(&self.ctx.auth);
        self.ctx
            .dispatcher
            .handle("auth.current_user", RequestOptions::new(), move || {
                let auth = Arc::clone(&auth);
                async move { auth.current_user().await.map_err(ServiceError::from) }
            })
            .await
    }
}
