use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, dev::Payload};
use std::future::{Ready, ready};
use uuid::Uuid;

use blogicum_core::Viewer;

use super::auth::{Identity, authenticate};
use super::csrf::CsrfToken;

/// Client data for a single request cycle, passed to every page template.
#[derive(Clone, Debug, Default)]
pub struct ClientCtx {
    /// User data. None is a guest.
    client: Option<Identity>,
    /// CSRF token for form protection.
    csrf_token: String,
}

impl ClientCtx {
    pub fn new(client: Option<Identity>, csrf_token: String) -> Self {
        Self { client, csrf_token }
    }

    /// Same request, seen as a guest. Used right after logging out.
    pub fn as_guest(&self) -> Self {
        Self {
            client: None,
            csrf_token: self.csrf_token.clone(),
        }
    }

    /// Same request, as the given user. Used right after logging in.
    pub fn as_user(&self, identity: Identity) -> Self {
        Self {
            client: Some(identity),
            csrf_token: self.csrf_token.clone(),
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<Uuid> {
        self.client.as_ref().map(|u| u.user_id)
    }

    /// Returns the user's name, empty for guests.
    pub fn get_name(&self) -> &str {
        self.client.as_ref().map(|u| u.username.as_str()).unwrap_or("")
    }

    pub fn get_csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn is_user(&self) -> bool {
        self.client.is_some()
    }

    pub fn viewer(&self) -> Viewer {
        Viewer::from(self.get_id())
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let csrf_token = req
            .extensions()
            .get::<CsrfToken>()
            .map(|t| t.0.clone())
            .unwrap_or_default();

        ready(Ok(ClientCtx::new(authenticate(req).ok(), csrf_token)))
    }
}
