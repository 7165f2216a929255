//! Request extractors for the signed-in viewer and the per-browser session.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE, request::Parts},
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;
use uuid::Uuid;

use crate::application::sessions::{OpenedSession, SharedView};
use crate::domain::entities::CurrentUser;

use super::HttpState;

/// Header set by the fronting proxy: `id` or `id:Display Name`.
pub const USER_HEADER: &str = "x-forwarded-user";
pub const SESSION_COOKIE: &str = "tagfeed_session";

pub struct Viewer(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(CurrentUser::from_header_value);
        Ok(Self(user))
    }
}

pub struct Session {
    opened: OpenedSession,
}

impl Session {
    pub fn view(&self) -> SharedView {
        self.opened.view.clone()
    }

    /// Attach the session cookie when this request started a new session.
    pub fn respond(&self, mut response: Response) -> Response {
        if !self.opened.created {
            return response;
        }
        match HeaderValue::from_str(&session_cookie(self.opened.id).to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(err) => {
                warn!(
                    target = "tagfeed::http::session",
                    error = %err,
                    "failed to encode session cookie"
                );
            }
        }
        response
    }
}

impl<S> FromRequestParts<S> for Session
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = HttpState::from_ref(state);
        let opened = state.sessions.open(session_id(&parts.headers));
        Ok(Self { opened })
    }
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value().trim()).ok())
}
