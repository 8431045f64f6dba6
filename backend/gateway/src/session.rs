//! Cookie-keyed session attachment.
//!
//! Runs before the session-scoped routes: finds the caller's [`SessionContext`] by cookie,
//! or starts a new one and sets the cookie on the way out.
//!
//! [`SessionContext`]: crate::session_registry::SessionContext

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tracing::debug;

use crate::server::GatewayState;
use crate::session_registry::{SessionId, SharedContext};

pub const SESSION_COOKIE: &str = "studymate_session";

/// The current request's session, available to handlers as an extension.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub context: SharedContext,
}

pub async fn attach_session(
    State(state): State<GatewayState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            let id = cookie.value().to_string();
            state.sessions.get(&id).await.map(|context| SessionHandle { id, context })
        }
        None => None,
    };

    let (handle, fresh) = match existing {
        Some(handle) => (handle, false),
        None => {
            let (id, context) = state.sessions.create().await;
            debug!(session_id = %id, "Started session");
            (SessionHandle { id, context }, true)
        }
    };

    let id = handle.id.clone();
    request.extensions_mut().insert(handle);
    let response = next.run(request).await;

    if fresh {
        let cookie = Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}
