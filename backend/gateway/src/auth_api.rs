//! Sign-in endpoints backed by the hosted auth provider.

use axum::Json;
use axum::extract::{Extension, State};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use studymate_auth::{HostedAuthClient, SignUpOutcome};
use studymate_core::StudyError;

use crate::error::{ApiError, failed};
use crate::server::GatewayState;
use crate::session::{SESSION_COOKIE, SessionHandle};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

fn client(state: &GatewayState) -> Result<&HostedAuthClient, StudyError> {
    state.services.auth.as_deref().ok_or_else(|| {
        StudyError::AuthFailure("Sign-in is not available: no hosted backend is configured".into())
    })
}

/// `POST /api/auth/login`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn login(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError> {
    let client = client(&state).map_err(|e| failed(&session, "login", e))?;
    let auth = client
        .sign_in(&body.email, &body.password)
        .await
        .map_err(|e| failed(&session, "login", e))?;

    let mut ctx = session.context.lock().await;
    let reply = json!({ "user_id": auth.user_id, "email": auth.email });
    ctx.sign_out();
    ctx.auth = Some(auth);
    Ok(Json(reply))
}

/// `POST /api/auth/signup`
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn signup(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    Json(body): Json<SignupBody>,
) -> Result<Json<Value>, ApiError> {
    let client = client(&state).map_err(|e| failed(&session, "signup", e))?;
    let outcome = client
        .sign_up(&body.email, &body.password, &body.confirm)
        .await
        .map_err(|e| failed(&session, "signup", e))?;

    match outcome {
        SignUpOutcome::SignedIn(auth) => {
            let mut ctx = session.context.lock().await;
            let reply = json!({
                "status": "signed_in",
                "user_id": auth.user_id,
                "email": auth.email,
            });
            ctx.sign_out();
            ctx.auth = Some(auth);
            Ok(Json(reply))
        }
        SignUpOutcome::ConfirmationRequired { email } => Ok(Json(json!({
            "status": "confirmation_required",
            "email": email,
            "message": "Registration successful! Please check your email to confirm your account.",
        }))),
    }
}

/// `POST /api/auth/logout`: the session is dropped and its cookie cleared,
/// even when the provider cannot be reached.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn logout(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    {
        let mut ctx = session.context.lock().await;
        if let (Some(auth), Some(client)) = (ctx.auth.as_ref(), state.services.auth.as_deref()) {
            if let Err(e) = client.sign_out(&auth.access_token).await {
                warn!(error = %e, "Provider sign-out failed; clearing local session anyway");
            }
        }
        ctx.sign_out();
    }
    state.sessions.remove(&session.id).await;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "status": "logged_out" })))
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<GatewayState>,
    Extension(session): Extension<SessionHandle>,
) -> Json<Value> {
    let ctx = session.context.lock().await;
    Json(json!({
        "auth_enabled": state.services.auth.is_some(),
        "authenticated": ctx.auth.is_some(),
        "user_id": ctx.auth.as_ref().map(|a| a.user_id.clone()),
        "email": ctx.auth.as_ref().and_then(|a| a.email.clone()),
    }))
}
