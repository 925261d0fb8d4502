//! Auth callback: where the provider sends the browser back.
//!
//! Fragments never reach a server, so `GET` serves a shell that posts the
//! full browser URL back to `POST`, which runs the resolver.
//!
//! The resolver runs in its own task. A dropped request cancels the flag
//! but never the provider call; the task finishes it and discards the
//! result.

use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use url::Url;

use crate::auth::callback::{self as resolver, CancelFlag};
use crate::render;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CallbackForm {
    #[serde(default)]
    url: String,
}

/// `GET /auth/callback`
pub async fn shell() -> Response {
    render::callback_shell().into_response()
}

/// `POST /auth/callback`: resolve the posted URL and persist the outcome.
pub async fn complete(State(state): State<AppState>, jar: CookieJar, Form(form): Form<CallbackForm>) -> Response {
    let url = match Url::parse(&form.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable callback url, resolving without params");
            match Url::parse(&state.config.callback_url()) {
                Ok(url) => url,
                Err(_) => return StatusCode::BAD_REQUEST.into_response(),
            }
        }
    };

    let client = state.session_client(&jar);
    let cancel = CancelFlag::new();
    let _cancel_on_drop = cancel.cancel_on_drop();

    let task = tokio::spawn({
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        let mut url = url;
        async move {
            let outcome = resolver::resolve(&client, &mut url, &cancel).await;
            if outcome.is_none() {
                tracing::debug!("callback request gone, late resolution discarded");
            }
            outcome
        }
    });

    let outcome = match task.await {
        Ok(Some(outcome)) => outcome,
        // Only a cancelled flag yields `None`, and the flag is cancelled on drop.
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "callback resolution task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let jar = state.persist(jar, &client);
    match outcome {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "callback resolved");
            (jar, render::callback_result(Ok(()))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "callback failed");
            (jar, render::callback_result(Err(&e.to_string()))).into_response()
        }
    }
}

#[cfg(test)]
#[path = "callback_test.rs"]
mod tests;
