use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument};

use crate::mail;
use crate::state::AppState;

use super::dto::{ContactRequest, ContactResponse};
use super::repo::Contact;

#[instrument(skip(state, payload))]
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), (StatusCode, String)> {
    if payload.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".into()));
    }

    let contact = Contact::create(
        &state.db,
        payload.first_name.trim(),
        payload.last_name.trim(),
        payload.email.trim(),
        payload.message.trim(),
    )
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let ctx = mail::messages::contact_mail(&state.config, &contact);
    let mailer = Arc::clone(&state.mailer);
    tokio::spawn(async move {
        let status = mail::deliver(mailer.as_ref(), &ctx, "contact").await;
        info!(%status, "contact mail");
    });

    info!(contact_id = %contact.id, "contact stored");
    Ok((StatusCode::CREATED, Json(ContactResponse { id: contact.id })))
}
