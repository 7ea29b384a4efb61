/// User directory endpoint
///
/// `GET /api/users` lists every account as `{id, username, role}`, ordered
/// by id. Requires a session.

use crate::{
    app::AppState,
    error::{ApiResult, Json},
};
use axum::extract::State;
use taskdesk_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserSummary},
};

pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(User::list_summaries(&state.db).await?))
}
