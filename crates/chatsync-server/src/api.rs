use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use chatsync_shared::constants::WS_PATH;
use chatsync_shared::{
    Conversation, ConversationId, Message, MessageContent, UserId, UserSummary, ValidationError,
};
use chatsync_store::{NewUser, StoreError};

use crate::auth::{issue_token, IdentityService, TokenIdentity};
use crate::config::ServerConfig;
use crate::contacts::{ContactAdded, ContactService};
use crate::emitter::ContactEventEmitter;
use crate::error::ServerError;
use crate::fanout::MessageFanout;
use crate::presence::PresenceBroadcaster;
use crate::registry::ConnectionRegistry;
use crate::store::DurableStore;
use crate::ws::ws_handler;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DurableStore>,
    pub identity: Arc<dyn IdentityService>,
    pub registry: ConnectionRegistry,
    pub fanout: MessageFanout,
    pub contacts: ContactService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire every service around `store`. The registry created here lives
    /// as long as the returned state and its clones.
    pub fn new(store: Arc<dyn DurableStore>, config: ServerConfig) -> Self {
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(config.presence_mode));
        let identity: Arc<dyn IdentityService> = Arc::new(TokenIdentity::new(store.clone()));
        let fanout = MessageFanout::new(store.clone(), registry.clone());
        let contacts = ContactService::new(store.clone(), ContactEventEmitter::new(registry.clone()));

        Self {
            store,
            identity,
            registry,
            fanout,
            contacts,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/users/signup", post(signup))
        .route("/api/users/me", get(whoami))
        .route("/api/users/add-contact", post(add_contact))
        .route("/api/users/create-group", post(create_group))
        .route("/api/users/contacts", get(list_contacts))
        .route("/api/users/online", get(online_users))
        .route("/api/messages/conversations", get(list_conversations))
        .route("/api/messages/:id", get(get_messages))
        .route("/api/messages/send/:id", post(send_message))
        .route(WS_PATH, get(ws_handler))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    online_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    username: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    bio: String,
}

#[derive(Serialize)]
struct SignupResponse {
    user: UserSummary,
    token: String,
}

#[derive(Deserialize)]
struct AddContactRequest {
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    participants: Vec<UserId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OnlineUsersResponse {
    user_ids: Vec<UserId>,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller from the bearer header. Touches the store, so call it
/// from inside [`blocking`].
fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<UserId, ServerError> {
    let token = bearer_token(headers).ok_or(ServerError::Unauthorized)?;
    Ok(state.identity.authenticate(token)?)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        online_count: state.registry.online_users().len(),
    })
}

/// Run store-bound request work on the blocking pool so SQLite calls never
/// stall the runtime's worker threads.
async fn blocking<T, F>(state: AppState, f: F) -> Result<T, ServerError>
where
    F: FnOnce(AppState) -> Result<T, ServerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(state))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ServerError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ValidationError::MissingField("username").into());
    }

    blocking(state, move |state| {
        if state.store.find_user_by_username(&username)?.is_some() {
            return Err(ValidationError::UsernameTaken(username).into());
        }

        let (token, token_hash) = issue_token();
        let full_name = match req.full_name.trim() {
            "" => username.clone(),
            name => name.to_string(),
        };
        let user = state
            .store
            .create_user(&NewUser {
                username: username.clone(),
                full_name,
                bio: req.bio,
                profile_pic: None,
                token_hash,
            })
            .map_err(|e| match e {
                StoreError::Conflict => ValidationError::UsernameTaken(username.clone()).into(),
                other => ServerError::from(other),
            })?;

        info!(user = %user.id, username = %user.username, "User signed up");
        Ok((StatusCode::CREATED, Json(SignupResponse { user, token })))
    })
    .await
}

async fn whoami(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<UserSummary>, ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;
        Ok(Json(state.store.get_user(me)?))
    })
    .await
}

async fn add_contact(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<AddContactRequest>,
) -> Result<Json<ContactAdded>, ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;
        Ok(Json(state.contacts.add_contact(me, &req.username)?))
    })
    .await
}

async fn create_group(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Conversation>), ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;
        let group = state.contacts.create_group(me, &req.name, &req.participants)?;
        Ok((StatusCode::CREATED, Json(group)))
    })
    .await
}

async fn list_contacts(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSummary>>, ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;
        Ok(Json(state.store.list_contacts(me)?))
    })
    .await
}

async fn online_users(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<OnlineUsersResponse>, ServerError> {
    blocking(state, move |state| {
        authenticate(&headers, &state)?;
        Ok(Json(OnlineUsersResponse {
            user_ids: state.registry.online_users(),
        }))
    })
    .await
}

async fn list_conversations(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Conversation>>, ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;
        Ok(Json(state.store.find_conversations_by_participant(me)?))
    })
    .await
}

/// Full history in ascending order. Marks everything as seen by the caller.
async fn get_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<Vec<Message>>, ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;

        let conversation = match state.store.get_conversation(id) {
            Ok(conversation) => conversation,
            Err(StoreError::NotFound) => {
                return Err(ServerError::NotFound(format!("conversation {id}")))
            }
            Err(e) => return Err(e.into()),
        };
        if !conversation.has_participant(me) {
            return Err(ServerError::Forbidden(
                "Not a participant of this conversation".into(),
            ));
        }

        state.store.mark_seen(id, me)?;
        Ok(Json(state.store.find_messages_by_conversation(id)?))
    })
    .await
}

async fn send_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ConversationId>,
    Json(content): Json<MessageContent>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    blocking(state, move |state| {
        let me = authenticate(&headers, &state)?;
        let message = state.fanout.send(id, me, content)?;
        Ok((StatusCode::CREATED, Json(message)))
    })
    .await
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
