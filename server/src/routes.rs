//! Demo application: two areas sharing one session
//!
//! `/shop` and `/admin` run the same handlers behind different key prefixes,
//! so each keeps its own cart. Keys listed in the shared set (e.g. `lang`) and
//! temp data are visible to both areas and to the unprefixed `/lang` route.

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::middleware::{SessionKeyPrefixLayer, SessionLayerState, session_middleware};
use crate::session::{KeyPrefix, PrefixError, Session, SessionError};

const CART_KEY: &str = "cart";
const LANG_KEY: &str = "lang";
const NOTICE_KEY: &str = "notice";

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub item: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CartResponse {
    /// Prefix the handler ran under, `None` outside any area
    pub area: Option<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LangBody {
    pub lang: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoticeBody {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub destroyed: bool,
}

fn area_of(session: &Session) -> Option<String> {
    session.prefix().map(ToString::to_string)
}

/// GET /<area>/cart
pub async fn get_cart(session: Session) -> Result<Json<CartResponse>, SessionError> {
    let items = session.get::<Vec<String>>(CART_KEY)?.unwrap_or_default();
    Ok(Json(CartResponse {
        area: area_of(&session),
        items,
    }))
}

/// POST /<area>/cart
pub async fn add_to_cart(
    session: Session,
    Json(body): Json<AddItem>,
) -> Result<Json<CartResponse>, SessionError> {
    let mut items = session.get::<Vec<String>>(CART_KEY)?.unwrap_or_default();
    items.push(body.item);
    session.insert(CART_KEY, &items)?;

    Ok(Json(CartResponse {
        area: area_of(&session),
        items,
    }))
}

/// GET /lang and GET /<area>/lang
pub async fn get_lang(session: Session) -> Result<Json<LangBody>, SessionError> {
    Ok(Json(LangBody {
        lang: session.get(LANG_KEY)?,
    }))
}

/// POST /lang and POST /<area>/lang
pub async fn set_lang(
    session: Session,
    Json(body): Json<LangBody>,
) -> Result<Json<LangBody>, SessionError> {
    match &body.lang {
        Some(lang) => session.insert(LANG_KEY, lang)?,
        None => {
            session.remove(LANG_KEY)?;
        }
    }
    Ok(Json(body))
}

/// POST /<area>/notice: stash a one-shot message
pub async fn post_notice(
    session: Session,
    Json(body): Json<NoticeBody>,
) -> Result<Json<NoticeBody>, SessionError> {
    if let Some(message) = &body.message {
        session.set_temp(NOTICE_KEY, message)?;
    }
    Ok(Json(body))
}

/// GET /<area>/notice: consume the stashed message
pub async fn take_notice(session: Session) -> Result<Json<NoticeBody>, SessionError> {
    Ok(Json(NoticeBody {
        message: session.take_temp(NOTICE_KEY)?,
    }))
}

/// POST /logout: end the session for every area at once
pub async fn logout(session: Session) -> Json<LogoutResponse> {
    Json(LogoutResponse {
        destroyed: session.destroy(),
    })
}

/// Routes of one area, namespaced by `prefix`
pub fn area_routes(prefix: KeyPrefix) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_to_cart))
        .route("/lang", get(get_lang).post(set_lang))
        .route("/notice", get(take_notice).post(post_notice))
        .route_layer(SessionKeyPrefixLayer::new(prefix))
}

/// Build the session-backed part of the application
pub fn app_routes(state: SessionLayerState, shared_keys: &[String]) -> Result<Router, PrefixError> {
    let shop = KeyPrefix::new("shop", shared_keys.iter().cloned())?;
    let admin = KeyPrefix::new("admin", shared_keys.iter().cloned())?;

    Ok(Router::new()
        .nest("/shop", area_routes(shop))
        .nest("/admin", area_routes(admin))
        .route("/lang", get(get_lang).post(set_lang))
        .route("/logout", post(logout))
        .layer(from_fn_with_state(state, session_middleware)))
}
