// HTTP request handlers for the feed endpoints

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use std::time::SystemTime;

use crate::api::models::*;
use crate::api::server::AppState;
use crate::error::FeedError;
use crate::feed::{self, search};
use crate::identity::directory::IdentityLookup;
use crate::normalization::name;

fn with_cache(mut builder: HttpResponseBuilder, value: &str) -> HttpResponseBuilder {
    builder.insert_header((header::CACHE_CONTROL, value.to_string()));
    builder
}

fn bearer_token(req: &HttpRequest) -> &str {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("")
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    // Quick database connectivity check
    let db_status = match sqlx::query_scalar::<_, bool>("SELECT true")
        .persistent(false)
        .fetch_one(&state.db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let uptime = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: uptime,
    })
}

/// Paginated public feed with joined image URLs and resolved uploader identity.
pub async fn read_feed(query: web::Query<FeedQuery>, state: web::Data<AppState>) -> HttpResponse {
    let cache = state.cfg.feed_cache_control.as_str();

    let Some(directory) = state.directory.as_ref() else {
        let err = FeedError::MissingCredential("SUPABASE_SERVICE_ROLE_KEY");
        tracing::error!(error = %err, "feed request refused");
        return with_cache(HttpResponse::InternalServerError(), cache)
            .json(ErrorBody::new(err.to_string()));
    };
    let directory = Some(directory as &dyn IdentityLookup);
    let fallback = state.fallback.as_ref().map(|f| f as &dyn IdentityLookup);

    match feed::build_feed(&state.db, directory, fallback, &state.cfg, query.limit).await {
        Ok(page) => with_cache(HttpResponse::Ok(), cache).json(FeedResponse {
            captions: page.captions,
            images: page.images,
        }),
        Err(err) => {
            tracing::error!(error = %err, "feed request failed");
            with_cache(HttpResponse::InternalServerError(), cache)
                .json(ErrorBody::new(err.to_string()))
        }
    }
}

/// Substring search over captions, returning fully-resolved entries only.
pub async fn read_search(
    query: web::Query<SearchQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let cache = state.cfg.search_cache_control.as_str();
    let term = query.term.as_deref().unwrap_or("");

    let Some(directory) = state.directory.as_ref() else {
        let err = FeedError::MissingCredential("SUPABASE_SERVICE_ROLE_KEY");
        tracing::error!(error = %err, "search request refused");
        return with_cache(HttpResponse::InternalServerError(), cache)
            .json(ErrorBody::new(err.to_string()));
    };
    let directory = Some(directory as &dyn IdentityLookup);
    let fallback = state.fallback.as_ref().map(|f| f as &dyn IdentityLookup);

    match search::search_feed(&state.db, directory, fallback, &state.cfg, term, query.limit).await
    {
        Ok(memes) => with_cache(HttpResponse::Ok(), cache).json(SearchResponse { memes }),
        Err(err) => {
            tracing::error!(error = %err, "search request failed");
            with_cache(HttpResponse::InternalServerError(), cache)
                .json(ErrorBody::new(err.to_string()))
        }
    }
}

/// Validate the caller's bearer token and persist their identity onto every
/// caption row for the given image.
pub async fn stamp_uploader(
    req: HttpRequest,
    payload: web::Json<StampRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let Some(auth) = state.auth.as_ref() else {
        let err = FeedError::MissingCredential("SUPABASE_ANON_KEY");
        tracing::error!(error = %err, "stamp request refused");
        return HttpResponse::InternalServerError().json(ErrorBody::new(err.to_string()));
    };

    let token = bearer_token(&req);
    let image_id = payload.image_id.as_deref().unwrap_or("").trim();
    if token.is_empty() || image_id.is_empty() {
        return HttpResponse::BadRequest().json(ErrorBody::new("Missing token or imageId"));
    }

    let user = match auth.user_from_token(token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Unauthorized().json(ErrorBody::new("Invalid auth token"))
        }
        Err(err) => {
            tracing::error!(error = %err, "token validation failed");
            return HttpResponse::InternalServerError().json(ErrorBody::new(err.to_string()));
        }
    };

    let display_name = name::derive_name(&user.email);
    match state
        .db
        .stamp_uploader(image_id, &user.email, &display_name, &user.id)
        .await
    {
        Ok(true) => HttpResponse::Ok().json(StampResponse { ok: true }),
        Ok(false) => HttpResponse::InternalServerError()
            .json(ErrorBody::new(FeedError::NoUploaderColumns.to_string())),
        Err(err) => {
            tracing::error!(error = %err, "stamp update failed");
            HttpResponse::InternalServerError().json(ErrorBody::new(err.to_string()))
        }
    }
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorBody::new("Method not allowed"))
}
