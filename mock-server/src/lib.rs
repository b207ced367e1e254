use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// A stored book: free-form JSON attributes plus a server-assigned `id`.
pub type Book = Map<String, Value>;

pub type Db = Arc<RwLock<HashMap<String, Book>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/library", get(list_books).post(create_book))
        .route(
            "/library/{id}",
            get(get_book)
                .put(replace_book)
                .patch(patch_book)
                .delete(delete_book)
                .post(override_book),
        )
        .route("/library/{id}/summary", get(book_summary))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A decoded request body and any method override it carried.
struct Payload {
    fields: Book,
    method_override: Option<String>,
}

/// Decode a JSON or form-urlencoded body. Form fields named `model[x]` are
/// unwrapped to `x`, and `_method` is read as a method override. The
/// `X-HTTP-Method-Override` header takes precedence over `_method`.
fn decode_payload(headers: &HeaderMap, body: &str) -> Result<Payload, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let header_override = headers
        .get("x-http-method-override")
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_uppercase);

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let (fields, form_override) = decode_form(body)?;
        return Ok(Payload {
            fields,
            method_override: header_override.or(form_override),
        });
    }
    if body.trim().is_empty() {
        return Ok(Payload {
            fields: Map::new(),
            method_override: header_override,
        });
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(Payload {
            fields,
            method_override: header_override,
        }),
        Ok(_) => Err(StatusCode::UNPROCESSABLE_ENTITY),
        Err(_) => Err(StatusCode::BAD_REQUEST),
    }
}

fn decode_form(body: &str) -> Result<(Book, Option<String>), StatusCode> {
    let mut fields = Map::new();
    let mut method = None;
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key)?;
        let value = decode_component(raw_value)?;
        if key == "_method" {
            method = Some(value.to_ascii_uppercase());
            continue;
        }
        let name = key
            .strip_prefix("model[")
            .and_then(|k| k.strip_suffix(']'))
            .unwrap_or(&key)
            .to_string();
        fields.insert(name, Value::String(value));
    }
    Ok((fields, method))
}

fn decode_component(raw: &str) -> Result<String, StatusCode> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| StatusCode::BAD_REQUEST)
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn with_id(id: &str, fields: Book) -> Book {
    let mut book = Map::new();
    book.insert("id".to_string(), Value::String(id.to_string()));
    book.extend(fields.into_iter().filter(|(k, _)| k != "id"));
    book
}

async fn list_books(
    State(db): State<Db>,
    Query(filter): Query<HashMap<String, String>>,
) -> Json<Vec<Book>> {
    let books = db.read().await;
    Json(
        books
            .values()
            .filter(|book| {
                filter
                    .iter()
                    .all(|(k, v)| book.get(k).map(field_text).as_deref() == Some(v.as_str()))
            })
            .cloned()
            .collect(),
    )
}

async fn create_book(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<Book>), StatusCode> {
    let payload = decode_payload(&headers, &body)?;
    let id = Uuid::new_v4().to_string();
    let book = with_id(&id, payload.fields);
    db.write().await.insert(id.clone(), book.clone());
    debug!(%id, "created book");
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Book>, StatusCode> {
    let books = db.read().await;
    books.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_book(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, StatusCode> {
    let payload = decode_payload(&headers, &body)?;
    replace(&db, &id, payload.fields).await
}

async fn patch_book(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, StatusCode> {
    let payload = decode_payload(&headers, &body)?;
    merge(&db, &id, payload.fields).await
}

async fn delete_book(State(db): State<Db>, Path(id): Path<String>) -> Result<Response, StatusCode> {
    remove(&db, &id).await
}

/// `POST /library/{id}` from clients that cannot send PUT/PATCH/DELETE.
async fn override_book(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, StatusCode> {
    let payload = decode_payload(&headers, &body)?;
    debug!(%id, method = ?payload.method_override, "method override");
    match payload.method_override.as_deref() {
        Some("PUT") => replace(&db, &id, payload.fields).await,
        Some("PATCH") => merge(&db, &id, payload.fields).await,
        Some("DELETE") => remove(&db, &id).await,
        _ => Err(StatusCode::METHOD_NOT_ALLOWED),
    }
}

async fn book_summary(State(db): State<Db>, Path(id): Path<String>) -> Result<Response, StatusCode> {
    let books = db.read().await;
    let book = books.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let title = book.get("title").map(field_text).unwrap_or_default();
    let author = book.get("author").map(field_text).unwrap_or_default();
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{title} by {author}"),
    )
        .into_response())
}

async fn replace(db: &Db, id: &str, fields: Book) -> Result<Response, StatusCode> {
    let mut books = db.write().await;
    let book = books.get_mut(id).ok_or(StatusCode::NOT_FOUND)?;
    *book = with_id(id, fields);
    debug!(%id, "replaced book");
    Ok(Json(book.clone()).into_response())
}

async fn merge(db: &Db, id: &str, fields: Book) -> Result<Response, StatusCode> {
    let mut books = db.write().await;
    let book = books.get_mut(id).ok_or(StatusCode::NOT_FOUND)?;
    for (key, value) in fields.into_iter().filter(|(k, _)| k != "id") {
        book.insert(key, value);
    }
    debug!(%id, "patched book");
    Ok(Json(book.clone()).into_response())
}

async fn remove(db: &Db, id: &str) -> Result<Response, StatusCode> {
    let mut books = db.write().await;
    books
        .remove(id)
        .map(|_| {
            debug!(%id, "deleted book");
            StatusCode::NO_CONTENT.into_response()
        })
        .ok_or(StatusCode::NOT_FOUND)
}
