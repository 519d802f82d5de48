use actix_web::http::header::LOCATION;
use actix_web::web::{Bytes, Data};
use actix_web::{Error, HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use serde::de::DeserializeOwned;

use crate::api::{BookId, BooksQuery, CreateBookRequest, UpdateBookRequest};
use crate::auth::{AuthorizationGate, BearerToken};
use crate::books_service::BookService;
use crate::error::ApiError;

/// Write handlers take the raw body and parse it only once the caller is authorized
fn parse_body<T: DeserializeOwned>(body: &[u8], path: &str) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {}", err), path))
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
/// Lists books, optionally only those which author name contains `authorName`
pub async fn get_books(
    req: HttpRequest,
    books_service: Data<BookService>,
    query: web::Query<BooksQuery>,
) -> Result<HttpResponse, Error> {
    let author_name = query
        .into_inner()
        .author_name
        .filter(|author_name| !author_name.trim().is_empty());

    let books = match author_name {
        Some(author_name) => {
            tracing::info!("Get books filtering by authorName equals to {}", author_name);
            books_service.list_by_author(&author_name).await
        }
        None => {
            tracing::info!("Get books");
            books_service.list_all().await
        }
    }
    .map_err(|err| ApiError::from_service(err, req.path()))?;

    Ok(HttpResponse::Ok().json(books))
}

#[api_v2_operation]
pub async fn get_book(
    req: HttpRequest,
    books_service: Data<BookService>,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let book_id = book_id.into_inner();
    tracing::info!("Get book with id equals to {}", book_id);
    let book = books_service
        .get_or_fail(&book_id)
        .await
        .map_err(|err| ApiError::from_service(err, req.path()))?;

    Ok(HttpResponse::Ok().json(book))
}

#[api_v2_operation]
pub async fn create_book(
    req: HttpRequest,
    books_service: Data<BookService>,
    authorization_gate: Data<AuthorizationGate>,
    bearer_token: BearerToken,
    body: Bytes,
) -> Result<HttpResponse, Error> {
    let principal = authorization_gate
        .authorize_bearer(&bearer_token, req.path())
        .await?;
    let request: CreateBookRequest = parse_body(&body, req.path())?;
    tracing::info!(
        "Post request made by {} to create a book {:?}",
        principal.name,
        request
    );
    let details = request
        .validate()
        .map_err(|errors| ApiError::validation(errors, req.path()))?;

    let book = books_service
        .create(details)
        .await
        .map_err(|err| ApiError::from_service(err, req.path()))?;

    Ok(HttpResponse::Created()
        .append_header((LOCATION, format!("/api/books/{}", book.id)))
        .json(book))
}

#[api_v2_operation]
pub async fn update_book(
    req: HttpRequest,
    books_service: Data<BookService>,
    authorization_gate: Data<AuthorizationGate>,
    bearer_token: BearerToken,
    book_id: web::Path<BookId>,
    body: Bytes,
) -> Result<HttpResponse, Error> {
    let principal = authorization_gate
        .authorize_bearer(&bearer_token, req.path())
        .await?;
    let book_id = book_id.into_inner();
    let patch: UpdateBookRequest = parse_body(&body, req.path())?;
    tracing::info!(
        "Patch request made by {} to update book with id {}. New values {:?}",
        principal.name,
        book_id,
        patch
    );
    patch
        .validate()
        .map_err(|errors| ApiError::validation(errors, req.path()))?;

    let book = books_service
        .update(&book_id, patch)
        .await
        .map_err(|err| ApiError::from_service(err, req.path()))?;

    Ok(HttpResponse::Ok().json(book))
}

#[api_v2_operation]
pub async fn delete_book(
    req: HttpRequest,
    books_service: Data<BookService>,
    authorization_gate: Data<AuthorizationGate>,
    bearer_token: BearerToken,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    let principal = authorization_gate
        .authorize_bearer(&bearer_token, req.path())
        .await?;
    let book_id = book_id.into_inner();
    tracing::info!(
        "Delete request made by {} to remove book with id {}",
        principal.name,
        book_id
    );
    let book = books_service
        .delete(&book_id)
        .await
        .map_err(|err| ApiError::from_service(err, req.path()))?;

    Ok(HttpResponse::Ok().json(book))
}
