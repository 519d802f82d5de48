use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;

use crate::api::{Book, BookId, CreateBookRequest, ErrorMessage, UpdateBookRequest};

pub struct BookServiceClient {
    url: String,
    access_token: Option<String>,
    client: ClientWithMiddleware,
}

impl BookServiceClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        // Every request is sent at most once
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            access_token: None,
            client,
        })
    }

    /// Bearer token sent with write requests
    pub fn with_access_token(mut self, access_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Calls GET /api/books endpoint, optionally filtered by author name
    pub async fn list_books(&self, author_name: Option<&str>) -> anyhow::Result<Vec<Book>> {
        let mut request = self.client.get(format!("{}/api/books", self.url));
        if let Some(author_name) = author_name {
            request = request.query(&[("authorName", author_name)]);
        }
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            bail!("Failed to list books {}", response.status())
        }
    }

    /// Calls GET /api/books/{book_id} endpoint
    /// Returns None if book is not in the repository
    pub async fn get_book(&self, book_id: &BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/api/books/{}", self.url, book_id))
            .send()
            .await?;
        Self::book_or_none(response).await
    }

    /// Calls POST /api/books endpoint
    pub async fn create_book(&self, request: &CreateBookRequest) -> anyhow::Result<Book> {
        let response = self
            .authorized(self.client.post(format!("{}/api/books", self.url)))
            .json(request)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            bail!("Failed to add book {}", Self::describe_failure(response).await)
        }
        Ok(response.json().await?)
    }

    /// Calls PATCH /api/books/{book_id} endpoint
    /// Returns None if book is not in the repository
    pub async fn update_book(
        &self,
        book_id: &BookId,
        patch: &UpdateBookRequest,
    ) -> anyhow::Result<Option<Book>> {
        let response = self
            .authorized(
                self.client
                    .patch(format!("{}/api/books/{}", self.url, book_id)),
            )
            .json(patch)
            .send()
            .await?;
        Self::book_or_none(response).await
    }

    /// Calls DELETE /api/books/{book_id} endpoint
    /// Returns the deleted book, None if book was not in the repository
    pub async fn delete_book(&self, book_id: &BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .authorized(
                self.client
                    .delete(format!("{}/api/books/{}", self.url, book_id)),
            )
            .send()
            .await?;
        Self::book_or_none(response).await
    }

    async fn book_or_none(response: reqwest::Response) -> anyhow::Result<Option<Book>> {
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Request failed {}", Self::describe_failure(response).await)
        }
    }

    async fn describe_failure(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorMessage>().await {
            Ok(error) => format!("{}: {}", status, error.message),
            Err(_) => status.to_string(),
        }
    }
}

#[cfg(test)]
mod client_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use actix_web::{web, App, HttpResponse, HttpServer};

    use crate::api::CreateBookRequest;
    use crate::client::BookServiceClient;

    #[actix_web::test]
    async fn test_failed_create_is_not_resent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let server_calls = calls.clone();
        let server = HttpServer::new(move || {
            let calls = server_calls.clone();
            App::new().default_service(web::to(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { HttpResponse::ServiceUnavailable().finish() }
            }))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let client = BookServiceClient::new(&format!("http://127.0.0.1:{}", port))
            .unwrap()
            .with_access_token("admin-token");
        let result = client
            .create_book(&CreateBookRequest::new("Ivan Franchin", "SpringBoot", 10.99))
            .await;
        handle.stop(false).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
