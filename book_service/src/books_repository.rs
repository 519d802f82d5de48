pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{Book, BookDetails, BookId};

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Document store holding books, keyed by an id it assigns itself
#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Adds book to repository, returns the stored book with the id assigned to it
    async fn add_book(&self, details: BookDetails) -> Result<Book, BookRepositoryError>;
    /// Replaces the whole stored book, returns false if there was no book with this id
    async fn save_book(&self, book: Book) -> Result<bool, BookRepositoryError>;
    /// Retrieves the book from repository, None if there is no book with this id
    async fn get_book(&self, book_id: &BookId) -> Result<Option<Book>, BookRepositoryError>;
    /// Lists all books in the repository
    async fn list_books(&self) -> Result<Vec<Book>, BookRepositoryError>;
    /// Lists books which author name contains given text (case-sensitive)
    async fn find_books_by_author_name(
        &self,
        author_name: &str,
    ) -> Result<Vec<Book>, BookRepositoryError>;
    /// Removes the book, returns false if there was no book with this id
    async fn delete_book(&self, book_id: &BookId) -> Result<bool, BookRepositoryError>;
}
