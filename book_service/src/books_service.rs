use std::sync::Arc;

use crate::api::{Book, BookDetails, BookId, UpdateBookRequest};
use crate::books_repository::{BookRepository, BookRepositoryError};

#[derive(thiserror::Error, Debug)]
pub enum BookServiceError {
    #[error("Book with id '{0}' not found.")]
    NotFound(BookId),

    #[error(transparent)]
    Repository(#[from] BookRepositoryError),
}

/// Copies every field present in the patch onto the target book, the id is never touched
pub fn merge_patch(target: Book, patch: UpdateBookRequest) -> Book {
    Book {
        id: target.id,
        author_name: patch.author_name.unwrap_or(target.author_name),
        title: patch.title.unwrap_or(target.title),
        price: patch.price.unwrap_or(target.price),
    }
}

/// The only component mutating stored books.
/// Every operation on an existing book goes through `get_or_fail` first.
pub struct BookService {
    books_repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(books_repository: Arc<dyn BookRepository>) -> Self {
        Self { books_repository }
    }

    pub async fn list_all(&self) -> Result<Vec<Book>, BookServiceError> {
        Ok(self.books_repository.list_books().await?)
    }

    pub async fn list_by_author(&self, author_name: &str) -> Result<Vec<Book>, BookServiceError> {
        Ok(self
            .books_repository
            .find_books_by_author_name(author_name)
            .await?)
    }

    /// Expects already validated details
    pub async fn create(&self, details: BookDetails) -> Result<Book, BookServiceError> {
        let book = self.books_repository.add_book(details).await?;
        tracing::debug!(book_id = %book.id, "Book created");
        Ok(book)
    }

    pub async fn get_or_fail(&self, book_id: &BookId) -> Result<Book, BookServiceError> {
        self.books_repository
            .get_book(book_id)
            .await?
            .ok_or_else(|| BookServiceError::NotFound(book_id.clone()))
    }

    pub async fn update(
        &self,
        book_id: &BookId,
        patch: UpdateBookRequest,
    ) -> Result<Book, BookServiceError> {
        let book = self.get_or_fail(book_id).await?;
        let merged = merge_patch(book, patch);
        // The book may have been deleted in the meantime
        if !self.books_repository.save_book(merged.clone()).await? {
            return Err(BookServiceError::NotFound(book_id.clone()));
        }
        Ok(merged)
    }

    /// Returns the book as it was right before removal
    pub async fn delete(&self, book_id: &BookId) -> Result<Book, BookServiceError> {
        let book = self.get_or_fail(book_id).await?;
        if !self.books_repository.delete_book(book_id).await? {
            return Err(BookServiceError::NotFound(book_id.clone()));
        }
        Ok(book)
    }
}

#[cfg(test)]
mod books_service_tests {
    use std::sync::Arc;

    use crate::api::{Book, BookDetails, UpdateBookRequest};
    use crate::books_repository::InMemoryBookRepository;
    use crate::books_service::{merge_patch, BookService, BookServiceError};

    fn service() -> BookService {
        BookService::new(Arc::new(InMemoryBookRepository::default()))
    }

    fn details(author_name: &str, title: &str, price: f64) -> BookDetails {
        BookDetails {
            author_name: author_name.to_string(),
            title: title.to_string(),
            price,
        }
    }

    fn book() -> Book {
        Book {
            id: "1".to_string(),
            author_name: "Ivan Franchin".to_string(),
            title: "SpringBoot".to_string(),
            price: 10.99,
        }
    }

    #[test]
    fn test_merge_of_empty_patch_keeps_book() {
        assert_eq!(merge_patch(book(), UpdateBookRequest::default()), book());
    }

    #[test]
    fn test_merge_overwrites_only_present_fields() {
        let author_patch = UpdateBookRequest {
            author_name: Some("Ivan G. Franchin".to_string()),
            ..UpdateBookRequest::default()
        };
        assert_eq!(
            merge_patch(book(), author_patch),
            Book {
                author_name: "Ivan G. Franchin".to_string(),
                ..book()
            }
        );

        let title_patch = UpdateBookRequest {
            title: Some("Java 16".to_string()),
            ..UpdateBookRequest::default()
        };
        assert_eq!(
            merge_patch(book(), title_patch),
            Book {
                title: "Java 16".to_string(),
                ..book()
            }
        );

        let price_patch = UpdateBookRequest {
            price: Some(20.5),
            ..UpdateBookRequest::default()
        };
        assert_eq!(
            merge_patch(book(), price_patch),
            Book {
                price: 20.5,
                ..book()
            }
        );
    }

    #[tokio::test]
    async fn test_create_assigns_id_resolvable_by_get() {
        let service = service();

        let created = service
            .create(details("Ivan Franchin", "SpringBoot", 10.99))
            .await
            .expect("Failed to create");

        assert!(!created.id.is_empty());
        assert_eq!(created.author_name, "Ivan Franchin");
        assert_eq!(created.title, "SpringBoot");
        assert_eq!(created.price, 10.99);
        assert_eq!(service.get_or_fail(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_unknown_id_fails_with_not_found_everywhere() {
        let service = service();
        let unknown = "123".to_string();

        let errors = vec![
            service.get_or_fail(&unknown).await.unwrap_err(),
            service
                .update(&unknown, UpdateBookRequest::default())
                .await
                .unwrap_err(),
            service.delete(&unknown).await.unwrap_err(),
        ];

        for error in errors {
            assert!(matches!(&error, BookServiceError::NotFound(id) if id == "123"));
            assert_eq!(error.to_string(), "Book with id '123' not found.");
        }
    }

    #[tokio::test]
    async fn test_empty_patch_is_a_no_op_update() {
        let service = service();
        let created = service
            .create(details("Ivan Franchin", "SpringBoot", 10.99))
            .await
            .unwrap();

        let updated = service
            .update(&created.id, UpdateBookRequest::default())
            .await
            .expect("Failed to update");

        assert_eq!(updated, created);
        assert_eq!(service.get_or_fail(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let service = service();
        let created = service
            .create(details("Ivan Franchin", "SpringBoot", 10.99))
            .await
            .unwrap();

        let updated = service
            .update(
                &created.id,
                UpdateBookRequest {
                    price: Some(29.99),
                    ..UpdateBookRequest::default()
                },
            )
            .await
            .expect("Failed to update");
        assert_eq!(updated.title, "SpringBoot");
        assert_eq!(updated.price, 29.99);
        assert_eq!(service.get_or_fail(&created.id).await.unwrap(), updated);

        let deleted = service.delete(&created.id).await.expect("Failed to delete");
        assert_eq!(deleted, updated);
        assert!(matches!(
            service.get_or_fail(&created.id).await,
            Err(BookServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_all_and_by_author() {
        let service = service();
        assert_eq!(service.list_all().await.unwrap(), vec![]);

        let franchin = service
            .create(details("Ivan Franchin", "SpringBoot", 10.99))
            .await
            .unwrap();
        service
            .create(details("J.K. Rowling", "Harry Potter", 15.0))
            .await
            .unwrap();

        assert_eq!(service.list_all().await.unwrap().len(), 2);
        assert_eq!(
            service.list_by_author("Franchin").await.unwrap(),
            vec![franchin]
        );
    }
}
