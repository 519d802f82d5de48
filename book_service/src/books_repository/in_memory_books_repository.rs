use std::collections::HashMap;

use uuid::Uuid;

use crate::api::{Book, BookDetails, BookId};
use crate::books_repository::{BookRepository, BookRepositoryError};

#[derive(Default)]
pub struct InMemoryBookRepository {
    books: parking_lot::RwLock<HashMap<BookId, BookDetails>>,
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn add_book(&self, details: BookDetails) -> Result<Book, BookRepositoryError> {
        let id = Uuid::new_v4().to_string();
        self.books.write().insert(id.clone(), details.clone());
        Ok(details.with_id(id))
    }

    async fn save_book(&self, book: Book) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        if let Some(details) = locked_books.get_mut(&book.id) {
            *details = book.into();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn get_book(&self, book_id: &BookId) -> Result<Option<Book>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .get(book_id)
            .map(|details| details.clone().with_id(book_id.clone())))
    }

    async fn list_books(&self) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .iter()
            .map(|(book_id, details)| details.clone().with_id(book_id.clone()))
            .collect())
    }

    async fn find_books_by_author_name(
        &self,
        author_name: &str,
    ) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .iter()
            .filter(|(_, details)| details.author_name.contains(author_name))
            .map(|(book_id, details)| details.clone().with_id(book_id.clone()))
            .collect())
    }

    async fn delete_book(&self, book_id: &BookId) -> Result<bool, BookRepositoryError> {
        Ok(self.books.write().remove(book_id).is_some())
    }
}

#[cfg(test)]
mod in_memory_book_repository_tests {
    use crate::api::{Book, BookDetails};
    use crate::books_repository::{BookRepository, InMemoryBookRepository};

    fn details(author_name: &str, title: &str, price: f64) -> BookDetails {
        BookDetails {
            author_name: author_name.to_string(),
            title: title.to_string(),
            price,
        }
    }

    #[tokio::test]
    /// Tests if add_book and get_book work correctly
    async fn test_add_book_and_get_it() {
        let repo = InMemoryBookRepository::default();

        let book_not_found = repo
            .get_book(&"not-existing".to_string())
            .await
            .expect("Failed to get book");
        assert_eq!(book_not_found, None);

        let book_details = details("Ivan Franchin", "SpringBoot", 10.5);
        let book = repo
            .add_book(book_details.clone())
            .await
            .expect("Failed to add book");
        assert!(!book.id.is_empty());

        let fetched = repo
            .get_book(&book.id)
            .await
            .expect("Failed to get book")
            .expect("Book not found");
        assert_eq!(fetched, book_details.with_id(book.id.clone()));
    }

    #[tokio::test]
    /// Ids of removed books are not handed out again
    async fn test_ids_are_unique() {
        let repo = InMemoryBookRepository::default();
        let first = repo.add_book(details("a", "b", 1.0)).await.unwrap();
        assert!(repo.delete_book(&first.id).await.unwrap());
        let second = repo.add_book(details("a", "b", 1.0)).await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_add_books_list_and_filter_by_author() {
        let repo = InMemoryBookRepository::default();

        let list = repo.list_books().await.expect("Failed to list books");
        assert_eq!(list, vec![]);

        let franchin = repo
            .add_book(details("Ivan Franchin", "SpringBoot", 10.5))
            .await
            .expect("Failed to add book");
        let rowling = repo
            .add_book(details("J.K. Rowling", "Harry Potter", 20.0))
            .await
            .expect("Failed to add book");

        let mut list = repo.list_books().await.expect("Failed to list books");
        list.sort_by(|a, b| a.author_name.cmp(&b.author_name));
        assert_eq!(list, vec![franchin.clone(), rowling]);

        let filtered = repo
            .find_books_by_author_name("Franchin")
            .await
            .expect("Failed to filter books");
        assert_eq!(filtered, vec![franchin]);

        let filtered = repo
            .find_books_by_author_name("franchin")
            .await
            .expect("Failed to filter books");
        assert_eq!(filtered, vec![]);
    }

    #[tokio::test]
    async fn test_save_and_delete_book() {
        let repo = InMemoryBookRepository::default();
        let missing = Book {
            id: "missing".to_string(),
            author_name: "a".to_string(),
            title: "b".to_string(),
            price: 1.0,
        };
        assert!(!repo.save_book(missing.clone()).await.unwrap());
        assert!(!repo.delete_book(&missing.id).await.unwrap());

        let book = repo.add_book(details("a", "b", 1.0)).await.unwrap();
        let replaced = Book {
            title: "c".to_string(),
            ..book.clone()
        };
        assert!(repo.save_book(replaced.clone()).await.unwrap());
        assert_eq!(repo.get_book(&book.id).await.unwrap(), Some(replaced));

        assert!(repo.delete_book(&book.id).await.unwrap());
        assert_eq!(repo.get_book(&book.id).await.unwrap(), None);
    }
}
