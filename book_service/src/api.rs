use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Book as stored and returned by the service
pub struct Book {
    pub id: BookId,
    pub author_name: String,
    pub title: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Book fields without the id, i.e. the document kept by the store
pub struct BookDetails {
    pub author_name: String,
    pub title: String,
    pub price: f64,
}

impl BookDetails {
    pub fn with_id(self, id: BookId) -> Book {
        Book {
            id,
            author_name: self.author_name,
            title: self.title,
            price: self.price,
        }
    }
}

impl From<Book> for BookDetails {
    fn from(book: Book) -> Self {
        Self {
            author_name: book.author_name,
            title: book.title,
            price: book.price,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Body of POST /api/books. Every field is required, they are optional here only so
/// missing fields are reported the same way as invalid ones.
pub struct CreateBookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl CreateBookRequest {
    pub fn new(author_name: &str, title: &str, price: f64) -> Self {
        Self {
            author_name: Some(author_name.to_string()),
            title: Some(title.to_string()),
            price: Some(price),
        }
    }

    /// Checks the request and turns it into the details of a new book
    pub fn validate(self) -> Result<BookDetails, Vec<FieldError>> {
        let mut errors = vec![];
        check_not_blank("authorName", self.author_name.as_deref(), &mut errors);
        check_not_blank("title", self.title.as_deref(), &mut errors);
        match self.price {
            None => errors.push(FieldError::new("price", None, "must not be null")),
            Some(price) => check_positive(price, &mut errors),
        }

        match (self.author_name, self.title, self.price) {
            (Some(author_name), Some(title), Some(price)) if errors.is_empty() => {
                Ok(BookDetails {
                    author_name,
                    title,
                    price,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Body of PATCH /api/books/{id}. Absent or null fields keep their current value.
pub struct UpdateBookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl UpdateBookRequest {
    /// Checks only the fields that are present
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = vec![];
        if let Some(author_name) = self.author_name.as_deref() {
            check_not_blank("authorName", Some(author_name), &mut errors);
        }
        if let Some(title) = self.title.as_deref() {
            check_not_blank("title", Some(title), &mut errors);
        }
        if let Some(price) = self.price {
            check_positive(price, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct BooksQuery {
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub rejected_value: Option<String>,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &str, rejected_value: Option<String>, reason: &str) -> Self {
        Self {
            field: field.to_string(),
            rejected_value,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Error envelope returned for 400, 404 and 500 responses
pub struct ErrorMessage {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

fn check_not_blank(field: &str, value: Option<&str>, errors: &mut Vec<FieldError>) {
    match value {
        Some(value) if !value.trim().is_empty() => {}
        other => errors.push(FieldError::new(
            field,
            other.map(str::to_string),
            "must not be blank",
        )),
    }
}

fn check_positive(price: f64, errors: &mut Vec<FieldError>) {
    // NaN fails this comparison as well
    if !(price > 0.0) {
        errors.push(FieldError::new(
            "price",
            Some(price.to_string()),
            "must be greater than 0",
        ));
    }
}
