use chrono::Utc;

use super::{finish, next_timestamp, write_error, BookService};
use crate::modules::books::error::BookError;
use crate::modules::books::models::{Book, BookInput, NewBook};
use crate::modules::books::store;
use crate::modules::books::validation::{validate_new, validate_patch, ValidationError};

impl BookService {
    pub async fn create(&self, input: BookInput) -> Result<Book, BookError> {
        let fields = validate_new(input)?;

        let mut tx = self.begin().await?;
        let result = store::insert(&mut tx, &fields, Utc::now())
            .await
            .map_err(write_error("create book", &fields.title));
        let book = finish(tx, result).await?;

        tracing::info!(book_id = book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Replace every mutable field. An omitted description becomes null.
    pub async fn full_update(&self, id: i64, input: BookInput) -> Result<Book, BookError> {
        self.overwrite(id, input, |input, _| validate_new(input))
            .await
    }

    /// Replace only the fields present in `input`.
    pub async fn partial_update(&self, id: i64, input: BookInput) -> Result<Book, BookError> {
        self.overwrite(id, input, |input, current| {
            validate_patch(input).map(|patch| patch.apply_to(current))
        })
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookError> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(BookError::storage("acquire connection"))?;
        let removed = store::delete(&mut conn, id)
            .await
            .map_err(BookError::storage("delete book"))?;
        if !removed {
            return Err(BookError::NotFound(id));
        }

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// Insert every entry or none of them.
    pub async fn bulk_create(&self, inputs: Vec<BookInput>) -> Result<Vec<Book>, BookError> {
        let mut batch = Vec::with_capacity(inputs.len());
        let mut invalid = Vec::new();
        for (index, input) in inputs.into_iter().enumerate() {
            match validate_new(input) {
                Ok(fields) => batch.push(fields),
                Err(err) => invalid.extend(err.prefixed(&format!("items[{}]", index)).fields),
            }
        }
        if !invalid.is_empty() {
            return Err(ValidationError { fields: invalid }.into());
        }

        let now = Utc::now();
        let mut tx = self.begin().await?;
        let result = async {
            let mut created = Vec::with_capacity(batch.len());
            for fields in &batch {
                let book = store::insert(&mut tx, fields, now)
                    .await
                    .map_err(write_error("bulk create books", &fields.title))?;
                created.push(book);
            }
            Ok::<_, BookError>(created)
        }
        .await;
        let created = finish(tx, result).await?;

        tracing::info!(count = created.len(), "books bulk created");
        Ok(created)
    }

    /// Shared path for full and partial updates. Existence is checked before
    /// the payload is validated.
    async fn overwrite(
        &self,
        id: i64,
        input: BookInput,
        merge: impl FnOnce(BookInput, &Book) -> Result<NewBook, ValidationError>,
    ) -> Result<Book, BookError> {
        let mut tx = self.begin().await?;
        let result = async {
            let current = store::claim(&mut tx, id)
                .await
                .map_err(BookError::storage("claim book"))?
                .ok_or(BookError::NotFound(id))?;
            let fields = merge(input, &current)?;

            store::update(&mut tx, id, &fields, next_timestamp(current.updated_at))
                .await
                .map_err(write_error("update book", &fields.title))?
                .ok_or(BookError::NotFound(id))
        }
        .await;
        let book = finish(tx, result).await?;

        tracing::info!(book_id = book.id, title = %book.title, "book updated");
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::service;
    use super::BookService;
    use crate::modules::books::error::BookError;
    use crate::modules::books::models::BookInput;
    use crate::modules::books::store;
    use bookshelf_db::Database;
    use bookshelf_kernel::settings::DatabaseSettings;

    #[tokio::test]
    async fn duplicate_title_leaves_count_unchanged() {
        let service = service().await;
        service.create(BookInput::new("T", "A")).await.unwrap();

        let err = service.create(BookInput::new("T", "A")).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(service.list(1, 10, None).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn create_rejects_invalid_fields() {
        let service = service().await;
        let err = service.create(BookInput::new(" ", "A")).await.unwrap_err();
        assert!(matches!(err, BookError::Validation(ref v) if v.has_field("title")));
        assert_eq!(service.list(1, 10, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn full_update_replaces_every_field() {
        let service = service().await;
        let book = service
            .create(BookInput::new("Old", "A").with_description("gone"))
            .await
            .unwrap();

        let updated = service
            .full_update(book.id, BookInput::new("New", "B"))
            .await
            .unwrap();
        assert_eq!(updated.id, book.id);
        assert_eq!(updated.title, "New");
        assert_eq!(updated.author, "B");
        assert_eq!(updated.description, None);
        assert_eq!(updated.created_at, book.created_at);
        assert!(updated.updated_at > book.updated_at);
    }

    #[tokio::test]
    async fn full_update_requires_title_and_author() {
        let service = service().await;
        let book = service.create(BookInput::new("T", "A")).await.unwrap();

        let err = service
            .full_update(book.id, BookInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Validation(ref v) if v.fields.len() == 2));
        assert_eq!(service.get_by_id(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn missing_book_is_checked_before_payload() {
        let service = service().await;
        assert!(matches!(
            service.full_update(9, BookInput::default()).await,
            Err(BookError::NotFound(9))
        ));
        assert!(matches!(
            service.partial_update(9, BookInput::default()).await,
            Err(BookError::NotFound(9))
        ));
        assert!(matches!(service.delete(9).await, Err(BookError::NotFound(9))));
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_fields() {
        let service = service().await;
        let book = service
            .create(BookInput::new("T", "A").with_description("d"))
            .await
            .unwrap();

        let patched = service
            .partial_update(
                book.id,
                BookInput {
                    author: Some("B".to_string()),
                    ..BookInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.title, "T");
        assert_eq!(patched.author, "B");
        assert_eq!(patched.description.as_deref(), Some("d"));
        assert!(patched.updated_at > book.updated_at);

        let again = service
            .partial_update(book.id, BookInput::default())
            .await
            .unwrap();
        assert!(again.updated_at > patched.updated_at);
    }

    #[tokio::test]
    async fn update_to_taken_title_conflicts_and_keeps_row() {
        let service = service().await;
        service.create(BookInput::new("First", "A")).await.unwrap();
        let second = service.create(BookInput::new("Second", "A")).await.unwrap();

        let err = service
            .partial_update(
                second.id,
                BookInput {
                    title: Some("First".to_string()),
                    ..BookInput::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Conflict { ref title } if title == "First"));
        assert_eq!(service.get_by_id(second.id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn deleted_book_is_gone() {
        let service = service().await;
        let book = service.create(BookInput::new("T", "A")).await.unwrap();

        service.delete(book.id).await.unwrap();
        assert!(matches!(service.get_by_id(book.id).await, Err(BookError::NotFound(_))));
    }

    #[tokio::test]
    async fn bulk_create_is_all_or_nothing() {
        let service = service().await;
        let created = service
            .bulk_create(vec![BookInput::new("A", "x"), BookInput::new("B", "y")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let err = service
            .bulk_create(vec![
                BookInput::new("C", "x"),
                BookInput::new("D", "x"),
                BookInput::new("A", "x"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Conflict { ref title } if title == "A"));
        assert_eq!(service.list(1, 10, None).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn bulk_create_rejects_duplicates_within_batch() {
        let service = service().await;
        let err = service
            .bulk_create(vec![BookInput::new("Same", "x"), BookInput::new("Same", "y")])
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Conflict { .. }));
        assert_eq!(service.list(1, 10, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn bulk_create_reports_entry_positions() {
        let service = service().await;
        let err = service
            .bulk_create(vec![BookInput::new("Fine", "x"), BookInput::new("", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::Validation(ref v) if v.has_field("items[1].title")));
        assert_eq!(service.list(1, 10, None).await.unwrap().total, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_on_file_store_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DatabaseSettings {
            url: format!("sqlite://{}", dir.path().join("books.db").display()),
            max_connections: 5,
            create_if_missing: true,
        };
        let db = Database::connect(&settings).await.unwrap();
        db.apply_schemas(&[("books".to_string(), store::SCHEMA)])
            .await
            .unwrap();
        let service = BookService::new(db);
        let book = service.create(BookInput::new("Shared", "A")).await.unwrap();
        let id = book.id;

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .partial_update(
                            id,
                            BookInput {
                                description: Some(Some(format!("revision {i}"))),
                                ..BookInput::default()
                            },
                        )
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let latest = service.get_by_id(book.id).await.unwrap();
        assert!(latest.updated_at > book.updated_at);
        assert!(latest.description.unwrap().starts_with("revision "));
    }
}
