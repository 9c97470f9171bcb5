use bookshelf_db::pagination::{Page, PageRequest};

use super::{finish, BookService};
use crate::modules::books::error::BookError;
use crate::modules::books::models::{AuthorBookCount, Book};
use crate::modules::books::store;

impl BookService {
    pub async fn get_by_id(&self, id: i64) -> Result<Book, BookError> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(BookError::storage("acquire connection"))?;
        store::find(&mut conn, id)
            .await
            .map_err(BookError::storage("find book"))?
            .ok_or(BookError::NotFound(id))
    }

    /// Books in insertion order, optionally narrowed to authors containing
    /// `author` (ASCII case-insensitive). An empty filter matches everything.
    pub async fn list(
        &self,
        page: i64,
        page_size: i64,
        author: Option<&str>,
    ) -> Result<Page<Book>, BookError> {
        let request = PageRequest::new(page, page_size)?;
        let author = author.filter(|author| !author.is_empty());

        let mut tx = self.begin().await?;
        let result = async {
            let total = store::count(&mut tx, author)
                .await
                .map_err(BookError::storage("count books"))?;
            let items = store::page(&mut tx, author, request.limit(), request.offset())
                .await
                .map_err(BookError::storage("list books"))?;
            Ok::<_, BookError>((total, items))
        }
        .await;
        let (total, items) = finish(tx, result).await?;

        Ok(Page::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            request,
        ))
    }

    /// Authors with at least `min_books` books, most prolific first.
    pub async fn authors_with_book_count(
        &self,
        min_books: i64,
    ) -> Result<Vec<AuthorBookCount>, BookError> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(BookError::storage("acquire connection"))?;
        store::author_counts(&mut conn, min_books)
            .await
            .map_err(BookError::storage("count books per author"))
    }
}
