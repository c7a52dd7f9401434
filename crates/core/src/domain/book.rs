use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// An unverified title/author guess awaiting catalog confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TentativeBook {
    pub title: String,
    pub author: String,
}

impl TentativeBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self { title: title.into(), author: author.into() }
    }

    /// `title-author`, the shape prompts use when listing books.
    pub fn label(&self) -> String {
        format!("{}-{}", self.title, self.author)
    }
}

/// A book the requester already owns. `id` is the catalog identifier (ISBN).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedBook {
    pub id: String,
    pub title: String,
    pub author: String,
}

impl OwnedBook {
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), author: author.into() }
    }

    pub fn as_tentative(&self) -> TentativeBook {
        TentativeBook::new(self.title.clone(), self.author.clone())
    }
}

/// A verified catalog entry. Two records with the same `id` are the same book,
/// so equality and hashing only look at `id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub link: String,
    pub image: String,
    pub publisher: String,
    pub isbn: String,
    pub description: String,
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(default)]
    pub pubdate: Option<String>,
}

impl CatalogRecord {
    pub fn as_tentative(&self) -> TentativeBook {
        TentativeBook::new(self.title.clone(), self.author.clone())
    }
}

impl PartialEq for CatalogRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CatalogRecord {}

impl Hash for CatalogRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Raw bytes of a cover photo taken by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverImage(pub Vec<u8>);

#[cfg(test)]
pub(crate) fn record(id: &str, title: &str, author: &str) -> CatalogRecord {
    CatalogRecord {
        id: id.to_owned(),
        title: title.to_owned(),
        author: author.to_owned(),
        link: format!("https://books.example/{id}"),
        image: format!("https://covers.example/{id}.jpg"),
        publisher: "test-press".to_owned(),
        isbn: id.to_owned(),
        description: String::new(),
        discount: None,
        pubdate: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{record, OwnedBook, TentativeBook};

    #[test]
    fn records_with_same_id_are_the_same_book() {
        let first = record("9791", "Python 입문", "이영희");
        let mut second = record("9791", "Python 입문 (개정판)", "이영희 외");
        second.publisher = "other-press".to_owned();

        assert_eq!(first, second);
        let unique: HashSet<_> = [first, second].into_iter().collect();
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn label_joins_title_and_author() {
        assert_eq!(TentativeBook::new("데미안", "헤르만 헤세").label(), "데미안-헤르만 헤세");
        assert_eq!(
            OwnedBook::new("1", "Swift 기초", "김철수").as_tentative(),
            TentativeBook::new("Swift 기초", "김철수")
        );
    }
}
