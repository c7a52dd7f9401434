use bookmatch_core::domain::book::CatalogRecord;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaverBooksResponse {
    #[serde(default)]
    pub last_build_date: Option<String>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub display: u64,
    pub items: Vec<NaverBookDto>,
}

#[derive(Debug, Deserialize)]
pub struct NaverBookDto {
    pub title: String,
    pub link: String,
    pub image: String,
    pub author: String,
    #[serde(default)]
    pub discount: Option<String>,
    pub publisher: String,
    pub isbn: String,
    pub description: String,
    #[serde(default)]
    pub pubdate: Option<String>,
}

impl NaverBookDto {
    pub fn into_record(self) -> CatalogRecord {
        CatalogRecord {
            id: self.isbn.clone(),
            title: strip_highlight(&self.title),
            author: strip_highlight(&self.author),
            link: self.link,
            image: self.image,
            publisher: self.publisher,
            isbn: self.isbn,
            description: strip_highlight(&self.description),
            discount: self.discount.filter(|value| !value.trim().is_empty()),
            pubdate: self.pubdate.filter(|value| !value.trim().is_empty()),
        }
    }
}

/// Removes the `<b>`/`</b>` tags the search API wraps around matched terms.
pub fn strip_highlight(text: &str) -> String {
    text.replace("<b>", "").replace("</b>", "").trim().to_owned()
}
