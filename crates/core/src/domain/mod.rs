pub mod book;
pub mod output;
