//! Catalog search adapter for the Naver book search API.

pub mod dto;
pub mod naver;

pub use naver::NaverCatalogClient;
