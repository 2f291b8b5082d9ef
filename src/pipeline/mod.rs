pub mod import;
pub mod poll;
pub mod scrape;
