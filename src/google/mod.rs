pub mod drive;
pub mod oauth;
pub mod service_account;
pub mod sheets;
