pub mod approver;
pub mod file_selector;
pub mod permission_filter;
pub mod roster_cache;
pub mod session_revocation;
pub mod table;
pub mod time_format;
