//! Request middleware.

pub mod upload_limit;

pub use upload_limit::check_content_length;
