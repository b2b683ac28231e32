pub mod auth;
pub mod drive;
pub mod lazy_header;
pub mod mealie;
pub mod openai;
pub mod pipeline;
pub mod walk;
