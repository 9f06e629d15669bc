pub mod media;
pub mod post;
pub mod upload;
pub mod user;
