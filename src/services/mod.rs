pub mod post;
pub mod upload;
pub mod user;

pub use post::PostService;
pub use upload::UploadService;
pub use user::UserService;
