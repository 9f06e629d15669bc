pub mod id;
pub mod post;
pub mod upload;
pub mod user;

pub use id::*;
pub use post::*;
pub use upload::*;
pub use user::*;
