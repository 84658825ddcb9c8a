pub mod api;
pub mod authorized;
pub mod token_file;

pub use api::ApiClient;
pub use authorized::AuthorizedClient;
pub use token_file::{FileTokenStorage, MemoryTokenStorage};
