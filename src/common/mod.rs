pub mod types;

pub use types::{page_size, reset_page_size, set_page_size};
pub use types::{Permissions, TableId, DEFAULT_PAGE_SIZE, DEFAULT_POOL_PAGES};
