//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_session_store;
mod http_form_api_client;
mod in_memory_session_store;
mod local_file_picker;

pub use file_session_store::FileSessionStore;
pub use http_form_api_client::HttpFormApiClient;
pub use in_memory_session_store::InMemorySessionStore;
pub use local_file_picker::LocalFilePicker;
