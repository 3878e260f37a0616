pub mod audio_handler;
pub mod datastore;
pub mod download_resolver;
pub mod source_resolver;
