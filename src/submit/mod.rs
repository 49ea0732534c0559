pub mod magnet;
pub mod watch_folder;

pub use magnet::submit_magnet;
pub use watch_folder::{DescriptorFetcher, WatchFolderSubmitter, descriptor_file_name, sanitize_title};
