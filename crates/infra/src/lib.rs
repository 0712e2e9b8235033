//! I/O edges of the blueprint batch: config, input files, the checkpoint
//! file, and the HTTP render / upload / notify / Sleeper clients.

pub mod checkpoint_file;
pub mod config;
pub mod customers;
pub mod fs;
pub mod notify;
pub mod render;
pub mod sleeper;
pub mod upload;

pub use checkpoint_file::{JsonFileCheckpointStore, export_buy_maps, load_buy_map};
pub use config::{ConfigError, NOTIFY_TOKEN_ENV, NotifySettings, SenderConfig, UploadConfig};
pub use customers::{InputError, load_work_items, merge_disallowed, write_selected};
pub use notify::{MailRelayNotifier, Message};
pub use render::HttpRenderer;
pub use sleeper::{Membership, Resolution, ResolveRequest, SleeperClient, UserLookup};
pub use upload::{FolderUploader, HttpUploader, uploader_from_config};
