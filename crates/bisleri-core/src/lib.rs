pub mod config;
pub mod error;
pub mod history;
pub mod profile;
pub mod prompt;
pub mod settings;
pub mod stats;
pub mod store;

pub use config::{validate_profile_name, ConfigPaths, Defaults, GlobalConfig, DEFAULT_PROFILE};
pub use error::{ConfigError, PromptError, StoreError};
pub use history::{parse_order_date, OrderHistory, SavedOrder};
pub use profile::{Address, LastOrder, Profile, StoredCookie, ADDRESS_SOURCE_SHIPPING_PAGE};
pub use prompt::{choose, parse_index, Prompter, ScriptedPrompter};
pub use settings::{load_settings, load_settings_from_env, Settings};
pub use store::ProfileStore;
