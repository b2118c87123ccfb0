mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, DirectoryConfig, OtelConfig, PushConfig, ServerConfig, Settings,
};
