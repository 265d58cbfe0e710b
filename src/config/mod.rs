//! Configuration module

mod site;

pub use site::HighlightConfig;
pub use site::LinkConfig;
pub use site::ProjectConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
