pub mod app;
pub mod config;
pub mod page;

pub use app::App;
pub use config::Config;
