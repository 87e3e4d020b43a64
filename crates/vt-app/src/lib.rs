pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod scene;
pub mod viewer;

pub use app::App;
pub use config::AppConfig;
pub use error::AppError;
