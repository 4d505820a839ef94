pub mod client;
pub mod middleware;
pub mod service;
pub mod session;

pub use client::HttpRangeSource;
pub use service::HttpService;
pub use session::Session;
