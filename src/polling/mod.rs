mod service;

pub use service::PollingService;
