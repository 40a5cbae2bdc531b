pub mod export_handlers;
pub mod health_handlers;
pub mod scan_handlers;
