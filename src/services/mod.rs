pub mod csv_export;
pub mod events;
pub mod export_service;
pub mod scan_service;
pub mod scan_store;
pub mod snapshot_repo;
