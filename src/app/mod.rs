pub mod ports;
pub mod discover_use_case;
pub mod count_use_case;
pub mod aggregate_use_case;
pub mod ingest_use_case;
