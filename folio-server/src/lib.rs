pub mod http;
pub mod store_pg;
pub mod subsystems;
