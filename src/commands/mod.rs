pub mod import;
pub mod status;

pub use import::import_export;
pub use status::show_mapping_status;
