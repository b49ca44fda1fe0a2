pub mod in_memory_status;
pub mod status_file;
