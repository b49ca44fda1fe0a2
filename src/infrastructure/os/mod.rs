pub mod process_manager;
