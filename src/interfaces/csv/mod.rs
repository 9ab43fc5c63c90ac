pub mod report_writer;
pub mod state_reader;
