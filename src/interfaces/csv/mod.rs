pub mod details_reader;
