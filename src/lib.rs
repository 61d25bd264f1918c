pub mod conf_files;
pub mod data_files;
pub mod error;
pub mod generator;
pub mod genome_store;
pub mod layout;
pub mod params;
pub mod sequence_stats;
pub mod track;
pub mod track_collector;
