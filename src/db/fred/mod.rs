pub mod observations_archive;
