pub mod timeseries_archive;
