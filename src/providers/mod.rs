pub mod csv_file;
pub mod quandl;
