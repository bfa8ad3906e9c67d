pub mod config;
pub mod info;
pub mod resolve;
pub mod run;
pub mod scan;
