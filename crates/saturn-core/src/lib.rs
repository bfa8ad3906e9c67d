pub mod consts;
pub mod engine;
pub mod error;
pub mod executor;
pub mod frame;
pub mod io;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod scan;
pub mod stage;
