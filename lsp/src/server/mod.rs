mod analysis;
mod cli;
mod config;
mod entry;
mod formatting;
mod handlers;
mod state;
mod text;

pub use entry::run;
