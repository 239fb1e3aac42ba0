//! Terminal display utilities for CLI output.
//!
//! Provides styled tables and themed status messages.

pub mod tables;
pub mod theme;

pub use tables::{
    TableBuilder, create_debate_detail_table, create_debate_results_table, create_debates_table,
    create_image_hits_table, create_stats_table,
};
pub use theme::{THEME, Theme};
