// Core types for the scouting toolkit: the player table, metric catalog,
// dataset provider, configuration, row filters and the session shortlist.

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod shortlist;
pub mod table;
