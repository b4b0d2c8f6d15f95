//! One-shot maintenance jobs for the OBI assessment store.
//!
//! `repair-partial` recomputes scores for stuck level-2 attempts and repairs
//! their session reports; `backfill-reports` inserts report rows for
//! completed sessions that never got one.

pub mod calc;
pub mod config;
pub mod db;
pub mod jobs;
pub mod metadata;
pub mod report;
