//! Query resolution
//!
//! Turns an [`Intent`](sdk::Intent) into schedule entries: normalize the
//! temporal words, build a [`ScheduleFilter`], run it against a
//! [`ScheduleStore`](crate::db::ScheduleStore).

pub mod filter;
pub mod resolver;

pub use filter::{Predicate, ScheduleFilter};
pub use resolver::{QueryResolver, Resolution};
