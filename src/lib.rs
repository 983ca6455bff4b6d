//! Career Assist: answers employer messages on a candidate's behalf through a
//! generate → evaluate → revise loop.

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod notify;
pub mod profile;
pub mod report;
pub mod tools;
