//! End-to-end batching scenarios against an in-memory scene

mod scenarios;
