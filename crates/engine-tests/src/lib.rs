#![allow(dead_code)]
//! End-to-end scenario tests for the concrete `spec.md` §8 examples,
//! exercised against the self-contained sinks this workspace actually
//! bundles (SQLite/DuckDB, both embedded with no external server, and
//! plain CSV files) rather than the teacher's network-dependent Postgres/
//! MySQL fixtures — DtPipe's closed endpoint set has no CI-reachable
//! always-on database the way the teacher's migration-tool test suite
//! assumes one, so these tests stand up their targets in-process per run.

pub mod fixtures;

pub mod scenarios;
