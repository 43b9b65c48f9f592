//! Vigil core logic
//!
//! ## Structure
//! - `config`: Layered configuration
//! - `collector`: Host snapshot acquisition
//! - `tools`: Tool catalog, command templates and runners
//! - `honeypot`: Simulated honeypot store
//! - `backend`: Reasoning backend interface and implementations
//! - `agent`: Bounded tool loop shared by every stage
//! - `threat`: Reasoning stage and scenario simulator
//! - `incident`: Incident-response stage and incident board
//! - `profile`: Attacker-profile stage
//! - `intel`: Knowledge-graph stage
//! - `policy`: Policy-suggestion stage
//! - `pipeline`: Orchestrator

pub mod agent;
pub mod backend;
pub mod collector;
pub mod config;
pub mod honeypot;
pub mod incident;
pub mod intel;
pub mod pipeline;
pub mod policy;
pub mod profile;
pub mod threat;
pub mod tools;
