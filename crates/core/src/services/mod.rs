//! Pipeline stages and the external-tool plumbing they share.

pub mod capture;
pub mod classify;
pub mod extract;
pub mod process;
pub mod resolve;
pub mod tools;
