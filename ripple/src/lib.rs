//! Command-line front end for `ripple-rpc`: a TCP server for the demo
//! [`Arith`](arith::Arith) service and a one-shot client for it.

pub mod arith;
pub mod cli;
pub mod config;
