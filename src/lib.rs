#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod hotel;
pub mod utils;
pub mod web;
