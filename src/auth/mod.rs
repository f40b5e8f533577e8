//! # Authentication Module
//!
//! Credential and token lifecycle: password hashing, token signing and
//! verification, the register/login/logout service and the middleware that
//! gates protected routes.

pub mod jwt;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod validation;
