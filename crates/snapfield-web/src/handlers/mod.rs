//! API 핸들러 모듈.

pub mod capture;
pub mod correction;
pub mod health;
pub mod sessions;
