// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod article;
pub mod symptom_log;
pub mod user;

pub use article::Article;
pub use symptom_log::{SymptomItem, SymptomLog, SymptomLogInput, SymptomLogResponse};
pub use user::{CalendarSettings, GoogleAuthData, User, UserCreate, UserResponse, UserUpdate};
