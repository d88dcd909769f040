// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Altheia: health-tracking backend with Google Calendar integration.
//!
//! This crate provides the backend API for daily symptom logging and for
//! synchronizing those logs to a dedicated Google Calendar.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{CalendarSyncService, ChatService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub calendar_sync: CalendarSyncService,
    pub chat_service: ChatService,
}
