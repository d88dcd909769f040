// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar_sync;
pub mod cipher;
pub mod gemini;
pub mod google_calendar;

pub use calendar_sync::{BatchSyncOutcome, CalendarStatus, CalendarSyncService};
pub use cipher::SecretCipher;
pub use gemini::ChatService;
pub use google_calendar::{GoogleCalendarClient, GoogleCalendarService};
