// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Article model for women's health news and resources.

use serde::{Deserialize, Serialize};

/// Article stored in Firestore.
///
/// Articles are ingested out-of-band; this backend only serves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Article ID (also used as document ID)
    pub id: String,
    /// Article title
    pub title: String,
    /// Summary or description
    pub summary: String,
    /// URL to the full article
    pub url: String,
    /// URL to the article image
    pub image_url: Option<String>,
    /// Source of the article (e.g. "ScienceDaily")
    pub source: String,
    /// Category ("Nutrition", "Symptoms", "Essential")
    pub category: String,
    /// When the article was originally published (RFC3339)
    pub published_at: String,
    /// Record creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}
