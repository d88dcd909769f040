//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SYMPTOM_LOGS: &str = "symptom_logs";
    pub const ARTICLES: &str = "articles";
}
