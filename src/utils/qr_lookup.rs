//! Resolves scanned QR codes to users.
//!
//! A cuckoo filter of every issued code answers "definitely unknown"
//! without touching the database; a moka cache holds recently resolved
//! subjects. The database stays the source of truth: anything the filter
//! lets through and the cache misses is looked up.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;

use crate::model::role::Capability;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static KNOWN_CODES: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Negative answers from the filter are only trusted once it holds every code.
static FILTER_WARM: AtomicBool = AtomicBool::new(false);

static SUBJECTS: Lazy<Cache<String, ScanSubject>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(600))
        .build()
});

/// The user behind a code, as the scanner needs it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanSubject {
    pub user_id: u64,
    pub name: String,
    pub role_id: u8,
    pub is_active: bool,
    pub member_id: Option<u64>,
    pub coach_id: Option<u64>,
}

impl ScanSubject {
    pub fn capability(&self) -> Option<Capability> {
        Capability::from_id(self.role_id)
    }
}

#[inline]
fn normalize(code: &str) -> String {
    code.trim().to_string()
}

/// False means the code was never issued. True may be a false positive.
pub fn might_exist(code: &str) -> bool {
    if !FILTER_WARM.load(Ordering::Acquire) {
        return true;
    }
    let code = normalize(code);
    KNOWN_CODES
        .read()
        .map(|f| f.contains(&code))
        .unwrap_or(true)
}

pub fn register(code: &str) {
    let code = normalize(code);
    if let Ok(mut filter) = KNOWN_CODES.write() {
        filter.add(&code);
    }
}

/// Called when a code is revoked or its user changes or disappears.
pub async fn forget(code: &str) {
    let code = normalize(code);
    if let Ok(mut filter) = KNOWN_CODES.write() {
        filter.remove(&code);
    }
    SUBJECTS.invalidate(&code).await;
}

/// Drops the cached subject only; the code stays valid.
pub async fn invalidate(code: &str) {
    SUBJECTS.invalidate(&normalize(code)).await;
}

pub async fn resolve(pool: &MySqlPool, code: &str) -> Result<Option<ScanSubject>, sqlx::Error> {
    let code = normalize(code);
    if code.is_empty() || !might_exist(&code) {
        return Ok(None);
    }

    if let Some(subject) = SUBJECTS.get(&code).await {
        return Ok(Some(subject));
    }

    let subject = sqlx::query_as::<_, ScanSubject>(
        r#"
        SELECT u.id AS user_id, u.name, u.role_id, u.is_active,
               m.id AS member_id, c.id AS coach_id
        FROM users u
        LEFT JOIN members m ON m.user_id = u.id
        LEFT JOIN coaches c ON c.user_id = u.id
        WHERE u.qr_token = ?
        "#,
    )
    .bind(&code)
    .fetch_optional(pool)
    .await?;

    if let Some(s) = &subject {
        SUBJECTS.insert(code, s.clone()).await;
    }
    Ok(subject)
}

/// Loads every issued code into the filter, streaming in batches.
pub async fn warmup(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT qr_token FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (code,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&code));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    FILTER_WARM.store(true, Ordering::Release);
    log::info!("QR code filter warmup complete: {} codes", total);
    Ok(())
}

fn insert_batch(codes: &[String]) {
    if let Ok(mut filter) = KNOWN_CODES.write() {
        for code in codes {
            filter.add(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_codes_might_exist() {
        register("  code-registered-in-test ");
        // before warmup every code is let through to the database
        assert!(might_exist("code-registered-in-test"));
        assert!(might_exist("never-issued"));
    }

    #[test]
    fn subject_capability_follows_role_id() {
        let subject = ScanSubject {
            user_id: 1,
            name: "Siti".into(),
            role_id: 3,
            is_active: true,
            member_id: Some(2),
            coach_id: None,
        };
        assert_eq!(subject.capability(), Some(Capability::Member));
    }
}
