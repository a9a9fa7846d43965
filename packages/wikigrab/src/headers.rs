use std::fmt;

use foldhash::{HashMap, HashMapExt};
use http::HeaderName;
use slot_pool::{Handle, SlotPool};
use tracing::trace;

use crate::{Error, HeaderRecord, Result};

/// The headers of the most recent response, staged in a slot pool and indexed by name.
///
/// Every header line becomes one [`HeaderRecord`] acquired from the pool. The name index and the
/// arrival order both hold pool handles, so neither needs updating when the pool grows.
/// [`reset_all()`][Self::reset_all] returns every record to the pool in one sweep before the
/// next response is parsed.
pub struct ResponseHeaders {
    records: SlotPool<HeaderRecord>,

    // Lowercase name to the records with that name, in arrival order.
    by_name: HashMap<String, Vec<Handle>>,

    arrival: Vec<Handle>,
}

impl ResponseHeaders {
    /// Creates an empty header table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(SlotPool::new())
    }

    /// Creates an empty header table that stages its records in `records`.
    ///
    /// # Panics
    ///
    /// Panics if the pool already holds records.
    #[must_use]
    pub fn with_pool(records: SlotPool<HeaderRecord>) -> Self {
        assert!(
            records.is_empty(),
            "header table requires an empty record pool"
        );

        Self {
            records,
            by_name: HashMap::new(),
            arrival: Vec::new(),
        }
    }

    /// Stores one header. The name is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMalformed`] if `name` is not a valid header name and
    /// [`Error::AllocationExhausted`] if the record pool cannot grow.
    pub fn put(&mut self, name: &str, value: &str) -> Result<Handle> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|error| Error::malformed(format!("invalid header name '{name}': {error}")))?;

        let handle = self.records.acquire()?;

        let record = self.records.get_mut(handle);
        record.name.push_str(name.as_str());
        record.value.push_str(value);

        trace!(name = name.as_str(), value, "header stored");

        self.by_name
            .entry(name.as_str().to_owned())
            .or_default()
            .push(handle);
        self.arrival.push(handle);

        Ok(handle)
    }

    /// Parses the header lines of a response head and stores each one.
    ///
    /// `head` is everything before the blank line that ends the header block. The first line is
    /// the status line and is skipped. Each following line is split on its first colon and the
    /// value has its leading spaces removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMalformed`] for a line without a colon or with an invalid name.
    pub fn parse_block(&mut self, head: &[u8]) -> Result<()> {
        for line in head.split(|byte| *byte == b'\n').skip(1) {
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if line.is_empty() {
                continue;
            }

            let Some(colon) = line.iter().position(|byte| *byte == b':') else {
                return Err(Error::malformed(format!(
                    "header line without a colon: '{}'",
                    String::from_utf8_lossy(line)
                )));
            };

            let (name, value) = line.split_at(colon);
            let name = String::from_utf8_lossy(name);
            let value = String::from_utf8_lossy(value.get(1..).unwrap_or_default());

            self.put(&name, value.trim_start_matches(' ').trim_end())?;
        }

        Ok(())
    }

    /// The value of the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// The values of every header named `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        self.by_name
            .get(name.to_ascii_lowercase().as_str())
            .into_iter()
            .flatten()
            .map(|handle| self.records.get(*handle).value.as_str())
    }

    /// Whether a header named `name` has a value equal to `value`, ignoring ASCII case.
    #[must_use]
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.get_all(name)
            .any(|candidate| candidate.eq_ignore_ascii_case(value))
    }

    /// Every stored header, in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderRecord> + '_ {
        self.arrival.iter().map(|handle| self.records.get(*handle))
    }

    /// The number of stored headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arrival.len()
    }

    /// Whether no headers are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrival.is_empty()
    }

    /// The record pool, for inspecting its capacity and occupancy.
    #[must_use]
    pub fn pool(&self) -> &SlotPool<HeaderRecord> {
        &self.records
    }

    /// Returns every record to the pool and forgets all names.
    ///
    /// Returns the number of records released.
    pub fn reset_all(&mut self) -> usize {
        self.by_name.clear();
        self.arrival.clear();
        self.records.release_all()
    }
}

impl Default for ResponseHeaders {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResponseHeaders {
    #[cfg_attr(test, mutants::skip)] // We have no API contract for this.
    #[cfg_attr(coverage_nightly, coverage(off))] // We have no API contract for this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|record| (&record.name, &record.value)))
            .finish()
    }
}
