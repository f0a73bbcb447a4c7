// src/die_catalog.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::ksrubber_client::{ApiError, ProductionApi};
use crate::ksrubber_data::{DailyProductionRecord, DieRecord, DieUpdate, NewDie, LEAVE_DIE_ID, LEAVE_DIE_NAME};

// ASCII digits only, so "Die ٣" sorts as text.
static NATURAL_CHUNKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+|[^0-9]+").expect("natural sort chunk pattern is valid"));

/// Compares strings treating embedded digit runs as numbers, so "Die 2" sorts
/// before "Die 10". Text runs compare case-insensitively; strings that are
/// still equal fall back to a byte comparison, keeping the order total.
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let mut left = NATURAL_CHUNKS.find_iter(a).map(|m| m.as_str());
    let mut right = NATURAL_CHUNKS.find_iter(b).map(|m| m.as_str());

    loop {
        match (left.next(), right.next()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match compare_chunks(l, r) {
                Ordering::Equal => continue,
                unequal => return unequal,
            },
        }
    }

    a.cmp(b)
}

fn is_digit_chunk(chunk: &str) -> bool {
    chunk.as_bytes().first().map_or(false, u8::is_ascii_digit)
}

fn compare_chunks(l: &str, r: &str) -> Ordering {
    match (is_digit_chunk(l), is_digit_chunk(r)) {
        (true, true) => {
            let l_digits = l.trim_start_matches('0');
            let r_digits = r.trim_start_matches('0');
            l_digits
                .len()
                .cmp(&r_digits.len())
                .then_with(|| l_digits.cmp(r_digits))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => l.to_lowercase().cmp(&r.to_lowercase()),
    }
}

/// Table/dropdown order: company, then die name (natural), then id.
pub fn compare_dies(a: &DieRecord, b: &DieRecord) -> Ordering {
    a.company_name
        .cmp(&b.company_name)
        .then_with(|| natural_compare(&a.die_name, &b.die_name))
        .then_with(|| a.die_id.cmp(&b.die_id))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based, clamped into `1..=total_pages`.
    pub page: usize,
    /// Never below 1, even for an empty list.
    pub total_pages: usize,
    pub total_items: usize,
}

impl<'a, T> Page<'a, T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = ((total_items + per_page - 1) / per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * per_page).min(total_items);
    let end = (start + per_page).min(total_items);

    Page {
        items: &items[start..end],
        page,
        total_pages,
        total_items,
    }
}

/// Session cache of the backend die catalog.
#[derive(Debug, Clone, Default)]
pub struct DieCatalog {
    dies: Vec<DieRecord>,
    index: HashMap<String, usize>,
}

impl DieCatalog {
    pub fn new(dies: Vec<DieRecord>) -> Self {
        let mut catalog = Self::default();
        catalog.replace_all(dies);
        catalog
    }

    pub fn replace_all(&mut self, dies: Vec<DieRecord>) {
        self.dies = dies;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .dies
            .iter()
            .enumerate()
            .map(|(idx, die)| (die.die_id.clone(), idx))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.dies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dies.is_empty()
    }

    pub fn get(&self, die_id: &str) -> Option<&DieRecord> {
        self.index.get(die_id).map(|&idx| &self.dies[idx])
    }

    /// Display name for `die_id`, or the id itself when the die is unknown.
    pub fn resolve<'a>(&'a self, die_id: &'a str) -> &'a str {
        self.get(die_id).map_or(die_id, |die| die.die_name.as_str())
    }

    pub fn resolved_names<'a>(&'a self, record: &'a DailyProductionRecord) -> Vec<&'a str> {
        record.die_ids.iter().map(|id| self.resolve(id)).collect()
    }

    pub fn is_leave_die(&self, die_id: &str) -> bool {
        if die_id == LEAVE_DIE_ID {
            return true;
        }
        self.get(die_id)
            .map_or(false, |die| die.die_name.trim().eq_ignore_ascii_case(LEAVE_DIE_NAME))
    }

    /// A leave day is a record made only of placeholder dies.
    pub fn is_leave_record(&self, record: &DailyProductionRecord) -> bool {
        !record.die_ids.is_empty() && record.die_ids.iter().all(|id| self.is_leave_die(id))
    }

    pub fn sorted(&self) -> Vec<&DieRecord> {
        let mut dies: Vec<&DieRecord> = self.dies.iter().collect();
        dies.sort_by(|a, b| compare_dies(a, b));
        dies
    }

    /// Case-insensitive die-name match, in catalog order.
    pub fn search(&self, term: &str) -> Vec<&DieRecord> {
        let needle = term.trim().to_lowercase();
        self.sorted()
            .into_iter()
            .filter(|die| needle.is_empty() || die.die_name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn upsert(&mut self, die: DieRecord) {
        match self.index.get(&die.die_id) {
            Some(&idx) => self.dies[idx] = die,
            None => {
                self.index.insert(die.die_id.clone(), self.dies.len());
                self.dies.push(die);
            }
        }
    }

    pub fn remove(&mut self, die_id: &str) -> Option<DieRecord> {
        let idx = self.index.get(die_id).copied()?;
        let removed = self.dies.remove(idx);
        self.reindex();
        Some(removed)
    }

    pub async fn refresh(&mut self, api: &dyn ProductionApi) -> Result<usize, ApiError> {
        let dies = api.list_dies().await?;
        info!("Loaded {} dies into the catalog", dies.len());
        self.replace_all(dies);
        Ok(self.len())
    }

    /// Adds a die and caches it under the id the backend assigned.
    pub async fn add_die(&mut self, api: &dyn ProductionApi, die: NewDie) -> Result<String, ApiError> {
        let die_id = api.add_die(&die).await?;
        info!("Added die '{}' as {}", die.die_name, die_id);
        self.upsert(DieRecord {
            die_id: die_id.clone(),
            die_name: die.die_name,
            company_name: die.company_name,
            materials: die.materials,
            cavity: die.cavity,
            weight: die.weight,
            production_per_hour: die.production_per_hour,
            price: die.price,
        });
        Ok(die_id)
    }

    /// The local entry is replaced by what the backend returns, not by `update`.
    pub async fn update_die(
        &mut self,
        api: &dyn ProductionApi,
        die_id: &str,
        update: &DieUpdate,
    ) -> Result<DieRecord, ApiError> {
        let saved = api.edit_die(die_id, update).await?;
        debug!("Backend returned updated die {:?}", saved);
        if saved.die_id != die_id {
            self.remove(die_id);
        }
        self.upsert(saved.clone());
        Ok(saved)
    }
}
