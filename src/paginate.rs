use crate::dates::{self, YearFilter};
use crate::enrich::{self, Enriched, VehicleLabel};
use crate::models::{Driver, Equipment, Invariant, Partner, SanctionRule, Vehicle};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Items on a 1-based page. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Current page and page size of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self { page: 1, page_size }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 1;
    }

    pub fn go_to(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next(&mut self, len: usize) {
        let last = total_pages(len, self.page_size).max(1);
        self.page = (self.page + 1).min(last);
    }

    pub fn previous(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        paginate(items, self.page, self.page_size)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// How the driver list is scoped to partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerScope<'a> {
    All,
    Partner(&'a str),
}

impl<'a> PartnerScope<'a> {
    /// The active partner always wins; the explicit filter only applies
    /// when no partner is active.
    pub fn resolve(active: Option<&'a str>, explicit: Option<&'a str>) -> Self {
        match active.or(explicit) {
            Some(id) => Self::Partner(id),
            None => Self::All,
        }
    }
}

/// Drivers in scope whose "first last" name contains the search term,
/// labeled with their partner's name.
pub fn filter_drivers(
    drivers: &[Driver],
    partners: &[Partner],
    scope: PartnerScope<'_>,
    search: &str,
) -> Vec<Enriched<Driver>> {
    enrich::enrich_with_partner_name(drivers, partners)
        .into_iter()
        .filter(|entry| match scope {
            PartnerScope::All => true,
            PartnerScope::Partner(id) => entry.record.partner_id.as_deref() == Some(id),
        })
        .filter(|entry| contains_ignore_case(&entry.record.full_name(), search))
        .collect()
}

/// Sanction rules matching the search on sanction, invariant title, or
/// type, ordered by invariant title.
pub fn filter_sanction_rules(
    rules: &[SanctionRule],
    invariants: &[Invariant],
    search: &str,
) -> Vec<Enriched<SanctionRule>> {
    let mut matches: Vec<Enriched<SanctionRule>> =
        enrich::enrich_with_invariant_title(rules, invariants)
            .into_iter()
            .filter(|entry| {
                contains_ignore_case(&entry.record.sanction, search)
                    || contains_ignore_case(&entry.label, search)
                    || contains_ignore_case(&entry.record.kind, search)
            })
            .collect();
    matches.sort_by(|a, b| a.label.cmp(&b.label));
    matches
}

/// Equipment in the selected year matching the search on vehicle name or
/// registration, newest first.
pub fn filter_equipment(
    equipment: &[Equipment],
    vehicles: &[Vehicle],
    year: YearFilter,
    search: &str,
) -> Vec<Enriched<Equipment, VehicleLabel>> {
    let mut matches: Vec<Enriched<Equipment, VehicleLabel>> =
        enrich::enrich_with_vehicle_label(equipment, vehicles)
            .into_iter()
            .filter(|entry| match year {
                YearFilter::All => true,
                YearFilter::Year(_) => dates::normalize_date(&entry.record.date)
                    .is_some_and(|date| year.matches(date)),
            })
            .filter(|entry| {
                contains_ignore_case(&entry.label.name, search)
                    || contains_ignore_case(&entry.label.registration, search)
            })
            .collect();
    matches.sort_by(|a, b| {
        let a = dates::normalize_date(&a.record.date);
        let b = dates::normalize_date(&b.record.date);
        b.cmp(&a)
    });
    matches
}
