use std::collections::BTreeMap;

use dedupe_core::{CompositeKey, DuplicateGroup, Field, Record, Value};
use dedupe_io::DatasetStore;
use serde::Serialize;

use crate::filter::{is_pobox, FinderFilters};

/// Counts gathered during one finder pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinderSummary {
    pub records_scanned: usize,
    pub excluded_no_address: usize,
    pub excluded_pobox: usize,
    pub groups: usize,
    pub records_in_groups: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinderOutput {
    pub summary: FinderSummary,
    pub groups: Vec<DuplicateGroup>,
}

/// Ordered duplicate groups for the dataset under `filters`.
pub fn find(store: &DatasetStore, filters: &FinderFilters) -> Vec<DuplicateGroup> {
    find_with_summary(store, filters).groups
}

/// Same as [`find`], with counts for reporting.
pub fn find_with_summary(store: &DatasetStore, filters: &FinderFilters) -> FinderOutput {
    let mut summary = FinderSummary::default();
    let mut buckets: BTreeMap<CompositeKey<'_>, Vec<&Record>> = BTreeMap::new();

    for record in store.records() {
        summary.records_scanned += 1;

        let address = record.get(Field::PRIMARY_ADDRESS);
        if address.is_empty() {
            summary.excluded_no_address += 1;
            continue;
        }
        if filters.no_pobox && is_pobox(&address.to_string()) {
            summary.excluded_pobox += 1;
            continue;
        }

        buckets.entry(record.key()).or_default().push(record);
    }

    let operator = filters.entry_recorded_by.as_deref().map(Value::text);

    let mut groups: Vec<DuplicateGroup> = buckets
        .into_values()
        .filter(|members| match &operator {
            Some(op) => members.iter().any(|r| r.get(Field::RECORDED_BY) == op),
            None => true,
        })
        .filter_map(|members| DuplicateGroup::new(members.iter().map(|r| r.id()).collect()))
        .collect();

    groups.sort_by_key(|g| g.first());

    summary.groups = groups.len();
    summary.records_in_groups = groups.iter().map(|g| g.len()).sum();

    log::info!(
        "finder: {} scanned, {} without address, {} PO box, {} group(s) covering {} record(s)",
        summary.records_scanned,
        summary.excluded_no_address,
        summary.excluded_pobox,
        summary.groups,
        summary.records_in_groups,
    );

    FinderOutput { summary, groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedupe_core::RecordId;

    fn rec(id: i64, name: &str, addr: &str, city: &str, state: &str, by: &str) -> Record {
        Record::new(id)
            .with(Field::NAME, name)
            .with(Field::PRIMARY_ADDRESS, addr)
            .with(Field::CITY, city)
            .with(Field::STATE, state)
            .with(Field::RECORDED_BY, by)
    }

    fn ids(groups: &[DuplicateGroup]) -> Vec<Vec<i64>> {
        groups
            .iter()
            .map(|g| g.members().iter().map(|id| id.0).collect())
            .collect()
    }

    fn store(records: Vec<Record>) -> DatasetStore {
        DatasetStore::from_records(records).unwrap()
    }

    #[test]
    fn basic_pair() {
        let s = store(vec![
            rec(11, "Archive", "1 Main St", "Boston", "MA", "ann"),
            rec(10, "Archive", "1 Main Street", "Boston", "MA", "bob"),
        ]);
        assert_eq!(ids(&find(&s, &FinderFilters::default())), vec![vec![10, 11]]);
    }

    #[test]
    fn missing_address_never_grouped() {
        let s = store(vec![
            rec(1, "Archive", "", "Boston", "MA", ""),
            rec(2, "Archive", "", "Boston", "MA", ""),
            rec(3, "Archive", "x", "Boston", "MA", ""),
        ]);
        let out = find_with_summary(&s, &FinderFilters::default());
        assert!(out.groups.is_empty());
        assert_eq!(out.summary.excluded_no_address, 2);
    }

    #[test]
    fn key_is_case_and_whitespace_sensitive() {
        let s = store(vec![
            rec(1, "Archive", "a", "Boston", "MA", ""),
            rec(2, "archive", "a", "Boston", "MA", ""),
            rec(3, "Archive ", "a", "Boston", "MA", ""),
        ]);
        assert!(find(&s, &FinderFilters::default()).is_empty());
    }

    #[test]
    fn pobox_filter_drops_members_before_grouping() {
        let s = store(vec![
            rec(1, "Archive", "PO Box 5", "Boston", "MA", ""),
            rec(2, "Archive", "1 Main St", "Boston", "MA", ""),
            rec(3, "Museum", "P.O. Box 7", "Salem", "MA", ""),
            rec(4, "Museum", "2 Elm St", "Salem", "MA", ""),
            rec(5, "Museum", "3 Oak St", "Salem", "MA", ""),
        ]);
        let all = find(&s, &FinderFilters::default());
        assert_eq!(ids(&all), vec![vec![1, 2], vec![3, 4, 5]]);

        let out = find_with_summary(&s, &FinderFilters::new(None, true));
        assert_eq!(ids(&out.groups), vec![vec![4, 5]]);
        assert_eq!(out.summary.excluded_pobox, 2);
    }

    #[test]
    fn operator_filter_keeps_whole_group() {
        let s = store(vec![
            rec(1, "Archive", "a", "Boston", "MA", "ann"),
            rec(2, "Archive", "b", "Boston", "MA", "bob"),
            rec(3, "Museum", "c", "Salem", "MA", "bob"),
            rec(4, "Museum", "d", "Salem", "MA", "bob"),
        ]);
        let groups = find(&s, &FinderFilters::new(Some("ann".into()), false));
        assert_eq!(ids(&groups), vec![vec![1, 2]]);

        let groups = find(&s, &FinderFilters::new(Some("nobody".into()), false));
        assert!(groups.is_empty());
    }

    #[test]
    fn groups_ordered_by_smallest_id() {
        let s = store(vec![
            rec(9, "Zoo", "a", "X", "Y", ""),
            rec(2, "Zoo", "b", "X", "Y", ""),
            rec(5, "Aquarium", "c", "X", "Y", ""),
            rec(1, "Aquarium", "d", "X", "Y", ""),
            rec(3, "Library", "e", "X", "Y", ""),
            rec(4, "Library", "f", "X", "Y", ""),
        ]);
        let groups = find(&s, &FinderFilters::default());
        assert_eq!(ids(&groups), vec![vec![1, 5], vec![2, 9], vec![3, 4]]);
        assert_eq!(groups[0].first(), RecordId(1));
    }

    #[test]
    fn summary_serializes() {
        let s = store(vec![rec(1, "A", "a", "c", "s", ""), rec(2, "A", "b", "c", "s", "")]);
        let out = find_with_summary(&s, &FinderFilters::default());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["groups"], serde_json::json!([[1, 2]]));
        assert_eq!(json["summary"]["records_in_groups"], 2);
    }
}
