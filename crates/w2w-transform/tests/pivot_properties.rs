use std::collections::BTreeSet;

use polars::prelude::{Column, DataFrame};
use proptest::prelude::*;

use w2w_transform::{ColumnOrder, PivotSpec, left_join, pivot_wide};

const NAMES: PivotSpec<'static> = PivotSpec {
    index: "id",
    on: "classifier_name",
    values: "classifier_value",
    order: ColumnOrder::Discovery,
};

const AGES: PivotSpec<'static> = PivotSpec {
    index: "id",
    on: "age",
    values: "merchantable_volume",
    order: ColumnOrder::NumericAscending,
};

fn long_frame(spec: &PivotSpec<'_>, rows: &[(String, String, String)]) -> DataFrame {
    let ids: Vec<&str> = rows.iter().map(|row| row.0.as_str()).collect();
    let keys: Vec<&str> = rows.iter().map(|row| row.1.as_str()).collect();
    let values: Vec<&str> = rows.iter().map(|row| row.2.as_str()).collect();
    DataFrame::new(vec![
        Column::new(spec.index.into(), ids),
        Column::new(spec.on.into(), keys),
        Column::new(spec.values.into(), values),
    ])
    .unwrap()
}

fn build_wide(classifiers: &[(u8, u8, u8)], volumes: &[(u8, u16, u16)]) -> DataFrame {
    let names: Vec<_> = classifiers
        .iter()
        .map(|&(id, name, value)| (id.to_string(), format!("c{name}"), value.to_string()))
        .collect();
    let ages: Vec<_> = volumes
        .iter()
        .map(|&(id, age, volume)| (id.to_string(), age.to_string(), volume.to_string()))
        .collect();
    let names = pivot_wide(&long_frame(&NAMES, &names), &NAMES).unwrap();
    let ages = pivot_wide(&long_frame(&AGES, &ages), &AGES).unwrap();
    left_join(names, ages, "id").unwrap()
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

proptest! {
    #[test]
    fn column_count_matches_distinct_names_and_ages(
        classifiers in prop::collection::vec((0u8..6, 0u8..4, 0u8..3), 1..30),
        volumes in prop::collection::vec((0u8..6, 0u16..200, 0u16..500), 0..30),
        seed in any::<u64>(),
    ) {
        let table = build_wide(&classifiers, &volumes);

        let distinct_names: BTreeSet<u8> = classifiers.iter().map(|c| c.1).collect();
        let distinct_ages: BTreeSet<u16> = volumes.iter().map(|v| v.1).collect();
        prop_assert_eq!(table.width(), 1 + distinct_names.len() + distinct_ages.len());

        let distinct_ids: BTreeSet<u8> = classifiers.iter().map(|c| c.0).collect();
        prop_assert_eq!(table.height(), distinct_ids.len());

        // Reordering the source rows does not change the set of columns.
        let mut shuffled_classifiers = classifiers.clone();
        let mut shuffled_volumes = volumes.clone();
        let rotate_c = (seed as usize) % shuffled_classifiers.len();
        shuffled_classifiers.rotate_left(rotate_c);
        shuffled_classifiers.reverse();
        if !shuffled_volumes.is_empty() {
            let rotate_v = (seed as usize) % shuffled_volumes.len();
            shuffled_volumes.rotate_left(rotate_v);
        }
        let reordered = build_wide(&shuffled_classifiers, &shuffled_volumes);

        let left: BTreeSet<String> = column_names(&table).into_iter().collect();
        let right: BTreeSet<String> = column_names(&reordered).into_iter().collect();
        prop_assert_eq!(left, right);
        prop_assert_eq!(table.width(), reordered.width());
    }

    #[test]
    fn age_columns_are_ascending(
        volumes in prop::collection::vec((0u8..4, 0u16..300, 0u16..50), 1..40),
    ) {
        let rows: Vec<_> = volumes
            .iter()
            .map(|&(id, age, volume)| (id.to_string(), age.to_string(), volume.to_string()))
            .collect();
        let table = pivot_wide(&long_frame(&AGES, &rows), &AGES).unwrap();
        let parsed: Vec<u16> = column_names(&table)[1..]
            .iter()
            .map(|header| header.parse().unwrap())
            .collect();
        prop_assert!(parsed.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
