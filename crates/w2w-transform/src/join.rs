use polars::prelude::*;

/// Left-joins `right` onto `left` on a shared key column.
///
/// Every row of `left` is kept in order and right-hand columns stay null
/// where no right row matches. Null keys never match. `right` is expected to
/// hold at most one row per key.
pub fn left_join(left: DataFrame, right: DataFrame, on: &str) -> PolarsResult<DataFrame> {
    left.lazy()
        .join(
            right.lazy(),
            [col(on)],
            [col(on)],
            JoinArgs {
                maintain_order: MaintainOrderJoin::Left,
                ..JoinArgs::new(JoinType::Left)
            },
        )
        .collect()
}
