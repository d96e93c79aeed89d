//! Transition-rule extraction: one row per `(id, regen_delay, age_after)`.

use polars::prelude::DataFrame;
use rusqlite::Connection;
use tracing::info;

use w2w_transform::{ColumnOrder, PivotSpec, left_join, pivot_wide};

use crate::database::query_frame;
use crate::error::{ExtractError, Result};

const TRANSITIONS_SQL: &str = "
    SELECT t.id AS id, t.regen_delay AS regen_delay, t.age AS age_after
    FROM \"transition\" t
    ORDER BY t.id";

const CLASSIFIERS_SQL: &str = "
    SELECT t.id AS id, c.name AS classifier_name, cv.value AS classifier_value
    FROM \"transition\" t
    INNER JOIN transition_classifier_value tcv
        ON t.id = tcv.transition_id
    INNER JOIN classifier_value cv
        ON tcv.classifier_value_id = cv.id
    INNER JOIN classifier c
        ON cv.classifier_id = c.id
    ORDER BY t.id, c.id";

/// Transition ids are unique, so classifier values pivot on the id alone.
const CLASSIFIER_PIVOT: PivotSpec<'static> = PivotSpec {
    index: "id",
    on: "classifier_name",
    values: "classifier_value",
    order: ColumnOrder::Discovery,
};

/// Builds the `sit_transitions` table: `id`, `regen_delay`, `age_after`, then
/// one column per classifier in discovery order.
pub struct TransitionExtractor;

impl TransitionExtractor {
    pub fn extract(connection: &Connection) -> Result<DataFrame> {
        let transitions = query_frame(connection, "transitions", TRANSITIONS_SQL)?;
        let classifiers = query_frame(connection, "transition classifiers", CLASSIFIERS_SQL)?;

        let table = pivot_wide(&classifiers, &CLASSIFIER_PIVOT)
            .and_then(|classifiers| left_join(transitions, classifiers, "id"))
            .map_err(|source| ExtractError::Frame {
                table: "sit_transitions",
                source,
            })?;
        info!(
            rows = table.height(),
            columns = table.width(),
            "extracted transition rules"
        );
        Ok(table)
    }
}
