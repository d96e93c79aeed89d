//! Growth-curve extraction: one row per growth curve component.

use polars::prelude::DataFrame;
use rusqlite::Connection;
use tracing::info;

use w2w_transform::{ColumnOrder, PivotSpec, left_join, pivot_wide};

use crate::database::query_frame;
use crate::error::{ExtractError, Result};

const COMPONENT_ID: &str = "growth_curve_component_id";

const COMPONENTS_SQL: &str = "
    SELECT gcc.id AS growth_curve_component_id
    FROM growth_curve_component gcc
    ORDER BY gcc.id";

const CLASSIFIERS_SQL: &str = "
    SELECT
        gcc.id AS growth_curve_component_id, c.name AS classifier_name,
        cv.value AS classifier_value
    FROM growth_curve_component gcc
    INNER JOIN growth_curve_classifier_value gccv
        ON gcc.growth_curve_id = gccv.growth_curve_id
    INNER JOIN classifier_value cv
        ON gccv.classifier_value_id = cv.id
    INNER JOIN classifier c
        ON cv.classifier_id = c.id
    ORDER BY gcc.id, c.id";

const SPECIES_SQL: &str = "
    SELECT gcc.id AS growth_curve_component_id, s.name AS species
    FROM growth_curve_component gcc
    INNER JOIN species s
        ON gcc.species_id = s.id
    ORDER BY gcc.id";

const VOLUMES_SQL: &str = "
    SELECT
        gcc.id AS growth_curve_component_id, gcv.age AS age,
        gcv.merchantable_volume AS merchantable_volume
    FROM growth_curve_component gcc
    INNER JOIN growth_curve_component_value gcv
        ON gcc.id = gcv.growth_curve_component_id
    ORDER BY gcc.id, gcv.age";

const CLASSIFIER_PIVOT: PivotSpec<'static> = PivotSpec {
    index: COMPONENT_ID,
    on: "classifier_name",
    values: "classifier_value",
    order: ColumnOrder::Discovery,
};

const VOLUME_PIVOT: PivotSpec<'static> = PivotSpec {
    index: COMPONENT_ID,
    on: "age",
    values: "merchantable_volume",
    order: ColumnOrder::NumericAscending,
};

/// Builds the `sit_yields` table.
///
/// Columns are the classifiers in discovery order, then `species`, then one
/// column per age in ascending order. Components without classifier values,
/// species or volumes keep their row with empty cells. The component id is a
/// join key only and is not part of the output.
pub struct GrowthCurveExtractor;

impl GrowthCurveExtractor {
    pub fn extract(connection: &Connection) -> Result<DataFrame> {
        let components = query_frame(connection, "growth curve components", COMPONENTS_SQL)?;
        let classifiers = query_frame(connection, "growth curve classifiers", CLASSIFIERS_SQL)?;
        let species = query_frame(connection, "growth curve species", SPECIES_SQL)?;
        let volumes = query_frame(connection, "growth curve volumes", VOLUMES_SQL)?;

        let table = pivot_wide(&classifiers, &CLASSIFIER_PIVOT)
            .and_then(|classifiers| left_join(components, classifiers, COMPONENT_ID))
            .and_then(|table| left_join(table, species, COMPONENT_ID))
            .and_then(|table| {
                let volumes = pivot_wide(&volumes, &VOLUME_PIVOT)?;
                left_join(table, volumes, COMPONENT_ID)
            })
            .and_then(|table| table.drop(COMPONENT_ID))
            .map_err(|source| ExtractError::Frame {
                table: "sit_yields",
                source,
            })?;
        info!(
            rows = table.height(),
            columns = table.width(),
            "extracted growth curves"
        );
        Ok(table)
    }
}
