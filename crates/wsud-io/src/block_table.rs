//! Block table loader (spec §6 "Block table input"): one CSV row per
//! [`Block`], headers matching its field names. Missing optional numeric
//! columns default to `0.0`, per spec; a malformed or missing *required*
//! field (`block_id`, `basin_id`) is an Input error that aborts the run
//! (§7), surfaced as [`wsud_core::PlannerError::Validation`] rather than a
//! silently-defaulted value.

use std::path::Path;

use serde::Deserialize;
use wsud_core::block::{DemandBucket, LandUseScope};
use wsud_core::units::{KilolitresPerYear, SquareMetres};
use wsud_core::{Block, Diagnostics, PlannerError, PlannerResult};

/// Raw CSV row shape. Every field beyond the two required ids is optional
/// and defaults to zero (`#[serde(default)]`), matching "missing optional
/// fields default to 0" in the external-interfaces section.
#[derive(Debug, Deserialize)]
struct BlockRow {
    block_id: i64,
    basin_id: i64,
    #[serde(default = "default_down_id")]
    down_id: i64,
    #[serde(default)]
    outlet: i64,
    #[serde(default = "default_one")]
    active: i64,
    #[serde(default = "default_one")]
    in_service: i64,
    #[serde(default)]
    soil_k: f64,
    #[serde(default)]
    area: f64,

    #[serde(default)]
    res_allots: i64,
    #[serde(default)]
    res_houses: i64,
    #[serde(default)]
    res_flats: i64,
    #[serde(default)]
    li_estates: i64,
    #[serde(default)]
    hi_estates: i64,
    #[serde(default)]
    com_estates: i64,

    #[serde(default)]
    res_lot_eia: f64,
    #[serde(default)]
    res_lot_tia: f64,
    #[serde(default)]
    hdres_lot_eia: f64,
    #[serde(default)]
    hdres_lot_tia: f64,
    #[serde(default)]
    li_eia: f64,
    #[serde(default)]
    li_tia: f64,
    #[serde(default)]
    hi_eia: f64,
    #[serde(default)]
    hi_tia: f64,
    #[serde(default)]
    com_eia: f64,
    #[serde(default)]
    com_tia: f64,
    #[serde(default)]
    street_eia: f64,
    #[serde(default)]
    street_tia: f64,

    #[serde(default)]
    pg_av: f64,
    #[serde(default)]
    rsv_av: f64,
    #[serde(default)]
    street_verge_av: f64,
    #[serde(default)]
    lot_pervious_av: f64,

    #[serde(default)]
    res_kitchen: f64,
    #[serde(default)]
    res_shower: f64,
    #[serde(default)]
    res_toilet: f64,
    #[serde(default)]
    res_laundry: f64,
    #[serde(default)]
    res_indoor_irrigation: f64,
    #[serde(default)]
    res_public_irrigation: f64,

    #[serde(default)]
    hdres_kitchen: f64,
    #[serde(default)]
    hdres_shower: f64,
    #[serde(default)]
    hdres_toilet: f64,
    #[serde(default)]
    hdres_laundry: f64,
    #[serde(default)]
    hdres_indoor_irrigation: f64,
    #[serde(default)]
    hdres_public_irrigation: f64,

    #[serde(default)]
    nonres_demand: f64,
}

fn default_down_id() -> i64 {
    -1
}

fn default_one() -> i64 {
    1
}

fn row_to_block(row: BlockRow, diagnostics: &mut Diagnostics) -> PlannerResult<Block> {
    if row.block_id <= 0 {
        return Err(PlannerError::Validation(format!(
            "block table record has non-positive block_id {}",
            row.block_id
        )));
    }
    if row.basin_id <= 0 {
        return Err(PlannerError::Validation(format!(
            "block {} has non-positive basin_id {}",
            row.block_id, row.basin_id
        )));
    }
    let down_id = if row.down_id == -1 {
        None
    } else if row.down_id <= 0 {
        return Err(PlannerError::Validation(format!(
            "block {} has invalid down_id {} (expected a positive block id or -1)",
            row.block_id, row.down_id
        )));
    } else {
        Some(row.down_id as u32)
    };

    if row.soil_k < 0.0 {
        diagnostics.add_warning("block_table", format!("block {} has negative soil_k, clamped to 0", row.block_id));
    }

    let mut block = Block {
        block_id: row.block_id as u32,
        basin_id: row.basin_id as u32,
        down_id,
        outlet: row.outlet != 0,
        active: row.active != 0,
        in_service: row.in_service != 0,
        soil_k: row.soil_k.max(0.0),
        area: SquareMetres::new(row.area),
        res_allots: row.res_allots.max(0) as u32,
        res_houses: row.res_houses.max(0) as u32,
        res_flats: row.res_flats.max(0) as u32,
        li_estates: row.li_estates.max(0) as u32,
        hi_estates: row.hi_estates.max(0) as u32,
        com_estates: row.com_estates.max(0) as u32,
        res_lot_eia: SquareMetres::new(row.res_lot_eia),
        res_lot_tia: SquareMetres::new(row.res_lot_tia),
        hdres_lot_eia: SquareMetres::new(row.hdres_lot_eia),
        hdres_lot_tia: SquareMetres::new(row.hdres_lot_tia),
        li_eia: SquareMetres::new(row.li_eia),
        li_tia: SquareMetres::new(row.li_tia),
        hi_eia: SquareMetres::new(row.hi_eia),
        hi_tia: SquareMetres::new(row.hi_tia),
        com_eia: SquareMetres::new(row.com_eia),
        com_tia: SquareMetres::new(row.com_tia),
        street_eia: SquareMetres::new(row.street_eia),
        street_tia: SquareMetres::new(row.street_tia),
        pg_av: SquareMetres::new(row.pg_av),
        rsv_av: SquareMetres::new(row.rsv_av),
        street_verge_av: SquareMetres::new(row.street_verge_av),
        lot_pervious_av: SquareMetres::new(row.lot_pervious_av),
        res_demand: DemandBucket {
            kitchen: KilolitresPerYear::new(row.res_kitchen),
            shower: KilolitresPerYear::new(row.res_shower),
            toilet: KilolitresPerYear::new(row.res_toilet),
            laundry: KilolitresPerYear::new(row.res_laundry),
            indoor_irrigation: KilolitresPerYear::new(row.res_indoor_irrigation),
            public_irrigation: KilolitresPerYear::new(row.res_public_irrigation),
        },
        hdres_demand: DemandBucket {
            kitchen: KilolitresPerYear::new(row.hdres_kitchen),
            shower: KilolitresPerYear::new(row.hdres_shower),
            toilet: KilolitresPerYear::new(row.hdres_toilet),
            laundry: KilolitresPerYear::new(row.hdres_laundry),
            indoor_irrigation: KilolitresPerYear::new(row.hdres_indoor_irrigation),
            public_irrigation: KilolitresPerYear::new(row.hdres_public_irrigation),
        },
        nonres_demand: KilolitresPerYear::new(row.nonres_demand),
        manage_eia: SquareMetres::ZERO,
    };
    block.recompute_manage_eia(&LandUseScope::default());
    Ok(block)
}

/// Loads a block table CSV from `path`. Aborts with
/// [`PlannerError::Validation`] naming the offending record on the first
/// malformed row (§7 "Input error"); accumulates non-fatal observations
/// (e.g. a negative `soil_k` clamped to zero) into the returned
/// [`Diagnostics`].
pub fn load_block_table(path: &Path) -> PlannerResult<(Vec<Block>, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PlannerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

    let mut blocks = Vec::new();
    for (line, record) in reader.deserialize::<BlockRow>().enumerate() {
        let row = record.map_err(|e| {
            PlannerError::Validation(format!("block table row {} (near line {}) failed to parse: {e}", line + 1, line + 2))
        })?;
        blocks.push(row_to_block(row, &mut diagnostics)?);
    }

    if blocks.is_empty() {
        diagnostics.add_warning("block_table", "block table is empty");
    }
    tracing::info!(count = blocks.len(), path = %path.display(), "loaded block table");
    Ok((blocks, diagnostics))
}
