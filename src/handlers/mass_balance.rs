use askama::Template;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Html,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    context::ReportContext,
    error::ReportError,
    filters,
    models::{Bom, BomLine, Lot, MoveDirection, Product, ProductionOrder, StockMove, Uom},
    report::{distinct_products, production_location, MoveQuery, ReportTotals, ResolvedProduction},
    AppState,
};

#[derive(Template)]
#[template(path = "mass_balance/start.html")]
struct StartTemplate {
    products: Vec<SelectOption>,
    lots: Vec<SelectOption>,
    lot_enabled: bool,
}

struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Deserialize)]
pub struct StartParams {
    product_id: Option<String>,
    lot_id: Option<String>,
}

// Wizard form. Optional query parameters preselect the product or lot so
// the report can be launched from a product or lot page.
pub async fn start_form(
    Query(params): Query<StartParams>,
    State(state): State<AppState>,
) -> Result<Html<String>, StatusCode> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let lots = if state.features.lot_tracking {
        sqlx::query_as::<_, Lot>("SELECT * FROM lots ORDER BY number")
            .fetch_all(&state.db)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    } else {
        Vec::new()
    };

    let mut selected_product = parse_optional_uuid(&params.product_id);
    let mut selected_lot = None;
    if state.features.lot_tracking {
        selected_lot = parse_optional_uuid(&params.lot_id);
        // launching from a lot preselects its product as well
        if let Some(lot_id) = selected_lot {
            if let Some(lot) = lots.iter().find(|lot| lot.id == lot_id) {
                selected_product = Some(lot.product_id);
            }
        }
    }

    let product_names: HashMap<Uuid, String> = products
        .iter()
        .map(|product| (product.id, product.name.clone()))
        .collect();

    let product_options = products
        .iter()
        .map(|product| SelectOption {
            value: product.id.to_string(),
            label: format!("[{}] {}", product.code, product.name),
            selected: Some(product.id) == selected_product,
        })
        .collect();

    let lot_options = lots
        .iter()
        .map(|lot| SelectOption {
            value: lot.id.to_string(),
            label: match product_names.get(&lot.product_id) {
                Some(name) => format!("{} ({})", lot.number, name),
                None => lot.number.clone(),
            },
            selected: Some(lot.id) == selected_lot,
        })
        .collect();

    let template = StartTemplate {
        products: product_options,
        lots: lot_options,
        lot_enabled: state.features.lot_tracking,
    };
    Ok(Html(template.render().unwrap()))
}

#[derive(Deserialize)]
pub struct ReportParams {
    product_id: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    type_: Option<String>,
    lot_id: Option<String>,
}

#[derive(Template)]
#[template(path = "mass_balance/report.html")]
struct ReportTemplate {
    company: String,
    base_url: String,
    direction: &'static str,
    product: String,
    lot: String,
    show_date: bool,
    from_date: String,
    to_date: String,
    productions: Vec<ProductionRow>,
    moves: Vec<MoveRow>,
    products: Vec<String>,
    totals: ReportTotals,
}

struct ProductionRow {
    number: String,
    product: String,
    quantity: Option<Decimal>,
    plan_consumption: Option<Decimal>,
    difference: Option<Decimal>,
    difference_percent: Option<Decimal>,
}

struct MoveRow {
    date: String,
    product: String,
    lot: String,
    quantity: Decimal,
    uom: String,
}

pub async fn report(
    Query(params): Query<ReportParams>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, StatusCode> {
    match prepare(&state, &headers, &params).await {
        Ok(template) => Ok(Html(template.render().unwrap())),
        Err(err) => {
            log::error!("mass balance report failed: {}", err);
            Err(err.status())
        }
    }
}

/// The validated wizard input the report runs with.
struct ReportRequest {
    product: Product,
    lot: Option<Lot>,
    direction: MoveDirection,
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
}

async fn parse_request(
    state: &AppState,
    params: &ReportParams,
) -> Result<ReportRequest, ReportError> {
    let product_id = parse_optional_uuid(&params.product_id)
        .ok_or(ReportError::InvalidParameter("product_id"))?;
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ReportError::ProductNotFound)?;

    let from_date = parse_optional_date(&params.from_date, "from_date")?;
    let to_date = parse_optional_date(&params.to_date, "to_date")?;
    // either bound makes the other one required
    if from_date.is_some() != to_date.is_some() {
        return Err(ReportError::HalfOpenDateRange);
    }

    let direction = match params.type_.as_deref().map(str::trim) {
        None | Some("") => MoveDirection::Output,
        Some(raw) => {
            MoveDirection::parse(raw).ok_or(ReportError::InvalidParameter("type_"))?
        }
    };

    // the lot filter only exists when lot tracking was detected at startup
    let lot = if state.features.lot_tracking {
        match parse_optional_uuid_strict(&params.lot_id)? {
            Some(lot_id) => Some(
                sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = $1")
                    .bind(lot_id)
                    .fetch_optional(&state.db)
                    .await?
                    .ok_or(ReportError::LotNotFound)?,
            ),
            None => None,
        }
    } else {
        None
    };

    Ok(ReportRequest {
        product,
        lot,
        direction,
        from_date,
        to_date,
    })
}

async fn prepare(
    state: &AppState,
    headers: &HeaderMap,
    params: &ReportParams,
) -> Result<ReportTemplate, ReportError> {
    let request = parse_request(state, params).await?;
    let context = ReportContext::build(&state.db, &state.config, headers).await?;
    let location = production_location(&state.db).await?;

    let moves = MoveQuery {
        company_id: state.config.company_id,
        product_id: request.product.id,
        production_location_id: location.id,
        direction: request.direction,
        from_date: request.from_date,
        to_date: request.to_date,
        lot_id: request.lot.as_ref().map(|lot| lot.id),
    }
    .fetch(&state.db)
    .await?;

    // One production order per selected move, duplicates preserved.
    let order_refs: Vec<Uuid> = moves
        .iter()
        .filter_map(|m| match request.direction {
            MoveDirection::Input => m.production_input_id,
            MoveDirection::Output => m.production_output_id,
        })
        .collect();

    let resolved = resolve_productions(state, request.direction, &order_refs).await?;
    let totals = ReportTotals::from_productions(&resolved);
    let product_ids = distinct_products(&resolved);

    // Display names for sibling-move products and order products.
    let mut name_ids: Vec<Uuid> = product_ids.clone();
    for production in &resolved {
        if let Some(product_id) = production.order.product_id {
            name_ids.push(product_id);
        }
    }
    let product_names = fetch_product_names(state, &name_ids).await?;

    let uom_ids: Vec<Uuid> = resolved
        .iter()
        .flat_map(|production| production.siblings.iter().map(|m| m.uom_id))
        .collect();
    let uom_symbols = fetch_uom_symbols(state, &uom_ids).await?;

    let lot_numbers = if state.features.lot_tracking {
        let lot_ids: Vec<Uuid> = resolved
            .iter()
            .flat_map(|production| production.siblings.iter().filter_map(|m| m.lot_id))
            .collect();
        fetch_lot_numbers(state, &lot_ids).await?
    } else {
        HashMap::new()
    };

    let production_rows = resolved
        .iter()
        .map(|production| ProductionRow {
            number: production.order.number.clone(),
            product: production
                .order
                .product_id
                .and_then(|id| product_names.get(&id).cloned())
                .unwrap_or_default(),
            quantity: production.order.quantity,
            plan_consumption: production
                .balance
                .as_ref()
                .map(|balance| balance.plan_consumption),
            difference: production.balance.as_ref().map(|balance| balance.difference),
            difference_percent: production
                .balance
                .as_ref()
                .and_then(|balance| balance.difference_percent),
        })
        .collect();

    let move_rows = resolved
        .iter()
        .flat_map(|production| production.siblings.iter())
        .map(|m| MoveRow {
            date: m
                .effective_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            product: product_names.get(&m.product_id).cloned().unwrap_or_default(),
            lot: m
                .lot_id
                .and_then(|id| lot_numbers.get(&id).cloned())
                .unwrap_or_default(),
            quantity: m.quantity,
            uom: uom_symbols.get(&m.uom_id).cloned().unwrap_or_default(),
        })
        .collect();

    let products = product_ids
        .iter()
        .filter_map(|id| product_names.get(id).cloned())
        .collect();

    Ok(ReportTemplate {
        company: context.company.name,
        base_url: context.base_url,
        direction: request.direction.as_str(),
        product: request.product.name.clone(),
        lot: request
            .lot
            .as_ref()
            .map(|lot| lot.number.clone())
            .unwrap_or_default(),
        show_date: request.from_date.is_some(),
        from_date: format_date(request.from_date),
        to_date: format_date(request.to_date),
        productions: production_rows,
        moves: move_rows,
        products,
        totals,
    })
}

/// Batch-fetches the orders behind `order_refs` together with their BOMs and
/// other-side sibling moves, then computes each order's variance fields.
/// Everything is loaded with one query per table, keyed back in memory.
async fn resolve_productions(
    state: &AppState,
    direction: MoveDirection,
    order_refs: &[Uuid],
) -> Result<Vec<ResolvedProduction>, ReportError> {
    let order_ids = dedup(order_refs);

    let orders = sqlx::query_as::<_, ProductionOrder>(
        "SELECT * FROM productions WHERE id = ANY($1)",
    )
    .bind(&order_ids)
    .fetch_all(&state.db)
    .await?;
    let orders: HashMap<Uuid, ProductionOrder> =
        orders.into_iter().map(|order| (order.id, order)).collect();

    let bom_ids = dedup(
        &orders
            .values()
            .filter_map(|order| order.bom_id)
            .collect::<Vec<_>>(),
    );
    let boms = fetch_boms(state, &bom_ids).await?;

    // The other side of each order: outputs when looking at consumption,
    // inputs when looking at yield.
    let sibling_column = match direction {
        MoveDirection::Input => "production_output_id",
        MoveDirection::Output => "production_input_id",
    };
    let sibling_sql = format!(
        "SELECT * FROM stock_moves WHERE {} = ANY($1) ORDER BY effective_date DESC, id",
        sibling_column
    );
    let sibling_moves = sqlx::query_as::<_, StockMove>(&sibling_sql)
        .bind(&order_ids)
        .fetch_all(&state.db)
        .await?;

    let mut siblings: HashMap<Uuid, Vec<StockMove>> = HashMap::new();
    for sibling in sibling_moves {
        let owner = match direction {
            MoveDirection::Input => sibling.production_output_id,
            MoveDirection::Output => sibling.production_input_id,
        };
        if let Some(owner) = owner {
            siblings.entry(owner).or_default().push(sibling);
        }
    }

    let mut resolved = Vec::with_capacity(order_refs.len());
    for order_id in order_refs {
        let Some(order) = orders.get(order_id) else {
            continue;
        };
        let bom = order.bom_id.and_then(|id| boms.get(&id));
        let balance = order.mass_balance(bom);
        resolved.push(ResolvedProduction {
            order: order.clone(),
            balance,
            siblings: siblings.get(order_id).cloned().unwrap_or_default(),
        });
    }
    Ok(resolved)
}

#[derive(sqlx::FromRow)]
struct BomRow {
    id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct BomLineRow {
    bom_id: Uuid,
    product_id: Uuid,
    uom_id: Uuid,
    quantity: Decimal,
}

async fn fetch_boms(
    state: &AppState,
    bom_ids: &[Uuid],
) -> Result<HashMap<Uuid, Bom>, ReportError> {
    let rows = sqlx::query_as::<_, BomRow>("SELECT id, name FROM boms WHERE id = ANY($1)")
        .bind(bom_ids)
        .fetch_all(&state.db)
        .await?;

    let inputs = fetch_bom_lines(state, "bom_inputs", bom_ids).await?;
    let outputs = fetch_bom_lines(state, "bom_outputs", bom_ids).await?;

    let uom_ids: Vec<Uuid> = inputs
        .iter()
        .chain(outputs.iter())
        .map(|line| line.uom_id)
        .collect();
    let uoms = fetch_uoms(state, &dedup(&uom_ids)).await?;

    let mut boms: HashMap<Uuid, Bom> = rows
        .into_iter()
        .map(|row| {
            (
                row.id,
                Bom {
                    id: row.id,
                    name: row.name,
                    inputs: Vec::new(),
                    outputs: Vec::new(),
                },
            )
        })
        .collect();

    for line in inputs {
        let Some(uom) = uoms.get(&line.uom_id) else {
            continue;
        };
        if let Some(bom) = boms.get_mut(&line.bom_id) {
            bom.inputs.push(BomLine {
                product_id: line.product_id,
                quantity: line.quantity,
                uom: uom.clone(),
            });
        }
    }
    for line in outputs {
        let Some(uom) = uoms.get(&line.uom_id) else {
            continue;
        };
        if let Some(bom) = boms.get_mut(&line.bom_id) {
            bom.outputs.push(BomLine {
                product_id: line.product_id,
                quantity: line.quantity,
                uom: uom.clone(),
            });
        }
    }
    Ok(boms)
}

async fn fetch_bom_lines(
    state: &AppState,
    table: &str,
    bom_ids: &[Uuid],
) -> Result<Vec<BomLineRow>, ReportError> {
    let sql = format!(
        "SELECT bom_id, product_id, uom_id, quantity FROM {} WHERE bom_id = ANY($1) ORDER BY sequence, id",
        table
    );
    Ok(sqlx::query_as::<_, BomLineRow>(&sql)
        .bind(bom_ids)
        .fetch_all(&state.db)
        .await?)
}

async fn fetch_uoms(
    state: &AppState,
    uom_ids: &[Uuid],
) -> Result<HashMap<Uuid, Uom>, ReportError> {
    let uoms = sqlx::query_as::<_, Uom>("SELECT * FROM uoms WHERE id = ANY($1)")
        .bind(uom_ids)
        .fetch_all(&state.db)
        .await?;
    Ok(uoms.into_iter().map(|uom| (uom.id, uom)).collect())
}

async fn fetch_uom_symbols(
    state: &AppState,
    uom_ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, ReportError> {
    let uoms = fetch_uoms(state, &dedup(uom_ids)).await?;
    Ok(uoms
        .into_iter()
        .map(|(id, uom)| (id, uom.symbol))
        .collect())
}

async fn fetch_product_names(
    state: &AppState,
    product_ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, ReportError> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(&dedup(product_ids))
        .fetch_all(&state.db)
        .await?;
    Ok(products
        .into_iter()
        .map(|product| (product.id, product.name))
        .collect())
}

async fn fetch_lot_numbers(
    state: &AppState,
    lot_ids: &[Uuid],
) -> Result<HashMap<Uuid, String>, ReportError> {
    let lots = sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = ANY($1)")
        .bind(&dedup(lot_ids))
        .fetch_all(&state.db)
        .await?;
    Ok(lots.into_iter().map(|lot| (lot.id, lot.number)).collect())
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

fn parse_optional_uuid(value: &Option<String>) -> Option<Uuid> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

// Strict variant for the report route: garbage is a client error, not a
// silently dropped filter.
fn parse_optional_uuid_strict(value: &Option<String>) -> Result<Option<Uuid>, ReportError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ReportError::InvalidParameter("lot_id")),
    }
}

fn parse_optional_date(
    value: &Option<String>,
    name: &'static str,
) -> Result<Option<NaiveDate>, ReportError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ReportError::InvalidParameter(name)),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn optional_uuid_parsing_ignores_blank_and_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_optional_uuid(&Some(id.to_string())), Some(id));
        assert_eq!(parse_optional_uuid(&Some("  ".to_string())), None);
        assert_eq!(parse_optional_uuid(&Some("nope".to_string())), None);
        assert_eq!(parse_optional_uuid(&None), None);
    }

    #[test]
    fn strict_uuid_parsing_rejects_garbage() {
        assert!(parse_optional_uuid_strict(&Some("nope".to_string())).is_err());
        assert_eq!(parse_optional_uuid_strict(&None).unwrap(), None);
        assert_eq!(
            parse_optional_uuid_strict(&Some(String::new())).unwrap(),
            None
        );
    }

    #[test]
    fn date_parsing_accepts_iso_and_rejects_the_rest() {
        assert_eq!(
            parse_optional_date(&Some("2026-01-31".to_string()), "from_date").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
        assert_eq!(parse_optional_date(&None, "from_date").unwrap(), None);
        assert_eq!(
            parse_optional_date(&Some(String::new()), "from_date").unwrap(),
            None
        );
        assert!(parse_optional_date(&Some("31/01/2026".to_string()), "from_date").is_err());
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(&[a, b, a, b, a]), vec![a, b]);
        assert!(dedup(&[]).is_empty());
    }
}
