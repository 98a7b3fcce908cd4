use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    database::Database,
    error::ReportError,
    models::{Location, MoveDirection, StockMove},
};

/// Earliest/latest dates an omitted range bound falls back to. These stay
/// inside the range Postgres accepts for DATE.
fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap()
}

fn max_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()
}

/// Selection of completed stock moves crossing the production location,
/// newest first. `sql()` assembles the statement, `fetch()` binds the
/// parameters in the same order and runs it.
#[derive(Debug, Clone)]
pub struct MoveQuery {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub production_location_id: Uuid,
    pub direction: MoveDirection,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub lot_id: Option<Uuid>,
}

impl MoveQuery {
    pub fn sql(&self) -> String {
        let location_column = match self.direction {
            MoveDirection::Input => "to_location_id",
            MoveDirection::Output => "from_location_id",
        };

        let mut conditions = vec![
            "product_id = $1".to_string(),
            "company_id = $2".to_string(),
            "state = 'done'".to_string(),
            "effective_date >= $3".to_string(),
            "effective_date <= $4".to_string(),
            format!("{} = $5", location_column),
        ];
        if self.lot_id.is_some() {
            conditions.push("lot_id = $6".to_string());
        }

        format!(
            "SELECT * FROM stock_moves WHERE {} ORDER BY effective_date DESC",
            conditions.join(" AND ")
        )
    }

    pub async fn fetch(&self, db: &Database) -> Result<Vec<StockMove>, ReportError> {
        let sql = self.sql();
        let mut query = sqlx::query_as::<_, StockMove>(&sql)
            .bind(self.product_id)
            .bind(self.company_id)
            .bind(self.from_date.unwrap_or_else(min_date))
            .bind(self.to_date.unwrap_or_else(max_date))
            .bind(self.production_location_id);
        if let Some(lot_id) = self.lot_id {
            query = query.bind(lot_id);
        }

        Ok(query.fetch_all(db).await?)
    }
}

/// Resolves the single location that marks the manufacturing boundary.
/// Anything other than exactly one configured production location is an
/// installation error and fails the whole report run.
pub async fn production_location(db: &Database) -> Result<Location, ReportError> {
    let mut locations =
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE kind = 'production'")
            .fetch_all(db)
            .await?;

    match locations.len() {
        0 => Err(ReportError::ProductionLocationMissing),
        1 => Ok(locations.remove(0)),
        found => Err(ReportError::ProductionLocationAmbiguous(found)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query(direction: MoveDirection, lot_id: Option<Uuid>) -> MoveQuery {
        MoveQuery {
            company_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            production_location_id: Uuid::new_v4(),
            direction,
            from_date: None,
            to_date: None,
            lot_id,
        }
    }

    #[test]
    fn input_direction_filters_on_the_destination() {
        assert_eq!(
            query(MoveDirection::Input, None).sql(),
            "SELECT * FROM stock_moves WHERE product_id = $1 AND company_id = $2 \
             AND state = 'done' AND effective_date >= $3 AND effective_date <= $4 \
             AND to_location_id = $5 ORDER BY effective_date DESC"
        );
    }

    #[test]
    fn output_direction_filters_on_the_source() {
        assert_eq!(
            query(MoveDirection::Output, None).sql(),
            "SELECT * FROM stock_moves WHERE product_id = $1 AND company_id = $2 \
             AND state = 'done' AND effective_date >= $3 AND effective_date <= $4 \
             AND from_location_id = $5 ORDER BY effective_date DESC"
        );
    }

    #[test]
    fn lot_filter_appends_a_sixth_bind() {
        let sql = query(MoveDirection::Output, Some(Uuid::new_v4())).sql();
        assert!(sql.contains("AND lot_id = $6 ORDER BY"));
    }

    #[test]
    fn omitted_bounds_stay_within_the_date_type_range() {
        assert_eq!(min_date(), NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
        assert_eq!(max_date(), NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
    }
}
