use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
}

/// Which side of the production location the report looks at: `Input`
/// selects moves into production (consumption), `Output` selects moves
/// out of it (yield).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Input,
    Output,
}

impl MoveDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// A recorded transfer of a product quantity between two locations. The
/// production back-references tie a move to the run it feeds (input side)
/// or was produced by (output side).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockMove {
    pub id: Uuid,
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub uom_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub state: String,
    pub effective_date: Option<NaiveDate>,
    pub production_input_id: Option<Uuid>,
    pub production_output_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
