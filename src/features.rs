use crate::database::Database;

/// Optional capabilities, detected once at startup and cached in the app
/// state for the lifetime of the process.
#[derive(Debug, Clone, Copy)]
pub struct Features {
    pub lot_tracking: bool,
}

impl Features {
    /// Probes the schema for the optional lots table. Deployments that never
    /// ran the lot migration simply run with the lot filter disabled.
    pub async fn detect(db: &Database) -> Result<Self, sqlx::Error> {
        let lots_table: Option<String> =
            sqlx::query_scalar("SELECT to_regclass('public.lots')::text")
                .fetch_one(db)
                .await?;

        let lot_tracking = lots_table.is_some();
        if lot_tracking {
            log::info!("lot tracking enabled (lots table present)");
        } else {
            log::info!("lot tracking disabled (lots table not found)");
        }

        Ok(Self { lot_tracking })
    }
}
