use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;

/// One day of aggregated trip history.
#[derive(Debug, Clone, Serialize)]
pub struct TripDayStat {
    pub date: NaiveDate,
    pub trip_count: i64,
    pub avg_hour: f64,
}

/// Daily trip aggregates over the trailing 30 days, oldest first.
///
/// The `passenger_trips` table is owned by the upstream trip system; this is
/// the service's only database read and it never writes.
pub async fn fetch_daily_trip_stats(pool: &sqlx::PgPool) -> anyhow::Result<Vec<TripDayStat>> {
    let rows = sqlx::query_as::<_, (NaiveDate, i64, Option<f64>)>(
        "SELECT DATE(created_at) AS date, \
                COUNT(*) AS trip_count, \
                AVG(EXTRACT(HOUR FROM created_at))::float8 AS avg_hour \
         FROM passenger_trips \
         WHERE created_at >= NOW() - INTERVAL '30 days' \
         GROUP BY DATE(created_at) \
         ORDER BY date",
    )
    .fetch_all(pool)
    .await
    .context("query passenger_trips history failed")?;

    Ok(rows
        .into_iter()
        .map(|(date, trip_count, avg_hour)| TripDayStat {
            date,
            trip_count,
            avg_hour: avg_hour.unwrap_or(0.0),
        })
        .collect())
}
