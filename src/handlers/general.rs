use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Root handler: an HTML landing page with links to the docs and module index
pub async fn root_handler() -> impl IntoResponse {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>Factory ERP API</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: 'Segoe UI', system-ui, sans-serif; background: #0f172a; color: #e2e8f0; min-height: 100vh; padding: 40px 20px; }
    .container { max-width: 860px; margin: 0 auto; }
    header { text-align: center; margin-bottom: 48px; }
    header h1 { font-size: 2.6rem; font-weight: 800; color: #38bdf8; margin-bottom: 8px; }
    header p { color: #94a3b8; font-size: 1.05rem; }
    .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(240px, 1fr)); gap: 16px; margin-bottom: 32px; }
    .card { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 20px; }
    .card h3 { font-size: 1rem; font-weight: 600; color: #f1f5f9; margin-bottom: 6px; }
    .card p { font-size: 0.875rem; color: #94a3b8; line-height: 1.5; }
    .card a { color: #38bdf8; text-decoration: none; display: inline-block; margin-top: 8px; font-size: 0.875rem; }
    .routes { background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 24px; }
    .routes h2 { font-size: 1.2rem; color: #f1f5f9; margin-bottom: 16px; }
    .route-item { display: flex; gap: 12px; padding: 8px 0; border-bottom: 1px solid #0f172a; font-size: 0.85rem; }
    .route-path { font-family: monospace; color: #e2e8f0; min-width: 260px; }
    .route-desc { color: #64748b; }
  </style>
</head>
<body>
<div class="container">
  <header>
    <h1>Factory ERP API</h1>
    <p>HR, attendance, payroll, production and cashbook for garment factories</p>
  </header>

  <div class="grid">
    <div class="card">
      <h3>API Documentation</h3>
      <p>Interactive Swagger UI with every endpoint and schema.</p>
      <a href="/docs">Open Swagger UI</a>
    </div>
    <div class="card">
      <h3>Health Check</h3>
      <p>Service status and connectivity of the HR and cashbook databases.</p>
      <a href="/health">GET /health</a>
    </div>
    <div class="card">
      <h3>Device Sync</h3>
      <p>ZKTeco terminals push punches to <code>/iclock/cdata</code>.</p>
    </div>
  </div>

  <div class="routes">
    <h2>Modules under /api/v1</h2>
    <div class="route-item"><span class="route-path">/auth</span><span class="route-desc">Users, login, roles</span></div>
    <div class="route-item"><span class="route-path">/companies, /departments, /sections, /designations, /lines</span><span class="route-desc">Organization structure</span></div>
    <div class="route-item"><span class="route-path">/countries ... /post-offices</span><span class="route-desc">Address hierarchy</span></div>
    <div class="route-item"><span class="route-path">/employees</span><span class="route-desc">Workers, transfers, separations</span></div>
    <div class="route-item"><span class="route-path">/shifts, /holidays, /rosters, /attendance</span><span class="route-desc">Time and attendance</span></div>
    <div class="route-item"><span class="route-path">/leave-types, /leave-applications</span><span class="route-desc">Leave workflow and balances</span></div>
    <div class="route-item"><span class="route-path">/payroll</span><span class="route-desc">Advances, increments, bonuses, salary sheets</span></div>
    <div class="route-item"><span class="route-path">/productions</span><span class="route-desc">Orders, line assignments, hourly output</span></div>
    <div class="route-item"><span class="route-path">/cashbook</span><span class="route-desc">Branches, transactions, fund transfers</span></div>
    <div class="route-item"><span class="route-path">/reports</span><span class="route-desc">Dashboard and attendance summary</span></div>
  </div>
</div>
</body>
</html>"#)
}

/// Health check endpoint; pings the HR and cashbook pools
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let hr = sqlx::query("SELECT 1").fetch_one(&state.db).await;
    let cashbook = sqlx::query("SELECT 1").fetch_one(&state.cashbook_db).await;

    match (hr, cashbook) {
        (Ok(_), Ok(_)) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "cashbook_database": "connected",
                "service": "factory-erp",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        (hr, cashbook) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": hr.err().map(|e| e.to_string()).unwrap_or_else(|| "connected".to_string()),
                "cashbook_database": cashbook.err().map(|e| e.to_string()).unwrap_or_else(|| "connected".to_string()),
            })),
        ),
    }
}
