use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Ledger, LedgerSummary, RawAmount, ResolvedView, SeriesWarning, ViewState, YearDrilldown,
    YearRow, YearStatus, allowance_for, parse_year_key, sum_amounts, tax_year_label,
};
use crate::error::{LedgerError, LedgerResult};

const DRILLDOWN_PARAM: &str = "drilldown";

#[derive(Parser, Debug)]
#[command(
    name = "pension-allowance",
    about = "UK pension annual allowance ledger with three-year carry-forward"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the ledger over HTTP
    Serve(ServeArgs),
    /// Print the ledger for a set of yearly contribution totals
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "ALLOWANCE_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,
    #[arg(long, env = "ALLOWANCE_PORT", default_value_t = 8080)]
    pub port: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(
        long = "year",
        value_name = "LABEL=AMOUNT",
        help = "Contribution total for one tax year, e.g. 2023/24=52000; repeatable"
    )]
    pub years: Vec<String>,
    #[arg(
        long,
        value_name = "JSON",
        help = "JSON object of tax year to contribution total, e.g. '{\"2023/24\": 52000}'"
    )]
    pub totals: Option<String>,
    #[arg(long, value_name = "LABEL", help = "Tax year to show in detail")]
    pub drilldown: Option<String>,
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LedgerPayload {
    totals: Value,
    drilldown: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AllowanceQuery {
    year: String,
}

#[derive(Debug)]
struct LedgerRequest {
    ledger: Ledger,
    view: ViewState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerResponse {
    years: Vec<YearRow>,
    summary: LedgerSummary,
    warnings: Vec<SeriesWarning>,
    drilldown: Option<YearDrilldown>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllowanceResponse {
    year_start: i32,
    label: String,
    allowance: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(args: ServeArgs) -> std::io::Result<()> {
    let addr = SocketAddr::new(args.bind, args.port);
    let app = Router::new()
        .route(
            "/api/ledger",
            get(ledger_get_handler).post(ledger_post_handler),
        )
        .route("/api/allowance", get(allowance_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "annual allowance API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn ledger_get_handler(Query(pairs): Query<Vec<(String, String)>>) -> Response {
    ledger_handler_impl(ledger_request_from_pairs(pairs))
}

async fn ledger_post_handler(Json(payload): Json<LedgerPayload>) -> Response {
    ledger_handler_impl(ledger_request_from_payload(payload))
}

fn ledger_handler_impl(request: LedgerResult<LedgerRequest>) -> Response {
    let request = match request {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "rejecting ledger request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let summary = request.ledger.summary();
    info!(
        years = request.ledger.len(),
        total_available = summary.total_available,
        total_lost = summary.total_lost,
        "built ledger"
    );
    json_response(
        StatusCode::OK,
        build_ledger_response(&request.ledger, request.view),
    )
}

async fn allowance_handler(Query(query): Query<AllowanceQuery>) -> Response {
    match parse_year_key(&query.year) {
        Some(year_start) => json_response(
            StatusCode::OK,
            AllowanceResponse {
                year_start,
                label: tax_year_label(year_start),
                allowance: allowance_for(year_start),
            },
        ),
        None => error_response(
            StatusCode::BAD_REQUEST,
            &LedgerError::InvalidInput(format!("unparsable tax year {:?}", query.year))
                .to_string(),
        ),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn ledger_request_from_json(json: &str) -> LedgerResult<LedgerRequest> {
    let payload = serde_json::from_str::<LedgerPayload>(json)
        .map_err(|e| LedgerError::InvalidInput(format!("Invalid API JSON payload: {e}")))?;
    ledger_request_from_payload(payload)
}

fn ledger_request_from_payload(payload: LedgerPayload) -> LedgerResult<LedgerRequest> {
    let ledger = Ledger::from_json(&payload.totals)?;
    let view = resolve_view(&ledger, payload.drilldown.as_deref())?;
    Ok(LedgerRequest { ledger, view })
}

/// Query pairs keep their order so duplicate years resolve by last write.
fn ledger_request_from_pairs(pairs: Vec<(String, String)>) -> LedgerResult<LedgerRequest> {
    let mut drilldown = None;
    let mut totals = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if key == DRILLDOWN_PARAM {
            drilldown = Some(value);
        } else {
            totals.push((key, RawAmount::Text(value)));
        }
    }

    let ledger = Ledger::from_totals(totals);
    let view = resolve_view(&ledger, drilldown.as_deref())?;
    Ok(LedgerRequest { ledger, view })
}

fn resolve_view(ledger: &Ledger, drilldown: Option<&str>) -> LedgerResult<ViewState> {
    let Some(label) = drilldown.map(str::trim).filter(|label| !label.is_empty()) else {
        return Ok(ViewState::Overview);
    };
    parse_year_key(label)
        .and_then(|year_start| ledger.index_of(year_start))
        .map(ViewState::Drilldown)
        .ok_or_else(|| LedgerError::UnknownYear(label.to_string()))
}

fn build_ledger_response(ledger: &Ledger, view: ViewState) -> LedgerResponse {
    LedgerResponse {
        years: ledger.rows(),
        summary: ledger.summary(),
        warnings: ledger.warnings().to_vec(),
        drilldown: match view {
            ViewState::Drilldown(index) => ledger.drilldown(index),
            ViewState::Overview => None,
        },
    }
}

fn build_report_request(args: &ReportArgs) -> Result<LedgerRequest, String> {
    if args.totals.is_some() && !args.years.is_empty() {
        return Err("--totals cannot be combined with --year".to_string());
    }

    let ledger = match &args.totals {
        Some(json) => {
            let value = serde_json::from_str::<Value>(json)
                .map_err(|e| format!("--totals must be valid JSON: {e}"))?;
            Ledger::from_json(&value).map_err(|e| format!("--totals: {e}"))?
        }
        None => {
            let mut totals = Vec::with_capacity(args.years.len());
            for entry in &args.years {
                let Some((label, amount)) = entry.split_once('=') else {
                    return Err(format!("--year must look like LABEL=AMOUNT, got {entry:?}"));
                };
                totals.push((label.to_string(), RawAmount::Text(amount.to_string())));
            }
            Ledger::from_totals(totals)
        }
    };

    let view =
        resolve_view(&ledger, args.drilldown.as_deref()).map_err(|e| format!("--drilldown: {e}"))?;
    Ok(LedgerRequest { ledger, view })
}

pub fn run_report(args: &ReportArgs) -> Result<String, String> {
    let request = build_report_request(args)?;
    match args.format {
        ReportFormat::Json => {
            let response = build_ledger_response(&request.ledger, request.view);
            serde_json::to_string_pretty(&response).map_err(|e| format!("failed to encode: {e}"))
        }
        ReportFormat::Text => Ok(render_text(
            &request.view.resolve(&request.ledger),
            request.ledger.warnings(),
        )),
    }
}

fn render_text(view: &ResolvedView, warnings: &[SeriesWarning]) -> String {
    let mut out = String::new();
    match view {
        ResolvedView::Overview { years, summary } => {
            let _ = writeln!(
                out,
                "{:<8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}  {}",
                "Year", "Allowance", "Used", "Own", "Carried", "Consumed", "Remaining", "Status"
            );
            for row in years {
                let carried = sum_amounts(row.carry_forward.iter().map(|c| c.amount));
                let _ = writeln!(
                    out,
                    "{:<8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}  {}",
                    row.label,
                    row.allowance,
                    row.used,
                    row.current_year_portion,
                    carried,
                    row.consumed_by_future,
                    row.remaining,
                    status_name(row),
                );
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "Total contributed:       {:.2}", summary.total_contributed);
            let _ = writeln!(
                out,
                "Total allowance granted: {:.2}",
                summary.total_allowance_granted
            );
            let _ = writeln!(out, "Available now:           {:.2}", summary.total_available);
            let _ = writeln!(out, "Lost:                    {:.2}", summary.total_lost);
        }
        ResolvedView::Drilldown(detail) => {
            let row = &detail.row;
            let _ = writeln!(out, "{} ({})", row.label, status_name(row));
            let _ = writeln!(out, "  Allowance:          {:.2}", row.allowance);
            let _ = writeln!(out, "  Used:               {:.2}", row.used);
            let _ = writeln!(out, "  Own allowance used: {:.2}", row.current_year_portion);
            for claim in &row.carry_forward {
                let _ = writeln!(out, "  Carried from {}: {:.2}", claim.from_label, claim.amount);
            }
            for consumer in &detail.consumed_by {
                let _ = writeln!(out, "  Claimed by {}:   {:.2}", consumer.label, consumer.amount);
            }
            let _ = writeln!(out, "  Remaining:          {:.2}", row.remaining);
        }
    }

    for warning in warnings {
        let _ = writeln!(out, "warning: {}", describe_warning(warning));
    }
    out
}

fn status_name(row: &YearRow) -> &'static str {
    match row.status {
        YearStatus::Current => "current",
        YearStatus::Available => "available",
        YearStatus::Lost => "lost",
        YearStatus::Exhausted => "exhausted",
    }
}

fn describe_warning(warning: &SeriesWarning) -> String {
    match warning {
        SeriesWarning::UnparsableYear { key } => format!("dropped unparsable tax year {key:?}"),
        SeriesWarning::ClampedAmount { label, raw } => {
            format!("{label}: invalid amount {raw:?} treated as 0")
        }
        SeriesWarning::DuplicateYear { label } => {
            format!("{label}: duplicate entry, later value kept")
        }
    }
}
