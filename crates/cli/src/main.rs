use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use stockledger_core::Entity;
use stockledger_infra::reports::{DailyTotal, ProductTotals, StockLevel};
use stockledger_infra::{LedgerError, StockDiscrepancy, StockLedger, StoreConfig};
use stockledger_inventory::{Movement, Product, RecordMovement};

mod cli;

use cli::{Cli, Commands, MovementCommands, ProductCommands, ReportCommands};

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct JsonError<'a> {
    ok: bool,
    error: &'a str,
    message: String,
}

#[derive(Serialize)]
struct ProductDetail {
    product: Product,
    movements: Vec<Movement>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = StoreConfig::from_env()?;
    if let Some(url) = cli.database_url.clone() {
        config = config.with_database_url(url);
    }
    if let Some(policy) = cli.reversal_policy {
        config = config.with_reversal_policy(policy);
    }
    stockledger_observability::init(config.log_format);

    let ledger = match StockLedger::open(&config).await {
        Ok(ledger) => ledger,
        Err(err) => {
            report_error(cli.json, &err)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let outcome = run(&cli, &ledger).await;
    ledger.close().await;

    match outcome {
        Ok(code) => Ok(code),
        Err(err) => match err.downcast_ref::<LedgerError>() {
            Some(ledger_err) => {
                report_error(cli.json, ledger_err)?;
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}

async fn run(cli: &Cli, ledger: &StockLedger) -> anyhow::Result<ExitCode> {
    let json = cli.json;
    tracing::debug!(command = ?cli.command, "dispatching");
    match &cli.command {
        Commands::Product { command } => match command {
            ProductCommands::Add { name } => {
                let product = ledger.create_product(name).await?;
                print_one(json, product, product_row)?;
            }
            ProductCommands::List => {
                let products = ledger.list_products().await?;
                print_out(json, &products, product_row)?;
            }
            ProductCommands::Show { id } => {
                let product = ledger.get_product(*id).await?;
                let movements = ledger.list_movements_for_product(*id).await?;
                print_one(json, ProductDetail { product, movements }, |d| {
                    let mut out = product_row(&d.product);
                    for m in &d.movements {
                        out.push('\n');
                        out.push_str("  ");
                        out.push_str(&movement_row(m));
                    }
                    out
                })?;
            }
            ProductCommands::Delete { id } => {
                ledger.delete_product(*id).await?;
                print_one(json, id, |id| format!("deleted product {id}"))?;
            }
        },
        Commands::Movement { command } => match command {
            MovementCommands::Record {
                product,
                kind,
                quantity,
                date,
            } => {
                let mut cmd = RecordMovement::new(*product, *kind, *quantity);
                if let Some(date) = date {
                    cmd = cmd.on(*date);
                }
                let movement = ledger.record_movement(&cmd).await?;
                print_one(json, movement, movement_row)?;
            }
            MovementCommands::List { product } => {
                let movements = match product {
                    Some(id) => ledger.list_movements_for_product(*id).await?,
                    None => ledger.list_movements().await?,
                };
                print_out(json, &movements, movement_row)?;
            }
            MovementCommands::Reverse { id } => {
                let movement = ledger.reverse_movement(*id).await?;
                print_one(json, movement, |m| format!("reversed {}", movement_row(m)))?;
            }
        },
        Commands::Report { command } => {
            let report = ledger.report().await?;
            match command {
                ReportCommands::Summary => print_one(json, report.by_kind, |t| {
                    format!("inbound {}  outbound {}", t.inbound, t.outbound)
                })?,
                ReportCommands::Products => print_out(json, &report.by_product, totals_row)?,
                ReportCommands::Daily => print_out(json, &report.daily, daily_row)?,
                ReportCommands::Stock => print_out(json, &report.stock, stock_row)?,
            }
        }
        Commands::Audit => {
            let discrepancies = ledger.audit().await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&JsonOut {
                        ok: discrepancies.is_empty(),
                        data: &discrepancies,
                    })?
                );
            } else if discrepancies.is_empty() {
                println!("stock consistent");
            } else {
                for d in &discrepancies {
                    println!("{}", discrepancy_row(d));
                }
            }
            if !discrepancies.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report_error(json: bool, err: &LedgerError) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonError {
                ok: false,
                error: err.code(),
                message: err.to_string(),
            })?
        );
    } else {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

fn print_one<T: Serialize>(json: bool, data: T, row: impl Fn(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

fn product_row(p: &Product) -> String {
    format!(
        "{}  {}  qty={}  min={}",
        p.id(),
        p.name(),
        p.quantity(),
        p.minimum_threshold()
    )
}

fn movement_row(m: &Movement) -> String {
    format!(
        "#{}  {}  product {}  {} {}",
        m.id(),
        m.date(),
        m.product_id(),
        m.kind(),
        m.quantity()
    )
}

fn totals_row(t: &ProductTotals) -> String {
    let on_hand = t
        .on_hand
        .map(|q| q.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {}  in={}  out={}  moved={}  on_hand={}",
        t.product_id, t.name, t.inbound, t.outbound, t.moved, on_hand
    )
}

fn daily_row(d: &DailyTotal) -> String {
    format!("{}  {}  {}", d.date, d.kind, d.quantity)
}

fn stock_row(s: &StockLevel) -> String {
    format!("{}  {}  {}", s.product_id, s.name, s.quantity)
}

fn discrepancy_row(d: &StockDiscrepancy) -> String {
    match d.recorded {
        Some(recorded) => format!(
            "product {}: recorded {} but movements net {}",
            d.product_id, recorded, d.derived
        ),
        None => format!(
            "product {} is missing but movements net {}",
            d.product_id, d.derived
        ),
    }
}
