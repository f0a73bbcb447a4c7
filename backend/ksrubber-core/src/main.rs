// src/main.rs

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::io::{self, Write};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ksrubber_core::calendar::{DayStatus, MonthPeriod};
use ksrubber_core::confirm::PendingDeletion;
use ksrubber_core::coverage::{format_amount, format_currency};
use ksrubber_core::dashboard::{DataSource, MonthlyDashboard};
use ksrubber_core::die_catalog::{paginate, DieCatalog};
use ksrubber_core::ksrubber_data::{DieUpdate, Expenses, NewDie};
use ksrubber_core::production_flow::{submit_success_message, ProductionComputeFlow, SubmitOutcome};
use ksrubber_core::{KsRubberClient, KsRubberConfig, ProductionApi};

/// Production and income dashboard for the KS Rubber workshop.
#[derive(Parser)]
#[command(name = "ksrubber", version = env!("CARGO_PKG_VERSION"), long_about = None)]
struct Cli {
    /// Override KSRUBBER_API_BASE_URL
    #[arg(long = "api-base-url", global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List dies, sorted by company and name
    Dies {
        /// Only dies whose name contains this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Register a new die
    AddDie {
        name: String,
        #[arg(long)]
        company: String,
        #[arg(long, default_value = "")]
        materials: String,
        #[arg(long, default_value_t = 1)]
        cavity: u32,
        #[arg(long, default_value_t = Decimal::ZERO)]
        weight: Decimal,
        /// Units produced per hour
        #[arg(long = "per-hour")]
        per_hour: Decimal,
        #[arg(long)]
        price: Decimal,
    },

    /// Change fields of an existing die
    EditDie {
        die_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        materials: Option<String>,
        #[arg(long)]
        cavity: Option<u32>,
        #[arg(long)]
        weight: Option<Decimal>,
        #[arg(long = "per-hour")]
        per_hour: Option<Decimal>,
        #[arg(long)]
        price: Option<Decimal>,
    },

    /// Delete a die from the catalog
    DeleteDie {
        die_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Day-by-day production calendar for a month
    Calendar {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Year alone selects its January
        #[arg(long, conflicts_with = "month")]
        year: Option<i32>,
        /// Only days using a die whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Overtime, pay and income coverage for a month
    Summary {
        #[arg(long)]
        month: Option<String>,
        #[arg(long, conflicts_with = "month")]
        year: Option<i32>,
        #[arg(long)]
        search: Option<String>,
    },

    /// Preview a day's production, optionally submitting it
    Compute {
        /// Production date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// DIE_ID=COUNT, repeatable
        #[arg(long = "die", value_parser = parse_die_count, required = true)]
        dies: Vec<(String, u64)>,
        /// Treat the day as a holiday (default on Sundays)
        #[arg(long, conflicts_with = "workday")]
        holiday: bool,
        /// Treat the day as a working day
        #[arg(long)]
        workday: bool,
        #[arg(long)]
        tea: Option<Decimal>,
        #[arg(long)]
        water: Option<Decimal>,
        /// Persist the previewed production
        #[arg(long)]
        submit: bool,
    },

    /// Record an empty day as leave
    MarkLeave { date: NaiveDate },

    /// Delete a daily production record by its serial number
    DeleteProduction {
        sno: String,
        #[arg(long)]
        yes: bool,
    },

    /// Set the monthly base income
    SetIncome { amount: Decimal },

    /// Set this month's tea and water expenses
    SetExpenses {
        #[arg(long)]
        tea: Decimal,
        #[arg(long)]
        water: Decimal,
    },
}

fn parse_die_count(raw: &str) -> Result<(String, u64), String> {
    let (die_id, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected DIE_ID=COUNT, got '{}'", raw))?;
    let die_id = die_id.trim();
    if die_id.is_empty() {
        return Err(format!("missing die id in '{}'", raw));
    }
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid count in '{}': {}", raw, e))?;
    Ok((die_id.to_string(), count))
}

fn ask_confirmation(prompt: &str) -> bool {
    println!("{}", prompt);
    print!("Confirm [y/N]: ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_ok() {
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = KsRubberConfig::from_env().context("Failed to load KSRUBBER_* configuration")?;
    if let Some(base_url) = cli.api_base_url {
        config.api_base_url = base_url;
    }
    let client = KsRubberClient::new(config.client_config()).context("Failed to create API client")?;
    info!("Using backend at {}", client.base_url());
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Dies { search, page } => list_dies(&client, search.as_deref(), page, config.dies_per_page).await,
        Commands::AddDie {
            name,
            company,
            materials,
            cavity,
            weight,
            per_hour,
            price,
        } => {
            let mut catalog = DieCatalog::default();
            let new_die = NewDie {
                die_name: name,
                company_name: company,
                materials,
                cavity,
                weight,
                production_per_hour: per_hour,
                price,
            };
            let die_id = catalog.add_die(&client, new_die).await.context("Adding die failed")?;
            println!("Added die {}", die_id);
            Ok(())
        }
        Commands::EditDie {
            die_id,
            name,
            company,
            materials,
            cavity,
            weight,
            per_hour,
            price,
        } => {
            let update = DieUpdate {
                die_name: name,
                company_name: company,
                materials,
                cavity,
                weight,
                production_per_hour: per_hour,
                price,
            };
            if update == DieUpdate::default() {
                bail!("Nothing to change; pass at least one field");
            }
            let mut catalog = DieCatalog::default();
            catalog.refresh(&client).await.context("Loading dies failed")?;
            if catalog.get(&die_id).is_none() {
                bail!("Unknown die '{}'", die_id);
            }
            let saved = catalog
                .update_die(&client, &die_id, &update)
                .await
                .context("Updating die failed")?;
            println!("Updated {} ({})", saved.die_name, saved.die_id);
            Ok(())
        }
        Commands::DeleteDie { die_id, yes } => {
            let mut dashboard = MonthlyDashboard::new(today);
            dashboard.refresh_dies(&client).await;
            let pending = dashboard
                .request_die_deletion(&die_id)
                .with_context(|| format!("Unknown die '{}'", die_id))?;
            run_deletion(&mut dashboard, &client, pending, yes).await
        }
        Commands::Calendar { month, year, search } => {
            let period = MonthPeriod::select(month.as_deref(), year, today)?;
            let mut dashboard = MonthlyDashboard::for_period(period, today);
            dashboard.load(&client).await;
            report_failures(&dashboard);
            print_calendar(&dashboard, search.as_deref());
            Ok(())
        }
        Commands::Summary { month, year, search } => {
            let period = MonthPeriod::select(month.as_deref(), year, today)?;
            let mut dashboard = MonthlyDashboard::for_period(period, today);
            dashboard.load(&client).await;
            report_failures(&dashboard);
            print_summary(&dashboard, search.as_deref());
            Ok(())
        }
        Commands::Compute {
            date,
            dies,
            holiday,
            workday,
            tea,
            water,
            submit,
        } => {
            let mut flow = ProductionComputeFlow::new(date.unwrap_or(today));
            flow.select_dies(dies.iter().map(|(id, _)| id.clone()));
            for (die_id, count) in &dies {
                flow.set_count(die_id, *count);
            }
            if holiday {
                flow.set_holiday(true);
            } else if workday {
                flow.set_holiday(false);
            }
            flow.set_tea(tea.unwrap_or_default());
            flow.set_water(water.unwrap_or_default());
            compute_production(&client, &mut flow, submit, &config, today).await
        }
        Commands::MarkLeave { date } => {
            let mut dashboard = MonthlyDashboard::for_period(MonthPeriod::containing(date), today);
            dashboard.load(&client).await;
            if let Some(failure) = dashboard.failure(DataSource::Productions) {
                bail!("Cannot mark {} as leave, {} failed to load: {}", date, failure.source, failure.message);
            }
            let mut marking = dashboard
                .open_empty_day(date)
                .with_context(|| format!("{} is not an empty day of {}", date, dashboard.period()))?;
            marking.interact()?;
            dashboard.mark_leave(&mut marking, &client).await?;
            println!("{} marked as leave", date);
            Ok(())
        }
        Commands::DeleteProduction { sno, yes } => {
            let mut dashboard = MonthlyDashboard::new(today);
            dashboard.refresh_records(&client).await;
            let pending = dashboard
                .request_production_deletion(&sno)
                .with_context(|| format!("No production record with sno '{}'", sno))?;
            run_deletion(&mut dashboard, &client, pending, yes).await
        }
        Commands::SetIncome { amount } => {
            let mut dashboard = MonthlyDashboard::new(today);
            dashboard.load(&client).await;
            let income = &mut dashboard.settings_mut().income;
            income.begin_edit()?;
            income.update_draft(amount)?;
            let saved = dashboard.save_base_income(&client).await?;
            println!("Base income set to {}", format_currency(saved));
            Ok(())
        }
        Commands::SetExpenses { tea, water } => {
            let mut dashboard = MonthlyDashboard::new(today);
            dashboard.load(&client).await;
            let expenses = &mut dashboard.settings_mut().expenses;
            expenses.begin_edit()?;
            expenses.update_draft(Expenses::new(tea, water))?;
            let saved = dashboard.save_expenses(&client).await?;
            println!(
                "Expenses set: tea {}, water {}",
                format_currency(saved.tea),
                format_currency(saved.water)
            );
            Ok(())
        }
    }
}

async fn list_dies(api: &dyn ProductionApi, search: Option<&str>, page: usize, per_page: usize) -> Result<()> {
    let mut catalog = DieCatalog::default();
    catalog.refresh(api).await.context("Loading dies failed")?;

    let dies = catalog.search(search.unwrap_or(""));
    let page = paginate(&dies, page, per_page);

    println!(
        "{:<14} {:<24} {:<18} {:<10} {:>6} {:>8} {:>8} {:>10}",
        "ID", "Name", "Company", "Material", "Cavity", "Weight", "Per hr", "Price"
    );
    for die in page.items {
        println!(
            "{:<14} {:<24} {:<18} {:<10} {:>6} {:>8} {:>8} {:>10}",
            die.die_id,
            die.die_name,
            die.company_name,
            die.materials,
            die.cavity,
            format_amount(die.weight),
            format_amount(die.production_per_hour),
            format_amount(die.price)
        );
    }
    println!("Page {} of {} ({} dies)", page.page, page.total_pages, page.total_items);
    Ok(())
}

fn report_failures(dashboard: &MonthlyDashboard) {
    for failure in dashboard.failures() {
        warn!("Could not load {}: {}", failure.source, failure.message);
    }
}

fn print_calendar(dashboard: &MonthlyDashboard, search: Option<&str>) {
    println!("Production for {}", dashboard.period());
    for view in dashboard.day_views(search) {
        let date = view.day.date();
        let (overtime, pay) = match (view.status, view.day.record()) {
            (DayStatus::Production { .. }, Some(record)) => {
                (format_amount(record.total_overtime()), format_currency(record.monthly_pay))
            }
            _ => (String::new(), String::new()),
        };
        let sno = view.day.record().map(|r| r.sno.as_str()).unwrap_or("");
        println!(
            "{} {} {:<16} {:>6} {:>10} {:>14}  {}",
            date,
            date.format("%a"),
            view.status.label(),
            sno,
            overtime,
            pay,
            view.die_names.join(", ")
        );
    }
}

fn print_summary(dashboard: &MonthlyDashboard, search: Option<&str>) {
    let summary = dashboard.summary(search);
    let coverage = &summary.coverage;

    println!("Summary for {}", dashboard.period());
    println!("  Days recorded:         {}", summary.totals.recorded_days);
    println!("  Days without data:     {}", summary.totals.missing_days);
    println!("  Leave days:            {}", summary.totals.leave_days);
    println!("  Overtime hours:        {}", format_amount(summary.totals.total_overtime_hours));
    println!("  Overtime pay:          {}", format_currency(summary.totals.total_pay));
    println!("  Base income:           {}", format_currency(summary.base_income));
    println!("  Without-leave salary:  {}", format_currency(coverage.without_leave_salary));
    println!("  Month income:          {}", format_currency(summary.month_income));
    if coverage.is_shortfall() {
        println!("  Shortfall:             {}", format_currency(coverage.shortfall));
    } else {
        println!("  Surplus:               {}", format_currency(-coverage.shortfall));
    }
    println!("  Covered:               {}%", format_amount(coverage.percent_covered));
    println!(
        "  Expenses:              tea {}, water {}",
        format_currency(summary.expenses.tea),
        format_currency(summary.expenses.water)
    );
    println!("  Net total:             {}", format_currency(summary.net_total()));
}

async fn compute_production(
    api: &dyn ProductionApi,
    flow: &mut ProductionComputeFlow,
    submit: bool,
    config: &KsRubberConfig,
    today: NaiveDate,
) -> Result<()> {
    let mut catalog = DieCatalog::default();
    if let Err(e) = catalog.refresh(api).await {
        warn!("Die names unavailable: {}", e);
    }

    let preview = flow.compute(api).await?;
    let form = flow.form();
    println!(
        "Preview for {} ({})",
        form.date,
        if form.holiday { "holiday" } else { "working day" }
    );
    println!(
        "{:<14} {:<24} {:>6} {:>10} {:>10} {:>10} {:>12}",
        "ID", "Name", "Cavity", "Hours", "Overtime", "Trimmed", "Price"
    );
    for row in preview.rows(&catalog) {
        println!(
            "{:<14} {:<24} {:>6} {:>10} {:>10} {:>10} {:>12}",
            row.die_id,
            row.die_name,
            row.cavity.map(|c| c.to_string()).unwrap_or_default(),
            format_amount(row.overall_time),
            format_amount(row.overtime),
            format_amount(row.deleted_hours),
            format_currency(row.price)
        );
    }
    println!("Overtime pay: {}", format_currency(preview.overtime_pay()));
    if preview.income_fallback {
        println!("Month income: {} (unavailable)", format_currency(preview.month_income));
    } else {
        println!("Month income: {}", format_currency(preview.month_income));
    }
    println!("Net total:    {}", format_currency(preview.net_total()));

    if !submit {
        return Ok(());
    }

    match flow.submit_and_reset(api, config.banner_window(), today).await {
        SubmitOutcome::Accepted(receipt) => {
            println!("{}", submit_success_message(&receipt));
            Ok(())
        }
        SubmitOutcome::Failed(message) => bail!(message),
        SubmitOutcome::Skipped => bail!("Nothing to submit"),
    }
}

async fn run_deletion(
    dashboard: &mut MonthlyDashboard,
    api: &dyn ProductionApi,
    pending: PendingDeletion,
    yes: bool,
) -> Result<()> {
    if !yes && !ask_confirmation(&pending.prompt()) {
        let target = pending.cancel();
        println!("Kept {}", target);
        return Ok(());
    }

    let confirmed = pending.confirm();
    let target = confirmed.target().clone();
    dashboard
        .apply_deletion(confirmed, api)
        .await
        .with_context(|| format!("Deleting {} failed", target))?;
    println!("Deleted {}", target);
    Ok(())
}
