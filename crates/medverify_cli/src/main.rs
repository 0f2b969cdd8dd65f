use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use batch_models::{BatchMetaInput, KycStatus, TransferInput};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clock::SystemClock;
use record_store::FileStorage;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use verify_engine::{EngineConfig, RegisterBatch, VerificationOutcome, VerificationService};

mod render;

#[derive(Parser)]
#[command(name = "medverify", about = "Pharmaceutical batch verification", version)]
struct Cli {
    /// Output JSON instead of human text
    #[arg(long, global = true)]
    json: bool,

    /// State file (overrides MEDVERIFY_STATE_FILE)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Print Prometheus counters to stderr after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a batch, creating the manufacturer if its name is new
    Register {
        #[arg(long)]
        manufacturer: String,
        /// KYC status for a newly created manufacturer
        #[arg(long, default_value = "approved")]
        kyc: KycStatus,
        #[arg(long)]
        product: String,
        /// Defaults to the generated batch id
        #[arg(long)]
        batch_no: Option<String>,
        /// Manufacture date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        mfg: Option<NaiveDate>,
        /// Expiry date (YYYY-MM-DD), defaults to two years from today
        #[arg(long)]
        expiry: Option<NaiveDate>,
        /// Certificate of analysis reference
        #[arg(long)]
        coa: Option<String>,
    },

    /// Log a distributor transfer
    Transfer {
        #[arg(long)]
        distributor: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: String,
        #[arg(long)]
        batch: String,
        /// Bill of lading
        #[arg(long)]
        bol: Option<String>,
    },

    /// Pharmacy receipt confirmation with the scratch code
    Receive {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        code: String,
    },

    /// End-user verification with the scratch code
    Verify {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        code: String,
    },

    /// USSD short-code lookup, e.g. '*345*BID_xxx#'
    Ussd { input: String },

    /// SMS lookup by batch id
    Sms {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        phone: String,
    },

    /// Upload a lab report for a batch
    Lab {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        lab: String,
        #[arg(long)]
        summary: String,
    },

    /// Open an incident manually
    Incident {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Flip a manufacturer between approved and pending
    ToggleKyc {
        #[arg(long)]
        manufacturer: String,
    },

    /// Dashboard counters
    Kpis,

    /// List stored records
    List {
        #[arg(value_enum)]
        what: ListKind,
    },

    /// Write the verification QR code for a batch as SVG
    Qr {
        #[arg(long)]
        batch: String,
        /// Output file, defaults to <batch>.svg
        #[arg(long)]
        out: Option<PathBuf>,
        /// Verification page (overrides MEDVERIFY_VERIFY_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Dump the whole document as JSON
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace the whole document from a JSON file
    Import {
        #[arg(long)]
        file: PathBuf,
    },

    /// Export incidents or anchors as CSV
    ExportCsv {
        #[arg(value_enum)]
        kind: CsvKind,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Discard all records and reseed the demo data
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    Batches,
    Transfers,
    Labs,
    Incidents,
    Manufacturers,
}

#[derive(Clone, Copy, ValueEnum)]
enum CsvKind {
    Incidents,
    Anchors,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit codes: 0 success or AUTHENTIC, 1 error, 2 SUSPECT outcome.
fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    // Reset must not read the existing file: it may be the reason for resetting.
    let reseed = matches!(cli.command, Commands::Reset { yes: true });
    let result = open_service(cli.state.clone(), reseed).and_then(|svc| run(svc, &cli));

    if cli.metrics {
        eprint!("{}", observability::export_metrics());
    }

    match result {
        Ok(code) => code,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::from(1)
        }
    }
}

fn open_service(state: Option<PathBuf>, reseed: bool) -> Result<VerificationService, String> {
    let storage = match state {
        Some(path) => FileStorage::new(path),
        None => FileStorage::from_env(),
    };
    debug!(path = %storage.path().display(), reseed, "opening state file");
    let config = EngineConfig::from_env().map_err(|e| e.to_string())?;
    let clock = Arc::new(SystemClock);
    if reseed {
        VerificationService::open_reset(Box::new(storage), clock, config)
    } else {
        VerificationService::open(Box::new(storage), clock, config)
    }
    .map_err(|e| e.to_string())
}

fn run(mut svc: VerificationService, cli: &Cli) -> Result<ExitCode, String> {
    let json = cli.json;
    match &cli.command {
        Commands::Register {
            manufacturer,
            kyc,
            product,
            batch_no,
            mfg,
            expiry,
            coa,
        } => {
            let registered = svc
                .register_batch(RegisterBatch {
                    manufacturer_name: manufacturer.clone(),
                    kyc: *kyc,
                    meta: BatchMetaInput {
                        product: product.clone(),
                        batch_no: batch_no.clone(),
                        mfg: *mfg,
                        expiry: *expiry,
                        coa: coa.clone(),
                    },
                })
                .map_err(|e| e.to_string())?;
            emit(json, &registered, render::registered)
        }
        Commands::Transfer {
            distributor,
            from,
            to,
            batch,
            bol,
        } => {
            let transfer = svc
                .log_transfer(TransferInput {
                    distributor: distributor.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    batch_id: batch.clone(),
                    bol: bol.clone(),
                })
                .map_err(|e| e.to_string())?;
            emit(json, &transfer, |t| {
                format!("transfer {} logged: {} -> {}", t.id, t.batch_id, t.to)
            })
        }
        Commands::Receive { batch, code } => {
            let outcome = svc
                .pharmacy_receive(batch, code)
                .map_err(|e| e.to_string())?;
            emit(json, &outcome, render::outcome)?;
            Ok(outcome_code(outcome))
        }
        Commands::Verify { batch, code } => {
            let outcome = svc.verify(batch, code).map_err(|e| e.to_string())?;
            emit(json, &outcome, render::outcome)?;
            Ok(outcome_code(outcome))
        }
        Commands::Ussd { input } => {
            let outcome = svc.ussd_query(input).map_err(|e| e.to_string())?;
            emit(json, &outcome, |o| o.message.clone())?;
            Ok(status_code(outcome.status == batch_models::ScanResult::Authentic))
        }
        Commands::Sms { batch, phone } => {
            let outcome = svc.sms_query(batch, phone).map_err(|e| e.to_string())?;
            emit(json, &outcome, |o| o.message.clone())?;
            Ok(status_code(outcome.status == batch_models::ScanResult::Authentic))
        }
        Commands::Lab {
            batch,
            lab,
            summary,
        } => {
            let report = svc
                .upload_lab_report(batch, lab, summary)
                .map_err(|e| e.to_string())?;
            emit(json, &report, |r| {
                format!("lab report {} hash={} tx={}", r.id, r.hash, r.anchor.tx)
            })
        }
        Commands::Incident {
            batch,
            reason,
            notes,
        } => {
            let incident = svc
                .create_incident(batch, reason, notes)
                .map_err(|e| e.to_string())?;
            emit(json, &incident, |i| {
                format!("incident {} opened for {} ({})", i.id, i.batch_id, i.reason)
            })
        }
        Commands::ToggleKyc { manufacturer } => {
            let status = svc.toggle_kyc(manufacturer).map_err(|e| e.to_string())?;
            emit(
                json,
                &serde_json::json!({ "manufacturerId": manufacturer, "kyc": status }),
                |_| format!("{} is now {}", manufacturer, status.as_str()),
            )
        }
        Commands::Kpis => emit(json, &svc.kpis(), render::kpis),
        Commands::List { what } => list(&svc, json, *what),
        Commands::Qr {
            batch,
            out,
            base_url,
        } => {
            let link = match base_url {
                Some(base) => svc.verify_link_at(base, batch),
                None => svc.verify_link(batch),
            }
            .map_err(|e| e.to_string())?;
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{batch}.svg")));
            fs::write(&path, &link.svg)
                .map_err(|e| format!("write {}: {}", path.display(), e))?;
            emit(
                json,
                &serde_json::json!({ "url": link.url, "svg": path.display().to_string() }),
                |_| format!("{} -> {}", link.url, path.display()),
            )
        }
        Commands::Export { out } => {
            let text = svc.export_document().map_err(|e| e.to_string())?;
            write_or_print(out.as_ref(), &text)
        }
        Commands::Import { file } => {
            let text = fs::read_to_string(file)
                .map_err(|e| format!("read {}: {}", file.display(), e))?;
            svc.import_document(&text).map_err(|e| e.to_string())?;
            let kpis = svc.kpis();
            emit(json, &kpis, |k| {
                format!(
                    "imported {} batches from {} manufacturers",
                    k.batches, k.manufacturers
                )
            })
        }
        Commands::ExportCsv { kind, out } => {
            let csv = match kind {
                CsvKind::Incidents => svc.incidents_csv(),
                CsvKind::Anchors => svc.anchors_csv(),
            };
            write_or_print(out.as_ref(), &csv)
        }
        Commands::Reset { yes } => {
            if !yes {
                return Err("reset discards every record; pass --yes to confirm".to_string());
            }
            // Already reseeded when the service was opened.
            println!("store reset to demo data");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn outcome_code(outcome: VerificationOutcome) -> ExitCode {
    ExitCode::from(outcome_status(outcome))
}

fn outcome_status(outcome: VerificationOutcome) -> u8 {
    match outcome.into_result() {
        Ok(_) => 0,
        Err(e) => {
            debug!(error = %e, "verification not authentic");
            2
        }
    }
}

fn status_code(authentic: bool) -> ExitCode {
    if authentic {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn emit<T, F>(json: bool, value: &T, human: F) -> Result<ExitCode, String>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    if json {
        let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        println!("{}", human(value));
    }
    Ok(ExitCode::SUCCESS)
}

fn write_or_print(out: Option<&PathBuf>, text: &str) -> Result<ExitCode, String> {
    match out {
        Some(path) => {
            fs::write(path, text).map_err(|e| format!("write {}: {}", path.display(), e))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(ExitCode::SUCCESS)
}

fn list(svc: &VerificationService, json: bool, what: ListKind) -> Result<ExitCode, String> {
    let doc = svc.document();
    match what {
        ListKind::Batches => {
            let batches: Vec<_> = doc.batches.values().collect();
            emit(json, &batches, |b| render::batches(b, doc))
        }
        ListKind::Transfers => emit(json, &svc.recent_transfers(), |t| render::transfers(t)),
        ListKind::Labs => {
            let reports: Vec<_> = svc
                .lab_reports()
                .into_iter()
                .map(|(b, r)| serde_json::json!({ "batchId": b.id, "report": r }))
                .collect();
            emit(json, &reports, |_| render::lab_reports(&svc.lab_reports()))
        }
        ListKind::Incidents => emit(json, &doc.incidents, |i| render::incidents(i)),
        ListKind::Manufacturers => {
            let manufacturers: Vec<_> = doc.manufacturers.values().collect();
            emit(json, &manufacturers, |m| render::manufacturers(m))
        }
    }
}
