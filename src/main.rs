mod cli;
mod error;
mod logging;
mod prompt;

use crate::cli::{Command, EditCommand, NamingArg, Opts};
use crate::error::{ErrorKind, Result};
use crate::prompt::Prompt;
use bannr_config::Settings;
use bannr_ledger::Ledger;
use bannr_library::{Context, EditOutcome, NamingPolicy, RunSummary};
use bannr_remote::{GdownSync, SulClient};
use bannr_storage::backend::LocalBackend;
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    let settings = Settings::load(opts.config.as_deref())
        .and_then(Settings::validate)
        .or_raise(|| ErrorKind::Settings);
    let log_file = match &settings {
        Ok(settings) if settings.enable_logging => Some(settings.log_path()),
        _ => None,
    };
    logging::init(opts.verbosity(), log_file.as_deref());

    let result = match settings {
        Ok(settings) => execute(opts.command, &settings).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("{e:?}");
            ExitCode::FAILURE
        },
    }
}

/// Build the pipeline context from settings.
fn context(settings: &Settings, remote: bool) -> Result<Context> {
    let import = LocalBackend::new("import", settings.import_dir()).or_raise(|| ErrorKind::Setup("import folder"))?;
    let export = LocalBackend::new("export", settings.export_dir()).or_raise(|| ErrorKind::Setup("export folder"))?;
    let host = SulClient::new(&settings.upload_endpoint, settings.upload_timeout())
        .or_raise(|| ErrorKind::Setup("upload client"))?;
    if settings.uploads_active() {
        tracing::debug!(endpoint = host.endpoint(), "uploads enabled");
    } else {
        tracing::info!("uploads disabled or no API key configured");
    }
    let mut ctx = Context::new(Arc::new(import), Arc::new(export), Ledger::new(settings.ledger_path()))
        .with_host(Arc::new(host), settings.credential().map(str::to_string))
        .with_uploads_enabled(settings.uploads_active());
    if remote {
        let sync = GdownSync::discover().or_raise(|| ErrorKind::Setup("remote folder sync"))?;
        ctx = ctx.with_sync(Arc::new(sync), settings.drive_folder().map(str::to_string));
    }
    Ok(ctx)
}

async fn execute(command: Command, settings: &Settings) -> Result<()> {
    let remote = matches!(&command, Command::Run { source: cli::SourceArg::Remote, .. });
    let ctx = context(settings, remote)?;
    match command {
        Command::Run {
            source,
            naming,
            base,
            no_upload,
        } => {
            let ctx = if no_upload { ctx.with_uploads_enabled(false) } else { ctx };
            let mut policy = match naming {
                NamingArg::Sequential => NamingPolicy::sequential(base.unwrap_or_default()),
                NamingArg::Interactive => NamingPolicy::interactive(Prompt::terminal()),
            };
            let summary = bannr_library::run(&ctx, source.into(), &mut policy).await.or_raise(|| ErrorKind::Command)?;
            print_run(&summary);
        },
        Command::RenameAll { base } => {
            let summary = bannr_library::bulk_rename_existing(&ctx, &base).await.or_raise(|| ErrorKind::Command)?;
            println!("{summary:#?}");
        },
        Command::RenameSelected { base, originals } => {
            let summary =
                bannr_library::bulk_rename_selected(&ctx, &originals, &base).await.or_raise(|| ErrorKind::Command)?;
            println!("{summary:#?}");
        },
        Command::UploadAll => {
            let summary = bannr_library::bulk_upload_existing(&ctx).await.or_raise(|| ErrorKind::Command)?;
            println!(
                "{} without URL, {} missing, {} uploaded, {} failed",
                summary.candidates, summary.missing, summary.tally.succeeded, summary.tally.failed
            );
        },
        Command::Delete { originals, files } => {
            let summary = bannr_library::delete_rows(&ctx, &originals, files).await.or_raise(|| ErrorKind::Command)?;
            println!("{summary:#?}");
        },
        Command::DeleteExports { originals } => {
            let summary = bannr_library::delete_export_files(&ctx, &originals).await.or_raise(|| ErrorKind::Command)?;
            println!("{summary:#?}");
        },
        Command::Edit(edit) => {
            let outcome = match edit {
                EditCommand::Rename {
                    original,
                    new_base,
                    upload,
                } => bannr_library::rename_entry(&ctx, &original, &new_base, upload).await,
                EditCommand::Upload { original } => bannr_library::reupload_entry(&ctx, &original).await,
                EditCommand::Url { original, url } => {
                    bannr_library::set_url(&ctx, &original, url.as_deref().unwrap_or_default()).await
                },
            };
            print_edit(&outcome.or_raise(|| ErrorKind::Command)?);
        },
        Command::Show => {
            let table = ctx.ledger.read_all().await.or_raise(|| ErrorKind::Command)?;
            println!("{}", table.columns.join(" | "));
            for row in &table.rows {
                println!("{} | {} | {} | {}", row.timestamp, row.original, row.renamed, row.url);
            }
            if table.malformed > 0 {
                println!("({} malformed rows not shown)", table.malformed);
            }
        },
        Command::Stats => {
            let stats = bannr_library::stats(&ctx).await.or_raise(|| ErrorKind::Command)?;
            println!("Rows:            {}", stats.rows);
            println!("Import present:  {}", stats.import_found);
            println!("Export present:  {}", stats.export_found);
            println!("With URL:        {}", stats.with_url);
        },
        Command::Check => {
            let report = bannr_library::check(&ctx).await.or_raise(|| ErrorKind::Command)?;
            for problem in &report.problems {
                println!("{problem}");
            }
            let found = report.problems.len();
            println!("{} rows, {found} problems, {} fixable with `repair`", report.rows, report.fixable);
        },
        Command::Repair => {
            let summary = bannr_library::repair(&ctx).await.or_raise(|| ErrorKind::Command)?;
            println!("Names filled:    {}", summary.renamed_filled);
            println!("Exports copied:  {}", summary.exports_restored);
            println!("Imports copied:  {}", summary.imports_restored);
            println!("Errors:          {}", summary.errors);
            match summary.uploads {
                Some(tally) => println!("Uploads:         {} succeeded, {} failed", tally.succeeded, tally.failed),
                None => println!("Uploads:         none"),
            }
        },
    }
    Ok(())
}

fn print_run(summary: &RunSummary) {
    println!("Discovered:      {}", summary.discovered);
    println!("Already known:   {}", summary.already_known);
    println!("Processed:       {}", summary.processed);
    println!("Skipped:         {}", summary.skipped);
    println!("Errors:          {}", summary.errors);
    match summary.uploads {
        Some(tally) => println!("Uploads:         {} succeeded, {} failed", tally.succeeded, tally.failed),
        None => println!("Uploads:         skipped"),
    }
}

fn print_edit(outcome: &EditOutcome) {
    let row = &outcome.row;
    println!("{} -> {} ({})", row.original, row.renamed, if row.url.is_empty() { "no URL" } else { row.url.as_str() });
    if let Some(Err(reason)) = outcome.upload.as_ref().map(|upload| &upload.result) {
        println!("Upload failed: {reason}");
    }
}
