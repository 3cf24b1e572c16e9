// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use clap::Parser;
use crossbeam::channel;
use csv::{ReaderBuilder, Trim, Writer};
use funds_transfer_rs::logging::init_logging;
use funds_transfer_rs::{
    Account, AccountId, EngineConfig, InMemoryAccountRepository, LoggingNotificationService,
    TransferEngine, TransferRequest,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Funds Transfer - Replay transfers against a set of accounts
///
/// Loads opening balances, applies every transfer, and writes the closing
/// balances to stdout.
#[derive(Parser, Debug)]
#[command(name = "funds-transfer")]
#[command(about = "Applies transfer CSVs to account balances", long_about = None)]
struct Args {
    /// Path to CSV file with opening balances
    ///
    /// Expected format: account_id,balance
    #[arg(value_name = "ACCOUNTS")]
    accounts: PathBuf,

    /// Path to CSV file with transfers
    ///
    /// Expected format: from,to,amount
    #[arg(value_name = "TRANSFERS")]
    transfers: PathBuf,

    /// Maximum wait for each account lock, in milliseconds
    #[arg(long, env = "TRANSFER_LOCK_TIMEOUT_MS", default_value_t = 10_000)]
    lock_timeout_ms: u64,

    /// Number of worker threads applying transfers
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let accounts = match open(&args.accounts).and_then(|f| Ok(load_accounts(f)?)) {
        Ok(accounts) => Arc::new(accounts),
        Err(e) => {
            error!("Error loading accounts '{}': {}", args.accounts.display(), e);
            process::exit(1);
        }
    };

    let transfers = match open(&args.transfers).and_then(|f| Ok(read_transfers(f)?)) {
        Ok(transfers) => transfers,
        Err(e) => {
            error!("Error reading transfers '{}': {}", args.transfers.display(), e);
            process::exit(1);
        }
    };

    let config = EngineConfig::with_lock_timeout(Duration::from_millis(args.lock_timeout_ms));
    let engine = TransferEngine::with_config(
        accounts.clone(),
        Arc::new(LoggingNotificationService),
        config,
    );

    let summary = run_transfers(&engine, transfers, args.threads);
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "transfers processed"
    );

    if let Err(e) = write_accounts(&accounts, std::io::stdout()) {
        error!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn open(path: &Path) -> Result<BufReader<File>, Box<dyn std::error::Error>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Opening balance row.
///
/// Fields: `account_id, balance`
#[derive(Debug, Deserialize)]
struct AccountRecord {
    account_id: String,
    balance: Decimal,
}

/// Transfer row.
///
/// Fields: `from, to, amount`
#[derive(Debug, Deserialize)]
struct TransferRecord {
    from: String,
    to: String,
    amount: Decimal,
}

impl From<TransferRecord> for TransferRequest {
    fn from(record: TransferRecord) -> Self {
        TransferRequest::new(record.from, record.to, record.amount)
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader)
}

/// Loads opening balances into a fresh repository.
///
/// Malformed rows, negative balances, and duplicate ids are logged and
/// skipped.
///
/// # Errors
///
/// Returns a CSV error if the reader fails.
pub fn load_accounts<R: Read>(reader: R) -> Result<InMemoryAccountRepository, csv::Error> {
    let repository = InMemoryAccountRepository::new();

    for result in csv_reader(reader).deserialize::<AccountRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed account row: {}", e);
                continue;
            }
        };
        let created = Account::with_balance(AccountId::from(record.account_id), record.balance)
            .and_then(|account| repository.create_account(account));
        if let Err(e) = created {
            warn!("Skipping account row: {}", e);
        }
    }

    Ok(repository)
}

/// Reads transfer rows in file order.
///
/// Malformed rows are logged and skipped. Field validation is left to the
/// engine.
///
/// # Errors
///
/// Returns a CSV error if the reader fails.
pub fn read_transfers<R: Read>(reader: R) -> Result<Vec<TransferRequest>, csv::Error> {
    let mut transfers = Vec::new();
    for result in csv_reader(reader).deserialize::<TransferRecord>() {
        match result {
            Ok(record) => transfers.push(record.into()),
            Err(e) => warn!("Skipping malformed transfer row: {}", e),
        }
    }
    Ok(transfers)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub rejected: usize,
}

/// Applies transfers on `threads` workers pulling from a shared queue.
///
/// With one worker, transfers are applied in file order.
pub fn run_transfers(
    engine: &TransferEngine,
    transfers: Vec<TransferRequest>,
    threads: usize,
) -> Summary {
    let (sender, receiver) = channel::unbounded();
    for request in transfers {
        // Receiver is alive in this scope.
        let _ = sender.send(request);
    }
    drop(sender);

    let applied = AtomicUsize::new(0);
    let rejected = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..threads.max(1) {
            let receiver = receiver.clone();
            let (applied, rejected) = (&applied, &rejected);
            scope.spawn(move || {
                for request in receiver.iter() {
                    match engine.transfer(&request) {
                        Ok(()) => {
                            applied.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            debug!(
                                from = %request.account_from_id,
                                to = %request.account_to_id,
                                code = e.code(),
                                "Skipping transfer: {}",
                                e
                            );
                            rejected.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    Summary {
        applied: applied.into_inner(),
        rejected: rejected.into_inner(),
    }
}

/// Writes closing balances, sorted by account id.
///
/// # CSV Format
///
/// Columns: `account_id, balance`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_accounts<W: Write>(
    accounts: &InMemoryAccountRepository,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for account in accounts.snapshot() {
        wtr.serialize(&account)?;
    }
    wtr.flush()?;
    Ok(())
}
