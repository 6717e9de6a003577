// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 The verba-ledger authors
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
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write as IoWrite};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use verba_ledger::{
    AllowAll, CardId, CategoryId, CategoryRegistry, Coordinator, CoordinatorConfig, Decision,
    LedgerError, MemoryCashLedger, MemoryProjectBudget, ProjectId, UserId,
};

/// Cost-Center Ledger - Replay operation CSV files
///
/// Reads ledger operations from a CSV file, applies them against an
/// in-memory coordinator, and outputs card states to stdout.
#[derive(Parser, Debug)]
#[command(name = "verba-ledger")]
#[command(about = "A cost-center ledger that replays operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,card,project,amount,category,title,client,note
    /// Example: cargo run -- operations.csv > cards.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the cash ledger journal (inflows/outflows) as CSV to this file
    #[arg(long, value_name = "FILE")]
    journal: Option<PathBuf>,

    /// Register expenses as pending instead of auto-approved
    #[arg(long)]
    manual_expense_approval: bool,
}

fn main() {
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let workspace =
        match process_operations(BufReader::new(file), !args.manual_expense_approval) {
            Ok(workspace) => workspace,
            Err(e) => {
                eprintln!("Error processing operations: {}", e);
                process::exit(1);
            }
        };

    if let Err(e) = write_cards(&workspace.coordinator, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }

    if let Some(path) = args.journal {
        let journal = match File::create(&path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error creating journal file '{}': {}", path.display(), e);
                process::exit(1);
            }
        };
        if let Err(e) = write_journal(&workspace.cash, journal) {
            eprintln!("Error writing journal: {}", e);
            process::exit(1);
        }
    }
}

/// Coordinator plus the in-memory collaborators it was wired to.
pub struct Workspace {
    pub coordinator: Coordinator,
    pub cash: Arc<MemoryCashLedger>,
    pub budget: Arc<MemoryProjectBudget>,
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, card, project, amount, category, title, client, note`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    card: Option<u32>,
    project: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    category: Option<u16>,
    title: Option<String>,
    client: Option<String>,
    note: Option<String>,
}

#[derive(Debug)]
enum Operation {
    Create {
        project: ProjectId,
        budget_total: Decimal,
        title: String,
        client: String,
    },
    Transfer {
        card: CardId,
        amount: Decimal,
    },
    Expense {
        card: CardId,
        category: CategoryId,
        amount: Decimal,
        description: String,
    },
    Request {
        card: CardId,
        amount: Decimal,
        justification: String,
    },
    ApproveRequest {
        card: CardId,
    },
    RejectRequest {
        card: CardId,
    },
    Finalize {
        card: CardId,
    },
    Approve {
        card: CardId,
    },
    Reject {
        card: CardId,
        reason: String,
    },
    Cancel {
        card: CardId,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown ops or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        let card = self.card.map(CardId);
        match self.op.to_lowercase().as_str() {
            "create" => Some(Operation::Create {
                project: ProjectId(self.project?),
                budget_total: self.amount?,
                title: self.title?,
                client: self.client.unwrap_or_default(),
            }),
            "transfer" => Some(Operation::Transfer {
                card: card?,
                amount: self.amount?,
            }),
            "expense" => Some(Operation::Expense {
                card: card?,
                category: CategoryId(self.category?),
                amount: self.amount?,
                description: self.note.unwrap_or_else(|| "unspecified".to_owned()),
            }),
            "request" => Some(Operation::Request {
                card: card?,
                amount: self.amount?,
                justification: self.note.unwrap_or_else(|| "unspecified".to_owned()),
            }),
            "approve_request" => Some(Operation::ApproveRequest { card: card? }),
            "reject_request" => Some(Operation::RejectRequest { card: card? }),
            "finalize" => Some(Operation::Finalize { card: card? }),
            "approve" => Some(Operation::Approve { card: card? }),
            "reject" => Some(Operation::Reject {
                card: card?,
                reason: self.note.unwrap_or_else(|| "rejected".to_owned()),
            }),
            "cancel" => Some(Operation::Cancel { card: card? }),
            _ => None,
        }
    }
}

fn apply(workspace: &Workspace, actor: UserId, operation: Operation) -> Result<(), LedgerError> {
    let coordinator = &workspace.coordinator;
    match operation {
        Operation::Create {
            project,
            budget_total,
            title,
            client,
        } => {
            // First mention of a project seeds its budget pool.
            if !workspace.budget.has_pool(project) {
                workspace.budget.open_pool(project, budget_total);
            }
            coordinator
                .create_card(actor, project, &title, &client, budget_total, actor)
                .map(|_| ())
        }
        Operation::Transfer { card, amount } => coordinator.transfer(actor, card, amount),
        Operation::Expense {
            card,
            category,
            amount,
            description,
        } => coordinator
            .register_expense(actor, card, category, &description, amount, None)
            .map(|_| ()),
        Operation::Request {
            card,
            amount,
            justification,
        } => coordinator
            .request_funds(actor, card, actor, amount, &justification)
            .map(|_| ()),
        Operation::ApproveRequest { card } => {
            let request = coordinator
                .pending_request_for(card)
                .ok_or(LedgerError::RequestNotFound)?;
            coordinator.resolve_fund_request(actor, request.id, Decision::Approve)
        }
        Operation::RejectRequest { card } => {
            let request = coordinator
                .pending_request_for(card)
                .ok_or(LedgerError::RequestNotFound)?;
            coordinator.resolve_fund_request(actor, request.id, Decision::Reject)
        }
        Operation::Finalize { card } => coordinator.finalize_card(actor, card),
        Operation::Approve { card } => coordinator.approve_card(actor, card),
        Operation::Reject { card, reason } => coordinator.reject_card(actor, card, &reason),
        Operation::Cancel { card } => coordinator.cancel_card(actor, card),
    }
}

/// Replays operations from a CSV reader against a fresh coordinator.
///
/// Streaming parse; malformed rows and rejected operations are skipped
/// (logged to stderr in debug builds).
///
/// # CSV Format
///
/// Expected columns: `op, card, project, amount, category, title, client, note`
///
/// ```csv
/// op,card,project,amount,category,title,client,note
/// create,,1,10000.00,,Storefront sign,Acme Stores,
/// transfer,1,,3000.00,,,,
/// expense,1,,1200.00,1,,,vinyl and ink
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual operation errors don't stop processing.
pub fn process_operations<R: Read>(
    reader: R,
    auto_approve_expenses: bool,
) -> Result<Workspace, csv::Error> {
    let cash = Arc::new(MemoryCashLedger::new());
    let budget = Arc::new(MemoryProjectBudget::new());
    let coordinator = Coordinator::with_config(
        cash.clone(),
        budget.clone(),
        Arc::new(CategoryRegistry::with_defaults()),
        Arc::new(AllowAll),
        CoordinatorConfig {
            auto_approve_expenses,
            ..CoordinatorConfig::default()
        },
    );
    let workspace = Workspace {
        coordinator,
        cash,
        budget,
    };
    let actor = UserId(1);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(operation) = record.into_operation() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid operation record");
                    continue;
                };

                if let Err(_e) = apply(&workspace, actor, operation) {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping operation: {}", _e);
                }
            }
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", _e);
                continue;
            }
        }
    }

    Ok(workspace)
}

/// Writes card snapshots as CSV, ordered by card id.
///
/// Columns: `id, project, title, client, status, budget_total, balance,
/// spent, funded, reconciled, version`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_cards<W: IoWrite>(coordinator: &Coordinator, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for snapshot in coordinator.snapshots() {
        wtr.serialize(&snapshot)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the cash ledger entries accumulated so far, in append order.
pub fn write_journal<W: IoWrite>(
    cash: &MemoryCashLedger,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for entry in cash.drain_export() {
        wtr.serialize(&entry)?;
    }
    wtr.flush()?;
    Ok(())
}
