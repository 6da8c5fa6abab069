use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::Action;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the document-integrity ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an action on a document
    Record {
        #[arg(long)]
        document: i64,
        #[arg(long)]
        loan: i64,
        /// One of upload, verify, approve, reject, modify, access
        #[arg(long, value_parser = parse_action)]
        action: Action,
        #[arg(long)]
        validator: String,
        /// Metadata entry as key=value (repeatable)
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    /// Seal pending transactions now
    Seal,
    /// Re-verify a document's recorded history
    Verify {
        #[arg(long)]
        document: i64,
    },
    /// Issue an integrity certificate for a document
    Certificate {
        #[arg(long)]
        document: i64,
    },
    /// Show a transaction, sealed or pending
    Transaction {
        #[arg(long)]
        id: String,
    },
    /// Merkle inclusion proof for a sealed transaction
    Proof {
        #[arg(long)]
        id: String,
    },
    /// Height and hash of the latest block
    Tip,
    /// Show a block by index
    Block {
        #[arg(long)]
        index: u64,
    },
    /// Ledger-wide health metrics
    Stats,
    /// Full-ledger audit
    Audit,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RecordBody {
    document_id: i64,
    loan_application_id: i64,
    action: &'static str,
    validator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

fn parse_action(s: &str) -> Result<Action, String> {
    s.parse().map_err(|e: ledger_core::LedgerError| e.to_string())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

fn record_body(
    document: i64,
    loan: i64,
    action: Action,
    validator: String,
    metadata: Vec<(String, String)>,
) -> RecordBody {
    let metadata = (!metadata.is_empty()).then(|| {
        metadata
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    });
    RecordBody {
        document_id: document,
        loan_application_id: loan,
        action: action.as_str(),
        validator,
        metadata,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    let request = match cli.cmd {
        Command::Record {
            document,
            loan,
            action,
            validator,
            metadata,
        } => client
            .post(format!("{node}/transactions"))
            .json(&record_body(document, loan, action, validator, metadata)),
        Command::Seal => client.post(format!("{node}/blocks/seal")),
        Command::Verify { document } => {
            client.get(format!("{node}/documents/{document}/verification"))
        }
        Command::Certificate { document } => {
            client.post(format!("{node}/documents/{document}/certificate"))
        }
        Command::Transaction { id } => client.get(format!("{node}/transactions/{id}")),
        Command::Proof { id } => client.get(format!("{node}/transactions/{id}/proof")),
        Command::Tip => client.get(format!("{node}/chain/tip")),
        Command::Block { index } => client.get(format!("{node}/chain/blocks/{index}")),
        Command::Stats => client.get(format!("{node}/stats")),
        Command::Audit => client.get(format!("{node}/audit")),
    };

    let res = request.send().await.context("request to ledger node failed")?;
    let status = res.status();
    let body = res.text().await?;
    debug!(%status, "node replied");
    println!("status: {}", status);
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    if !status.is_success() {
        anyhow::bail!("node returned {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_parsing() {
        assert_eq!(
            parse_key_value("sessionId=abc=1"),
            Ok(("sessionId".to_string(), "abc=1".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn record_body_matches_node_contract() {
        let body = record_body(
            42,
            7,
            Action::Approve,
            "alice".into(),
            vec![("sessionId".into(), "s-1".into())],
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "documentId": 42,
                "loanApplicationId": 7,
                "action": "approve",
                "validator": "alice",
                "metadata": {"sessionId": "s-1"}
            })
        );
        let bare = record_body(1, 1, Action::Access, "bob".into(), vec![]);
        assert!(serde_json::to_value(&bare).unwrap().get("metadata").is_none());
    }

    #[test]
    fn cli_parses_record() {
        let cli = Cli::parse_from([
            "ledger-cli",
            "record",
            "--document",
            "42",
            "--loan",
            "7",
            "--action",
            "verify",
            "--validator",
            "alice",
            "--meta",
            "ip=10.0.0.1",
        ]);
        match cli.cmd {
            Command::Record {
                action, metadata, ..
            } => {
                assert_eq!(action.as_str(), "verify");
                assert_eq!(metadata, vec![("ip".to_string(), "10.0.0.1".to_string())]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_action() {
        let parsed = Cli::try_parse_from([
            "ledger-cli", "record", "--document", "1", "--loan", "1", "--action", "shred",
            "--validator", "alice",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_tip_and_transaction() {
        let cli = Cli::parse_from(["ledger-cli", "--node", "http://node:9000", "tip"]);
        assert!(matches!(cli.cmd, Command::Tip));
        assert_eq!(cli.node, "http://node:9000");

        let cli = Cli::parse_from(["ledger-cli", "transaction", "--id", "abc"]);
        match cli.cmd {
            Command::Transaction { id } => assert_eq!(id, "abc"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
