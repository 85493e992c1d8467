//! Fixture algebras shared by the integration suites.
//!
//! These mirror the consumer catalogue the runtime was designed around:
//! pure authorization checks, an error algebra that redirects to terminal
//! responses, user-record updates that delegate to a database capability,
//! logging through an injected sink, and response emission. Everything
//! side-effecting writes to in-memory probes so tests can assert on what
//! was, and was not, performed.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use remoulade::{Algebra, Args, HandlerResult, Step, Value};
use serde_json::json;

/// In-memory sink standing in for a process logger or response socket.
#[derive(Clone, Default)]
pub struct Sink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().unwrap().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }
}

/// In-memory upsert target standing in for a database driver.
#[derive(Clone, Default)]
pub struct MemoryDb {
    upserts: Arc<Mutex<Vec<(String, String, Value)>>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, table: &str, id: &str, patch: Value) {
        self.upserts
            .lock()
            .unwrap()
            .push((table.to_owned(), id.to_owned(), patch));
    }

    /// Every `(table, id, patch)` applied so far, in order.
    pub fn upserts(&self) -> Vec<(String, String, Value)> {
        self.upserts.lock().unwrap().clone()
    }
}

fn string_arg(args: &Args, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Pure token checks. Each operation folds to a boolean without side
/// effects.
pub fn authorization() -> Algebra {
    Algebra::new("authorization")
        .operation("isValidToken", |args| {
            let valid = args
                .get("token")
                .and_then(|token| token.get("isValid"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(Step::pure(valid))
        })
        .operation("isAuthed", token_matches_user)
        .operation("doesTokenMatchUserId", token_matches_user)
}

fn token_matches_user(args: Args) -> HandlerResult {
    let token_user = args.get("token").and_then(|token| token.get("userId"));
    let user = args.get("userId");
    let matches = match (token_user, user) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    Ok(Step::pure(matches))
}

/// The early-exit algebra: every operation replaces the rest of the
/// program with a single terminal response.
pub fn errors() -> Algebra {
    Algebra::new("errors")
        .operation("authorization", |args| {
            let identity = string_arg(&args, "identity");
            let resource = string_arg(&args, "requestedResource");
            Ok(Step::finish(json!({
                "status": 401,
                "body": format!("User {identity} does not have access to resource {resource}"),
            })))
        })
        .operation("internalServer", |args| {
            let message = args.get("sourceError").cloned().unwrap_or(Value::Null);
            Ok(Step::finish(json!({
                "status": 500,
                "body": message,
            })))
        })
}

/// Builds the deferred upsert action both storage-facing algebras share.
fn upsert_step(db: MemoryDb, table: String, id: String, patch: Value) -> Step {
    Step::defer(async move {
        db.apply(&table, &id, patch.clone());
        Ok(json!({
            "upserted": { "table": table, "id": id, "patch": patch },
        }))
    })
}

/// Raw storage operations over the shared in-memory database.
pub fn database(db: MemoryDb) -> Algebra {
    Algebra::new("coconutDb/dbOperations").operation("upsert", move |args| {
        let table = string_arg(&args, "table");
        let id = string_arg(&args, "id");
        let patch = args.get("patch").cloned().unwrap_or(Value::Null);
        Ok(upsert_step(db.clone(), table, id, patch))
    })
}

/// Domain-level record updates, built on the same upsert action the
/// database algebra describes.
pub fn user_records(db: MemoryDb) -> Algebra {
    Algebra::new("userRecords").operation("updateField", move |args| {
        let entity_id = string_arg(&args, "entityId");
        let field_name = string_arg(&args, "fieldName");
        let field_value = args.get("fieldValue").cloned().unwrap_or(Value::Null);

        let mut patch = Args::new();
        patch.insert(field_name, field_value);
        Ok(upsert_step(
            db.clone(),
            "users".to_owned(),
            entity_id,
            Value::Object(patch),
        ))
    })
}

/// Leveled logging into the shared sink.
pub fn logging(sink: Sink) -> Algebra {
    Algebra::new("log")
        .operation("log", log_operation(sink.clone(), "LOG"))
        .operation("warn", log_operation(sink.clone(), "WARN"))
        .operation("error", log_operation(sink, "ERROR"))
}

fn log_operation(
    sink: Sink,
    level: &'static str,
) -> impl Fn(Args) -> HandlerResult + Send + Sync + 'static {
    move |args| {
        let message = string_arg(&args, "message");
        let sink = sink.clone();
        Ok(Step::defer(async move {
            sink.push(format!("{level}: {message}"));
            Ok(Value::Null)
        }))
    }
}

/// Response emission into the shared sink. Yields the descriptor it
/// emitted so it can close out a run.
pub fn respond(sink: Sink) -> Algebra {
    Algebra::new("someRestFramework/respond").operation("respond", move |args| {
        let descriptor = args
            .get("responseDescriptor")
            .cloned()
            .unwrap_or(Value::Null);
        let sink = sink.clone();
        Ok(Step::defer(async move {
            sink.push(format!("respond: {descriptor}"));
            Ok(descriptor)
        }))
    })
}

/// Installs a process-wide test subscriber; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
