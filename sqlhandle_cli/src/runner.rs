use sqlhandle::{ConnectionHandle, QueryResult, Result};
use std::io::Write;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatementKind {
    Query,
    Update,
}

/// Statements whose first keyword returns rows are run as queries; everything else is run
/// as an update.
pub(crate) fn statement_kind(sql: &str) -> StatementKind {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match keyword.as_str() {
        "select" | "show" | "describe" | "desc" | "explain" | "with" | "values" | "table" => {
            StatementKind::Query
        }
        _ => StatementKind::Update,
    }
}

/// Open the connection, run the statements in order and close the connection again.
pub(crate) async fn run(
    handle: &mut ConnectionHandle,
    statements: &[String],
    reconnect: bool,
    output: &mut dyn Write,
) -> anyhow::Result<()> {
    handle
        .with_connection(async move |handle: &mut ConnectionHandle| {
            if reconnect {
                handle.reconnect().await?;
            }
            for sql in statements {
                let kind = statement_kind(sql);
                debug!("{kind:?}: {sql}");
                match kind {
                    StatementKind::Query => {
                        let result = handle.execute_query(sql).await?;
                        write_result(result, output).await?;
                    }
                    StatementKind::Update => {
                        let rows = handle.execute_update(sql).await?;
                        writeln!(output, "{rows} row(s) affected")?;
                    }
                }
            }
            Ok(())
        })
        .await?;
    Ok(())
}

/// Write the rows tab separated, preceded by the column names when there are any.
pub(crate) async fn write_result(
    mut result: Box<dyn QueryResult>,
    output: &mut dyn Write,
) -> Result<()> {
    if !result.columns().is_empty() {
        writeln!(output, "{}", result.columns().join("\t"))?;
    }

    let mut rows = 0usize;
    while let Some(row) = result.next().await {
        let line = row
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(output, "{line}")?;
        rows += 1;
    }
    writeln!(output, "{rows} row(s)")?;
    Ok(())
}
