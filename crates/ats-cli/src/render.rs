//! Table and JSON rendering of query results.

use ats_core::richtext::RichTextHit;
use ats_core::storage::QueryResult;

/// Render a result set as an aligned text table.
pub fn render_table(result: &QueryResult) -> String {
    if result.attestations.is_empty() {
        return "no attestations matched\n".to_string();
    }

    let headers = ["ID", "SUBJECTS", "PREDICATES", "CONTEXTS", "ACTORS", "TIMESTAMP"];
    let rows: Vec<[String; 6]> = result
        .attestations
        .iter()
        .map(|a| {
            [
                a.id.clone(),
                a.subjects.join(","),
                a.predicates.join(","),
                a.contexts.join(","),
                a.actors.join(","),
                a.timestamp.to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", header, width = widths[i]));
    }
    out.push('\n');
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
        out.push('\n');
    }
    out.push_str(&format!("\n{} attestation(s)\n", rows.len()));
    out
}

/// Render a result set as pretty JSON.
pub fn render_json(result: &QueryResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Render rich-text search hits.
pub fn render_hits(hits: &[RichTextHit]) -> String {
    if hits.is_empty() {
        return "no matches\n".to_string();
    }

    let mut out = String::new();
    for hit in hits {
        out.push_str(&format!(
            "{:.2}  {}  [{}] {}\n      {}\n",
            hit.score, hit.label, hit.strategy, hit.field, hit.excerpt
        ));
    }
    out.push_str(&format!("\n{} match(es)\n", hits.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_core::storage::QuerySummary;
    use ats_core::AttestationBuilder;

    fn sample_result() -> QueryResult {
        let attestations = vec![AttestationBuilder::new()
            .id("AS-ALICE-00aabbcc")
            .subject("ALICE")
            .predicate("works_at")
            .context("acme")
            .actor("hr")
            .timestamp(1704067200000)
            .source("cli")
            .build()];
        let summary = QuerySummary::from_attestations(&attestations);
        QueryResult {
            attestations,
            summary,
        }
    }

    #[test]
    fn table_contains_values_and_count() {
        let table = render_table(&sample_result());
        assert!(table.contains("AS-ALICE-00aabbcc"));
        assert!(table.contains("works_at"));
        assert!(table.contains("1 attestation(s)"));
    }

    #[test]
    fn empty_table() {
        let table = render_table(&QueryResult::default());
        assert!(table.contains("no attestations matched"));
    }

    #[test]
    fn json_roundtrips() {
        let json = render_json(&sample_result()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["attestations"][0]["id"], "AS-ALICE-00aabbcc");
        assert_eq!(parsed["summary"]["total_attestations"], 1);
    }
}
