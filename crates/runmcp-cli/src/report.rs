//! Report rendering: human-readable text or machine-readable JSON.

use std::io::Write;

use runmcp_core::{group_servers, ScanSummary, ServerReport};

const REPORT_WIDTH: usize = 80;

/// Output the summary in the requested format. JSON goes to stdout verbatim;
/// the text report renders grouped findings and recommendations.
pub fn print_summary(summary: &ScanSummary, json_output: bool) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if json_output {
        serde_json::to_writer_pretty(&mut out, summary)?;
        writeln!(out)?;
        return Ok(());
    }

    let rule = "=".repeat(REPORT_WIDTH);
    writeln!(out, "{rule}")?;
    writeln!(out, "RUN-MCP SCAN REPORT")?;
    writeln!(out, "{rule}")?;
    if let Some(started) = summary.started_at {
        writeln!(out, "Scan Time: {}", started.format("%Y-%m-%d %H:%M:%S %Z"))?;
    }
    writeln!(
        out,
        "Scanned: {} files, {} servers detected (duration: {})",
        summary.scanned_files,
        summary.total_servers,
        human_duration(summary.duration_ms),
    )?;

    let buckets = group_servers(summary);

    writeln!(out, "\n📊 RISK SUMMARY")?;
    writeln!(out, "{rule}")?;
    let counts = [
        ("🔴 Critical Risk ", buckets.critical.len()),
        ("🟠 High Risk     ", buckets.high.len()),
        ("🟡 Medium Risk   ", buckets.medium.len()),
        ("🟢 Low Risk      ", buckets.low.len()),
        ("⏳ Pending       ", buckets.pending.len()),
        ("🔎 Discovered    ", buckets.discovered.len()),
        ("✅ Allowed       ", buckets.allowed.len()),
        ("⛔ Denied        ", buckets.denied.len()),
    ];
    for (label, count) in counts {
        if count > 0 {
            writeln!(out, "   {label}: {count} servers")?;
        }
    }
    if !summary.secrets.is_empty() {
        writeln!(out, "   ☢️ Exposed secrets: {}", summary.secrets.len())?;
    }

    print_group(&mut out, "🚨 CRITICAL FINDINGS", &buckets.critical, true)?;
    print_group(&mut out, "🟠 HIGH RISK FINDINGS", &buckets.high, true)?;
    print_group(&mut out, "🟡 MEDIUM RISK FINDINGS", &buckets.medium, false)?;
    print_group(&mut out, "🟢 LOW RISK FINDINGS", &buckets.low, false)?;
    print_group(&mut out, "✅ ALLOWED SERVERS", &buckets.allowed, false)?;
    print_group(&mut out, "⛔ DENIED SERVERS", &buckets.denied, false)?;
    print_group(&mut out, "⏳ PENDING RATING", &buckets.pending, false)?;
    print_group(
        &mut out,
        "🔎 DISCOVERED (NOT RATED)",
        &buckets.discovered,
        false,
    )?;

    if !summary.secrets.is_empty() {
        writeln!(out, "\n🔐 EXPOSED SECRETS")?;
        writeln!(out, "{rule}")?;
        for secret in &summary.secrets {
            if secret.key.is_empty() {
                write!(
                    out,
                    "    • [{}] {}: \"{}\"",
                    secret.server_name, secret.kind, secret.value
                )?;
            } else {
                write!(
                    out,
                    "    • [{}] {}: {} = \"{}\"",
                    secret.server_name, secret.kind, secret.key, secret.value
                )?;
            }
            if let Some((file, lines)) = secret.occurrences.iter().next() {
                let total: usize = secret.occurrences.values().map(Vec::len).sum();
                let shown = match lines.first() {
                    Some(line) => format!("{file}:{line}"),
                    None => file.clone(),
                };
                let extra = total.saturating_sub(1);
                if extra > 0 {
                    write!(out, " (path: {shown} +{extra} more)")?;
                } else {
                    write!(out, " (path: {shown})")?;
                }
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "\n💡 SECURITY RECOMMENDATIONS")?;
    writeln!(out, "{rule}")?;
    if !buckets.critical.is_empty() || !buckets.high.is_empty() || !summary.secrets.is_empty() {
        writeln!(out, "\nIMMEDIATE ACTIONS:")?;
        if !buckets.critical.is_empty() {
            writeln!(
                out,
                "1. Remove {} malicious servers identified above",
                buckets.critical.len()
            )?;
        }
        if !summary.secrets.is_empty() {
            writeln!(out, "2. Rotate {} exposed credentials:", summary.secrets.len())?;
            for secret in &summary.secrets {
                writeln!(out, "   - {} (used by {})", secret.kind, secret.server_name)?;
            }
        }
    }

    writeln!(out, "\nRun 'run-mcp scan --json' for detailed output")?;
    writeln!(
        out,
        "Run 'run-mcp experimental allowlist add' to approve allowed servers"
    )?;
    writeln!(out, "{rule}")?;
    Ok(())
}

fn print_group(
    out: &mut impl Write,
    heading: &str,
    servers: &[&ServerReport],
    with_vulnerabilities: bool,
) -> anyhow::Result<()> {
    if servers.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{heading}")?;
    writeln!(out, "{}", "=".repeat(REPORT_WIDTH))?;
    for (i, server) in servers.iter().enumerate() {
        writeln!(out, "\n[{}] Server: \"{}\" ({})", i + 1, server.name, server.path)?;
        if let Some(rating) = &server.rating {
            writeln!(
                out,
                "    Risk Score: {:.1}/10 - {}",
                rating.risk_score, rating.category
            )?;
            if !rating.version.is_empty() {
                writeln!(out, "    Source: {}@{}", rating.name, rating.version)?;
            }
            if with_vulnerabilities && !rating.vulnerabilities.is_empty() {
                writeln!(out, "    \n    ⚠️  Detected Issues:")?;
                for vulnerability in &rating.vulnerabilities {
                    writeln!(out, "    • {vulnerability}")?;
                }
            }
        }
    }
    Ok(())
}

/// Compact human-readable duration: `850ms`, `1.23s`, `2m05s`, `1h02m`.
pub fn human_duration(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    if ms < 60_000 {
        return format!("{:.2}s", ms as f64 / 1_000.0);
    }
    if ms < 3_600_000 {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        return format!("{minutes}m{seconds:02}s");
    }
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    format!("{hours}h{minutes:02}m")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_compactly() {
        assert_eq!(human_duration(850), "850ms");
        assert_eq!(human_duration(1_230), "1.23s");
        assert_eq!(human_duration(125_000), "2m05s");
        assert_eq!(human_duration(3_720_000), "1h02m");
    }
}
